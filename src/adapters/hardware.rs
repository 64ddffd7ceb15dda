//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and both actuator drivers, exposing them
//! through [`SensorPort`] and [`ActuatorPort`].  Driver errors are passed
//! up unchanged; the service decides what a failed write means.  On
//! non-espidf targets, the underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::control::arbitration::ServoAngle;
use crate::control::context::SensorSnapshot;
use crate::drivers::buzzer::BuzzerDriver;
use crate::drivers::servo::ServoDriver;
use crate::error::ActuatorError;
use crate::sensors::{ClimateSensor, DistanceSensor, SensorHub};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<D, C> {
    sensor_hub: SensorHub<D, C>,
    servo: ServoDriver,
    buzzer: BuzzerDriver,
}

impl<D, C> HardwareAdapter<D, C> {
    pub fn new(sensor_hub: SensorHub<D, C>, servo: ServoDriver, buzzer: BuzzerDriver) -> Self {
        Self {
            sensor_hub,
            servo,
            buzzer,
        }
    }

    pub fn servo(&self) -> &ServoDriver {
        &self.servo
    }

    pub fn buzzer(&self) -> &BuzzerDriver {
        &self.buzzer
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<D: DistanceSensor, C: ClimateSensor> SensorPort for HardwareAdapter<D, C> {
    fn read_all(&mut self) -> SensorSnapshot {
        self.sensor_hub.read_all()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<D, C> ActuatorPort for HardwareAdapter<D, C> {
    fn set_servo_angle(&mut self, angle: ServoAngle) -> Result<(), ActuatorError> {
        self.servo.set_angle(angle)
    }

    fn set_buzzer(&mut self, on: bool) {
        self.buzzer.set(on);
    }
}
