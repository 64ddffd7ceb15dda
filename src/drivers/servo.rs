//! Hobby servo on LEDC channel 0 (50 Hz frame).
//!
//! Pulse width scales linearly from 3 % of the frame at -90° to 12.5 % at
//! +90° (0.6 ms – 2.5 ms).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes the LEDC duty register via hw_init helpers.
//! On host/test: tracks state in-memory only.

use log::warn;

use crate::control::arbitration::ServoAngle;
use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::pins;

const MIN_PULSE_PCT: f32 = 3.0;
const MAX_PULSE_PCT: f32 = 12.5;

/// Pulse width as a percentage of the PWM frame.
pub fn pulse_percent(angle: ServoAngle) -> f32 {
    let span = f32::from(ServoAngle::MAX_DEG - ServoAngle::MIN_DEG);
    let offset = f32::from(angle.degrees() - ServoAngle::MIN_DEG);
    MIN_PULSE_PCT + offset * (MAX_PULSE_PCT - MIN_PULSE_PCT) / span
}

/// LEDC duty counts at the configured resolution.
pub fn duty_counts(angle: ServoAngle) -> u32 {
    let full_scale = ((1u32 << pins::SERVO_PWM_RESOLUTION_BITS) - 1) as f32;
    (pulse_percent(angle) / 100.0 * full_scale).round() as u32
}

pub struct ServoDriver {
    angle: Option<ServoAngle>,
}

impl ServoDriver {
    pub fn new() -> Self {
        Self { angle: None }
    }

    pub fn set_angle(&mut self, angle: ServoAngle) -> Result<(), ActuatorError> {
        if let Err(rc) = hw_init::ledc_set(hw_init::LEDC_CH_SERVO, duty_counts(angle)) {
            warn!("Servo duty write failed (rc={})", rc);
            return Err(ActuatorError::PwmWriteFailed);
        }
        self.angle = Some(angle);
        Ok(())
    }

    /// Last angle successfully written, `None` before the first write.
    pub fn angle(&self) -> Option<ServoAngle> {
        self.angle
    }
}

impl Default for ServoDriver {
    fn default() -> Self {
        Self::new()
    }
}
