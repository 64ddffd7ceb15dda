//! Per-cycle data shared between the sensor layer, the arbitration core and
//! the actuator adapters.
//!
//! `SensorSnapshot` is produced once per tick and consumed immediately.
//! `ActuatorState` is the only record of what the hardware was last told.

use super::arbitration::ServoAngle;

// ---------------------------------------------------------------------------
// Sensor snapshot (written by the sensor hub, read by the service)
// ---------------------------------------------------------------------------

/// One temperature/humidity measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Air temperature (°C).
    pub temperature_c: f32,
    /// Relative humidity (%).
    pub humidity_pct: f32,
}

/// A point-in-time snapshot of both sensor branches.
///
/// Each branch carries its own validity: `None` means the read failed this
/// cycle and the branch must be skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    /// Latest climate reading, if the sensor answered.
    pub climate: Option<ClimateReading>,
    /// Distance to the nearest object (cm), if a valid echo was timed.
    pub distance_cm: Option<f32>,
}

impl SensorSnapshot {
    /// Build a snapshot from raw branch readings, dropping distances that
    /// are not strictly positive and finite.
    pub fn new(climate: Option<ClimateReading>, distance_cm: Option<f32>) -> Self {
        Self {
            climate,
            distance_cm: distance_cm.filter(|d| d.is_finite() && *d > 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator state (mutated only after a directive reaches the hardware)
// ---------------------------------------------------------------------------

/// Last values actually written to the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorState {
    pub current_angle: ServoAngle,
    pub buzzer_on: bool,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self {
            current_angle: ServoAngle::ZERO,
            buzzer_on: false,
        }
    }
}
