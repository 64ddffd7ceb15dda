//! Node configuration parameters.
//!
//! All tunable parameters for the proxgate node.  Defaults match the
//! field-deployed behaviour; a JSON override can be baked in at build time
//! (see `main.rs`).  Values are range-checked by [`NodeConfig::validate`],
//! never silently clamped.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Core node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Timing ---
    /// Period between automatic evaluations (milliseconds).
    pub tick_interval_ms: u32,
    /// How often the link queue is drained between ticks (milliseconds).
    pub link_poll_interval_ms: u32,
    /// Lifetime of a manual override, measured from the command (milliseconds).
    pub override_timeout_ms: u32,

    // --- Thresholds ---
    /// Servo opens when `0 < distance < open_distance_cm`.
    pub open_distance_cm: f32,
    /// Buzzer sounds when temperature is strictly above this (°C).
    pub buzzer_threshold_c: f32,

    // --- Servo ---
    /// Angle commanded by OPEN (remote `1`) and by a near object.
    pub open_angle_deg: i16,
    /// Angle commanded by CLOSE (remote `0`) and by a far object.
    pub closed_angle_deg: i16,

    // --- Sensors ---
    /// Upper bound on each ultrasonic wait loop (microseconds).
    pub echo_timeout_us: u32,

    // --- Link ---
    /// BLE advertised name.
    pub device_name: heapless::String<24>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("NucleoBLE");

        Self {
            // Timing
            tick_interval_ms: 1000,     // 1 Hz
            link_poll_interval_ms: 20,  // 50 Hz
            override_timeout_ms: 3000,

            // Thresholds
            open_distance_cm: 15.0,
            buzzer_threshold_c: 30.0,

            // Servo
            open_angle_deg: 90,
            closed_angle_deg: 0,

            // Sensors
            echo_timeout_us: 30_000, // ~5 m round trip

            device_name,
        }
    }
}

impl NodeConfig {
    /// Reject configurations that would make the control loop misbehave.
    pub fn validate(&self) -> Result<(), Error> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be > 0"));
        }
        if self.link_poll_interval_ms == 0 || self.link_poll_interval_ms > self.tick_interval_ms {
            return Err(Error::Config(
                "link_poll_interval_ms must be 1..=tick_interval_ms",
            ));
        }
        if self.override_timeout_ms == 0 {
            return Err(Error::Config("override_timeout_ms must be > 0"));
        }
        if !self.open_distance_cm.is_finite() || self.open_distance_cm <= 0.0 {
            return Err(Error::Config("open_distance_cm must be a positive number"));
        }
        if !self.buzzer_threshold_c.is_finite() {
            return Err(Error::Config("buzzer_threshold_c must be finite"));
        }
        if !(-90..=90).contains(&self.open_angle_deg) || !(-90..=90).contains(&self.closed_angle_deg)
        {
            return Err(Error::Config("servo angles must be within -90..=90"));
        }
        if self.open_angle_deg == self.closed_angle_deg {
            return Err(Error::Config("open and closed angles must differ"));
        }
        if !(1_000..=100_000).contains(&self.echo_timeout_us) {
            return Err(Error::Config("echo_timeout_us must be 1000–100000"));
        }
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON override on top of the defaults and
    /// validate the result.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON override"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
