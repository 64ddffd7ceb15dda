//! Temperature alarm policy.
//!
//! The buzzer is a pure function of the latest valid temperature and does
//! not care about the servo control mode.

use super::context::ClimateReading;

#[derive(Debug, Clone, Copy)]
pub struct BuzzerPolicy {
    threshold_c: f32,
}

impl BuzzerPolicy {
    pub fn new(threshold_c: f32) -> Self {
        Self { threshold_c }
    }

    /// Strictly above the threshold sounds; equal does not.
    pub fn should_sound(&self, temperature_c: f32) -> bool {
        temperature_c > self.threshold_c
    }

    /// Desired buzzer state for this cycle.  A failed climate read keeps
    /// whatever the buzzer was already doing.
    pub fn decide(&self, climate: Option<ClimateReading>, current_on: bool) -> bool {
        climate.map_or(current_on, |c| self.should_sound(c.temperature_c))
    }
}
