//! Single-pin ultrasonic ranger (Grove-style: trigger and echo share SIG).
//!
//! Measurement cycle:
//!
//! ```text
//!  SIG (out)  ‾‾\__/‾‾‾‾‾‾‾‾‾‾\_______        2 µs low, 10 µs high
//!  SIG (in)   ______________/‾‾‾‾‾‾‾‾\____    echo width ∝ distance
//! ```
//!
//! Each wait is bounded by `timeout_us`, so a missing or stuck sensor
//! turns into [`SensorError::EchoTimeout`] instead of a hang.

use embedded_hal::delay::DelayNs;

use super::{DistanceSensor, MicrosClock, SignalLine};
use crate::error::SensorError;

/// Speed of sound at ~20 °C (cm/µs).
const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

pub struct UltrasonicRanger<P, D, K> {
    pin: P,
    delay: D,
    clock: K,
    timeout_us: u64,
}

impl<P, D, K> UltrasonicRanger<P, D, K>
where
    P: SignalLine,
    D: DelayNs,
    K: MicrosClock,
{
    pub fn new(pin: P, delay: D, clock: K, timeout_us: u32) -> Self {
        Self {
            pin,
            delay,
            clock,
            timeout_us: u64::from(timeout_us),
        }
    }

    /// Trigger one ping and time the echo.
    pub fn measure(&mut self) -> Result<f32, SensorError> {
        self.trigger().map_err(|_| SensorError::GpioFailed)?;

        let rise = self.wait_for(true)?;
        let fall = self.wait_for(false)?;
        let width_us = fall.saturating_sub(rise);

        #[allow(clippy::cast_precision_loss)]
        let distance = width_us as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0;
        Ok(distance)
    }

    fn trigger(&mut self) -> Result<(), P::Error> {
        self.pin.make_output()?;
        self.pin.set_low()?;
        self.delay.delay_us(2);
        self.pin.set_high()?;
        self.delay.delay_us(10);
        self.pin.set_low()?;
        self.pin.make_input()
    }

    /// Spin until the line reads `high`, returning the timestamp.
    fn wait_for(&mut self, high: bool) -> Result<u64, SensorError> {
        let start = self.clock.now_us();
        loop {
            let level = self.pin.is_high().map_err(|_| SensorError::GpioFailed)?;
            let now = self.clock.now_us();
            if level == high {
                return Ok(now);
            }
            if now.saturating_sub(start) > self.timeout_us {
                return Err(SensorError::EchoTimeout);
            }
        }
    }
}

impl<P, D, K> DistanceSensor for UltrasonicRanger<P, D, K>
where
    P: SignalLine,
    D: DelayNs,
    K: MicrosClock,
{
    fn measure_cm(&mut self) -> Result<f32, SensorError> {
        self.measure()
    }
}
