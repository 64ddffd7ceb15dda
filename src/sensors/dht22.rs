//! DHT22 / AM2302 temperature and humidity sensor.
//!
//! Single-wire protocol, bit-banged:
//!
//! 1. Host pulls the line low ≥ 1 ms, then releases it.
//! 2. Sensor answers 80 µs low, 80 µs high.
//! 3. 40 data bits, MSB first: 50 µs low, then high for ~26 µs (`0`) or
//!    ~70 µs (`1`).
//!
//! Frame layout: `hum_hi hum_lo temp_hi temp_lo checksum`, values in
//! tenths, temperature sign in bit 15.
//!
//! The sensor needs ≥ 2 s between conversions; reads closer together
//! return the previous result.

use embedded_hal::delay::DelayNs;

use super::{ClimateSensor, MicrosClock, SignalLine};
use crate::control::context::ClimateReading;
use crate::error::SensorError;

/// Host start pulse (µs).
const START_LOW_US: u32 = 1_100;
/// Upper bound on any single level while receiving (µs).
const LEVEL_TIMEOUT_US: u64 = 200;
/// High pulses longer than this are `1` bits (µs).
const BIT_ONE_THRESHOLD_US: u64 = 48;
/// Minimum spacing between conversions (µs).
const MIN_INTERVAL_US: u64 = 2_000_000;

/// Validate and decode a raw 5-byte frame.
pub fn decode_frame(frame: &[u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::ChecksumMismatch);
    }

    let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
    let magnitude = f32::from(u16::from_be_bytes([frame[2] & 0x7F, frame[3]])) / 10.0;
    let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };

    if !(0.0..=100.0).contains(&humidity) || !(-40.0..=80.0).contains(&temperature) {
        return Err(SensorError::OutOfRange);
    }
    Ok(ClimateReading {
        temperature_c: temperature,
        humidity_pct: humidity,
    })
}

pub struct Dht22<P, D, K> {
    pin: P,
    delay: D,
    clock: K,
    last: Option<(u64, Result<ClimateReading, SensorError>)>,
}

impl<P, D, K> Dht22<P, D, K>
where
    P: SignalLine,
    D: DelayNs,
    K: MicrosClock,
{
    pub fn new(pin: P, delay: D, clock: K) -> Self {
        Self {
            pin,
            delay,
            clock,
            last: None,
        }
    }

    /// Measure, or return the cached result if the last conversion is
    /// too recent.
    pub fn measure(&mut self) -> Result<ClimateReading, SensorError> {
        let now = self.clock.now_us();
        if let Some((at, result)) = self.last {
            if now.saturating_sub(at) < MIN_INTERVAL_US {
                return result;
            }
        }
        let result = self.read_frame().and_then(|f| decode_frame(&f));
        self.last = Some((now, result));
        result
    }

    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.start().map_err(|_| SensorError::GpioFailed)?;

        // Response: pull-up high → low 80 → high 80.
        self.level_width(true)?;
        self.level_width(false)?;
        self.level_width(true)?;

        let mut frame = [0u8; 5];
        for i in 0..40 {
            self.level_width(false)?;
            let high_us = self.level_width(true)?;
            let byte = &mut frame[i / 8];
            *byte = (*byte << 1) | u8::from(high_us > BIT_ONE_THRESHOLD_US);
        }
        Ok(frame)
    }

    fn start(&mut self) -> Result<(), P::Error> {
        self.pin.make_output()?;
        self.pin.set_low()?;
        self.delay.delay_us(START_LOW_US);
        self.pin.set_high()?;
        self.pin.make_input()
    }

    /// Spin while the line stays at `high`; return how long it did.
    fn level_width(&mut self, high: bool) -> Result<u64, SensorError> {
        let start = self.clock.now_us();
        loop {
            let level = self.pin.is_high().map_err(|_| SensorError::GpioFailed)?;
            let elapsed = self.clock.now_us().saturating_sub(start);
            if level != high {
                return Ok(elapsed);
            }
            if elapsed > LEVEL_TIMEOUT_US {
                return Err(SensorError::EchoTimeout);
            }
        }
    }
}

impl<P, D, K> ClimateSensor for Dht22<P, D, K>
where
    P: SignalLine,
    D: DelayNs,
    K: MicrosClock,
{
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        self.measure()
    }
}
