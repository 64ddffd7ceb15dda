//! Scripted single-wire line and clocks for exercising the bit-banged
//! drivers on the host.
//!
//! Time only moves when the driver reads the clock (1 µs per read) or
//! delays, so a waveform replays deterministically regardless of host
//! speed.

use core::convert::Infallible;
use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use super::{MicrosClock, SignalLine};

#[derive(Clone, Default)]
pub struct SimTime(Rc<Cell<u64>>);

impl SimTime {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, us: u64) {
        self.0.set(self.0.get() + us);
    }
}

pub struct SimClock(pub SimTime);

impl MicrosClock for SimClock {
    fn now_us(&self) -> u64 {
        self.0.advance(1);
        self.0.now()
    }
}

pub struct SimDelay(pub SimTime);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance(u64::from(ns.div_ceil(1_000)));
    }
}

/// A line whose level, once released, follows a script of
/// `(offset_us, level)` edges measured from the release instant.
pub struct SimLine {
    time: SimTime,
    idle_high: bool,
    script: Vec<(u64, bool)>,
    released_at: Option<u64>,
    pub driven: Vec<bool>,
}

impl SimLine {
    pub fn new(time: SimTime, idle_high: bool, script: Vec<(u64, bool)>) -> Self {
        Self {
            time,
            idle_high,
            script,
            released_at: None,
            driven: Vec::new(),
        }
    }

    /// Ranger echo: high from `start_us` for `width_us`.
    pub fn echo(time: SimTime, start_us: u64, width_us: u64) -> Self {
        Self::new(time, false, vec![(start_us, true), (start_us + width_us, false)])
    }

    /// A line that never moves after release.
    pub fn stuck(time: SimTime, high: bool) -> Self {
        Self::new(time, high, Vec::new())
    }

    /// DHT22 response plus a 40-bit frame, MSB first.
    pub fn dht_frame(time: SimTime, frame: [u8; 5]) -> Self {
        let mut script = Vec::new();
        let mut t = 30; // sensor response latency
        script.push((t, false));
        t += 80;
        script.push((t, true));
        t += 80;
        for byte in frame {
            for bit in (0..8).rev() {
                script.push((t, false));
                t += 50;
                script.push((t, true));
                t += if byte & (1 << bit) != 0 { 70 } else { 26 };
            }
        }
        script.push((t, false));
        t += 50;
        script.push((t, true));
        Self::new(time, true, script)
    }

    fn level(&self) -> bool {
        let Some(t0) = self.released_at else {
            return self.driven.last().copied().unwrap_or(self.idle_high);
        };
        let rel = self.time.now().saturating_sub(t0);
        self.script
            .iter()
            .rev()
            .find(|(at, _)| *at <= rel)
            .map_or(self.idle_high, |(_, level)| *level)
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.driven.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.driven.push(true);
        Ok(())
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

impl SignalLine for SimLine {
    fn make_output(&mut self) -> Result<(), Self::Error> {
        self.released_at = None;
        Ok(())
    }

    fn make_input(&mut self) -> Result<(), Self::Error> {
        self.released_at = Some(self.time.now());
        Ok(())
    }
}
