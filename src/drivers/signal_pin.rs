//! Raw GPIO exposed as an embedded-hal pin that can switch direction.
//!
//! Backs the single-wire sensors.  Direction changes go through
//! `gpio_set_direction`, so the pin keeps its pull configuration from
//! [`hw_init`](super::hw_init).

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};

use crate::drivers::hw_init::{self, HwInitError};
use crate::sensors::SignalLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPinError(pub HwInitError);

impl Error for SignalPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct SignalPin {
    gpio: i32,
}

impl SignalPin {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }
}

impl ErrorType for SignalPin {
    type Error = SignalPinError;
}

impl OutputPin for SignalPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.gpio, true);
        Ok(())
    }
}

impl InputPin for SignalPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(self.gpio))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(self.gpio))
    }
}

impl SignalLine for SignalPin {
    fn make_output(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_set_output(self.gpio, true).map_err(SignalPinError)
    }

    fn make_input(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_set_output(self.gpio, false).map_err(SignalPinError)
    }
}
