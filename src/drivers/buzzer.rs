//! Active buzzer on a plain GPIO (HIGH = sounding).

use crate::drivers::hw_init;
use crate::pins;

pub struct BuzzerDriver {
    on: bool,
}

impl BuzzerDriver {
    pub fn new() -> Self {
        Self { on: false }
    }

    pub fn set(&mut self, on: bool) {
        hw_init::gpio_write(pins::BUZZER_GPIO, on);
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Default for BuzzerDriver {
    fn default() -> Self {
        Self::new()
    }
}
