//! Polled stop button: hold to request a safe shutdown.
//!
//! Active-low momentary switch with pull-up.  `tick()` runs at the link
//! poll rate and fires once the switch has been held continuously for
//! `HOLD_MS`, so a bounce or an accidental brush does nothing.

const HOLD_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    Released,
    Held { since_ms: u64 },
    Fired,
}

pub struct StopButton {
    gpio: i32,
    state: HoldState,
}

impl StopButton {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            state: HoldState::Released,
        }
    }

    /// Sample the GPIO and advance the hold detector.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let pressed = !crate::drivers::hw_init::gpio_read(self.gpio);
        self.tick(now_ms, pressed)
    }

    /// Returns `true` exactly once per hold.
    pub fn tick(&mut self, now_ms: u64, pressed: bool) -> bool {
        match (self.state, pressed) {
            (_, false) => {
                self.state = HoldState::Released;
                false
            }
            (HoldState::Released, true) => {
                self.state = HoldState::Held { since_ms: now_ms };
                false
            }
            (HoldState::Held { since_ms }, true) => {
                if now_ms.saturating_sub(since_ms) >= HOLD_MS {
                    self.state = HoldState::Fired;
                    true
                } else {
                    false
                }
            }
            (HoldState::Fired, true) => false,
        }
    }
}
