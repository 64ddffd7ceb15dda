//! GPIO / peripheral pin assignments for the proxgate node.
//!
//! Drivers and `main` reference these constants rather than hard-coding
//! pin numbers.

// ---------------------------------------------------------------------------
// Sensors: single-wire (direction switched at runtime)
// ---------------------------------------------------------------------------

/// DHT22 data line (open-drain, 10 kΩ pull-up on the module).
pub const CLIMATE_DATA_GPIO: i32 = 4;
/// Ultrasonic ranger SIG (shared trigger/echo).
pub const RANGER_SIGNAL_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

/// Active buzzer, driven HIGH to sound.
pub const BUZZER_GPIO: i32 = 5;

/// Hobby servo signal, LEDC PWM.
pub const SERVO_PWM_GPIO: i32 = 6;
/// Standard hobby-servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC duty resolution for the servo timer.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 14;

// ---------------------------------------------------------------------------
// User input
// ---------------------------------------------------------------------------

/// Stop button (BOOT strap), active LOW with internal pull-up.
pub const STOP_BUTTON_GPIO: i32 = 0;
