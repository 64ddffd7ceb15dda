//! Control algorithms: servo arbitration and the temperature alarm.
//!
//! Everything here is pure state + arithmetic so it runs unchanged on the
//! host test target.

pub mod arbitration;
pub mod buzzer;
pub mod context;
