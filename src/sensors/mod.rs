//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! Both sensors on this node talk over a single bidirectional GPIO, so the
//! drivers are written against [`SignalLine`] (an embedded-hal pin that can
//! switch direction) and a [`MicrosClock`] for pulse timing.  The hub owns
//! one of each and produces a [`SensorSnapshot`] every tick.

pub mod dht22;
pub mod ultrasonic;

#[cfg(test)]
pub(crate) mod sim;

use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::SensorPort;
use crate::control::context::{ClimateReading, SensorSnapshot};
use crate::error::SensorError;

/// A single GPIO that is driven for a trigger pulse and then sampled.
pub trait SignalLine: OutputPin + InputPin {
    /// Switch to output (push-pull) before driving the line.
    fn make_output(&mut self) -> Result<(), Self::Error>;
    /// Release the line and switch to input.
    fn make_input(&mut self) -> Result<(), Self::Error>;
}

/// Free-running microsecond counter used to time pulses.
pub trait MicrosClock {
    fn now_us(&self) -> u64;
}

/// Anything that can range the nearest object.
pub trait DistanceSensor {
    fn measure_cm(&mut self) -> Result<f32, SensorError>;
}

/// Anything that reports temperature and relative humidity.
pub trait ClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Aggregates the sensor drivers and produces a unified snapshot.
pub struct SensorHub<D, C> {
    distance: D,
    climate: C,
}

impl<D: DistanceSensor, C: ClimateSensor> SensorHub<D, C> {
    /// Construct a new hub.  Pass in pre-built drivers (built in main
    /// where peripheral ownership is established).
    pub fn new(distance: D, climate: C) -> Self {
        Self { distance, climate }
    }

    /// Read both sensors.  A failure in one branch is logged and reported
    /// as `None`; it never affects the other branch.
    pub fn read_all(&mut self) -> SensorSnapshot {
        let climate = match self.climate.read() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Climate read failed: {}", e);
                None
            }
        };

        let distance = match self.distance.measure_cm() {
            Ok(d) if d > 0.0 => Some(d),
            Ok(d) => {
                warn!("Distance read invalid: {:.1} cm", d);
                None
            }
            Err(e) => {
                warn!("Distance read failed: {}", e);
                None
            }
        };

        let snapshot = SensorSnapshot::new(climate, distance);
        if let Some(c) = snapshot.climate {
            debug!(
                "Temperature: {:.1}°C Humidity: {:.1}% Distance: {:?} cm",
                c.temperature_c, c.humidity_pct, snapshot.distance_cm
            );
        }
        snapshot
    }
}

impl<D: DistanceSensor, C: ClimateSensor> SensorPort for SensorHub<D, C> {
    fn read_all(&mut self) -> SensorSnapshot {
        SensorHub::read_all(self)
    }
}
