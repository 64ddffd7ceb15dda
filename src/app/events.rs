//! Outbound application events.
//!
//! The [`NodeService`](super::service::NodeService) and the control loop
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them: log to
//! serial or collect them in tests.

use core::fmt::Write;

use crate::control::arbitration::ControlMode;
use crate::error::ActuatorError;

/// Maximum length of the telemetry notification.
pub const TELEMETRY_PAYLOAD_LEN: usize = 32;

/// Which half of the sensor snapshot was unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorBranch {
    Climate,
    Distance,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service parked the actuators and is ready.
    Started { angle: i16 },

    /// Control mode changed (command received or override expired).
    ModeChanged { from: ControlMode, to: ControlMode },

    /// A servo directive reached the hardware.
    ServoMoved {
        from: i16,
        to: i16,
        source: ControlMode,
    },

    /// A servo directive was outside [-90, 90] and never reached hardware.
    DirectiveDropped { angle: i16 },

    /// The servo write failed; the held angle is unchanged and the move is
    /// retried on the next evaluation.
    ServoFault { angle: i16, error: ActuatorError },

    /// The buzzer was switched on or off.
    BuzzerChanged(bool),

    /// A control write did not start with a known command byte.
    CommandIgnored { prefix: Option<u8> },

    /// A sensor branch was skipped this tick because its read failed.
    SensorSkipped(SensorBranch),

    /// A peer connected to the remote link.
    PeerConnected(u16),

    /// The peer went away; advertising was re-armed.
    PeerDisconnected,

    /// Per-tick sensor summary (only when the climate read succeeded).
    Telemetry(TelemetryData),

    /// Safe-shutdown directives were applied.
    Shutdown,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub distance_cm: Option<f32>,
    pub mode: ControlMode,
    pub servo_angle: i16,
    pub buzzer_on: bool,
}

impl TelemetryData {
    /// Human-readable summary pushed to the connected peer:
    /// `T:{temperature:.1}C H:{humidity:.1}%`.
    pub fn link_payload(&self) -> heapless::String<TELEMETRY_PAYLOAD_LEN> {
        let mut s = heapless::String::new();
        // Cannot overflow: two bounded floats plus 8 fixed characters.
        let _ = write!(s, "T:{:.1}C H:{:.1}%", self.temperature_c, self.humidity_pct);
        s
    }
}
