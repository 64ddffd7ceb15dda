//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, the BLE link, event sinks, clocks)
//! implement these traits.  The [`NodeService`](super::service::NodeService)
//! and the [`ControlLoop`](crate::runtime::ControlLoop) consume them via
//! generics, so the domain core never touches hardware directly.

use crate::control::arbitration::ServoAngle;
use crate::control::context::SensorSnapshot;
use crate::error::{ActuatorError, LinkError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the control loop calls this once per tick.
pub trait SensorPort {
    /// Read both sensor branches.  Must not fail as a whole: a branch whose
    /// read failed is returned as `None`.
    fn read_all(&mut self) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command actuators.
///
/// Implementations write unconditionally; redundant-write suppression is
/// the service's job.
pub trait ActuatorPort {
    /// Move the servo.  The angle is already range-checked.  An `Err`
    /// means the servo cannot be assumed to have moved.
    fn set_servo_angle(&mut self, angle: ServoAngle) -> Result<(), ActuatorError>;

    /// Switch the buzzer.
    fn set_buzzer(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Remote link port (driven adapter: domain ↔ BLE peripheral)
// ───────────────────────────────────────────────────────────────

/// Connection-oriented notify channel to a single peer.
///
/// Inbound writes do not go through this trait: the stack callback pushes
/// them into the [`LinkQueue`](crate::link::LinkQueue).
pub trait RemoteLinkPort {
    /// A peer connected with the given connection handle.
    fn on_peer_connected(&mut self, conn_id: u16);

    /// The peer disconnected.
    fn on_peer_disconnected(&mut self);

    /// (Re-)start advertising so a peer can connect.
    fn advertise(&mut self);

    /// Whether a peer is currently connected.
    fn is_connected(&self) -> bool;

    /// Update the sensor characteristic and notify the peer.
    fn notify(&mut self, payload: &str) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock used for tick scheduling and override
/// timestamps.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}
