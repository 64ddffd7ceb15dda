//! Servo arbitration state machine.
//!
//! Decides, per event, whether the servo follows the automatic distance
//! policy or a remote manual override.
//!
//! ```text
//!              command (OPEN / CLOSE)
//!   AUTOMATIC ─────────────────────────▶ MANUAL ──┐ command
//!       ▲                                  │  ◀───┘ (re-arms timeout)
//!       └──── tick, now - issued_at > timeout ┘
//! ```
//!
//! The controller is pure: it never touches hardware.  Callers pass in the
//! angle the servo currently holds and apply the returned
//! [`ServoDirective`] themselves.  A directive is only produced when the
//! requested angle differs from the held one.

use log::{debug, info};

use crate::app::commands::RemoteCommand;
use crate::config::NodeConfig;
use crate::error::ActuatorError;

// ---------------------------------------------------------------------------
// Servo angle domain
// ---------------------------------------------------------------------------

/// Servo position in whole degrees, guaranteed to lie in [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServoAngle(i16);

impl ServoAngle {
    pub const MIN_DEG: i16 = -90;
    pub const MAX_DEG: i16 = 90;
    pub const ZERO: Self = Self(0);

    /// Returns `None` for values outside the domain; never clamps.
    pub const fn new(degrees: i16) -> Option<Self> {
        if degrees >= Self::MIN_DEG && degrees <= Self::MAX_DEG {
            Some(Self(degrees))
        } else {
            None
        }
    }

    pub const fn degrees(self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for ServoAngle {
    type Error = ActuatorError;

    fn try_from(degrees: i16) -> Result<Self, Self::Error> {
        Self::new(degrees).ok_or(ActuatorError::AngleOutOfRange(degrees))
    }
}

// ---------------------------------------------------------------------------
// Mode and override
// ---------------------------------------------------------------------------

/// Which input source currently owns the servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Automatic,
    Manual,
}

/// A remote command that is authoritative while
/// `now - issued_at_ms <= timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualOverride {
    pub issued_at_ms: u64,
    pub requested_angle: i16,
}

/// A servo move requested by the controller, not yet range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoDirective {
    pub angle: i16,
    pub source: ControlMode,
}

/// Result of one periodic evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The manual override expired during this evaluation.
    pub reverted: bool,
    /// Move to apply, if any.
    pub directive: Option<ServoDirective>,
}

/// Internal state.  The override only exists while in manual mode, so the
/// two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Automatic,
    Manual(ManualOverride),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Thresholds and angles the controller works with, taken from
/// [`NodeConfig`] once at construction.
#[derive(Debug, Clone, Copy)]
struct Policy {
    timeout_ms: u64,
    open_distance_cm: f32,
    open_angle: i16,
    closed_angle: i16,
}

pub struct ArbitrationController {
    policy: Policy,
    state: State,
}

impl ArbitrationController {
    /// Construct in [`ControlMode::Automatic`].
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            policy: Policy {
                timeout_ms: u64::from(config.override_timeout_ms),
                open_distance_cm: config.open_distance_cm,
                open_angle: config.open_angle_deg,
                closed_angle: config.closed_angle_deg,
            },
            state: State::Automatic,
        }
    }

    pub fn mode(&self) -> ControlMode {
        match self.state {
            State::Automatic => ControlMode::Automatic,
            State::Manual(_) => ControlMode::Manual,
        }
    }

    pub fn manual_override(&self) -> Option<ManualOverride> {
        match self.state {
            State::Automatic => None,
            State::Manual(o) => Some(o),
        }
    }

    /// Angle a remote command maps to.
    pub fn command_angle(&self, cmd: RemoteCommand) -> i16 {
        match cmd {
            RemoteCommand::Open => self.policy.open_angle,
            RemoteCommand::Close => self.policy.closed_angle,
        }
    }

    /// Record a remote command received at `at_ms`.
    ///
    /// Always (re-)enters manual mode and restarts the timeout window, even
    /// when the servo already holds the requested angle; only the hardware
    /// write is suppressed in that case.
    pub fn on_command(
        &mut self,
        cmd: RemoteCommand,
        at_ms: u64,
        current: ServoAngle,
    ) -> Option<ServoDirective> {
        let angle = self.command_angle(cmd);
        if self.mode() == ControlMode::Automatic {
            info!("Arbitration: manual override engaged ({:?})", cmd);
        }
        self.state = State::Manual(ManualOverride {
            issued_at_ms: at_ms,
            requested_angle: angle,
        });

        if current.degrees() == angle {
            debug!("Arbitration: servo already at {}°, timeout re-armed", angle);
            None
        } else {
            Some(ServoDirective {
                angle,
                source: ControlMode::Manual,
            })
        }
    }

    /// Periodic evaluation.
    ///
    /// 1. Expire the manual override if `now - issued_at > timeout`.
    /// 2. While still manual, emit nothing unless the servo does not hold
    ///    the requested angle (a failed write), in which case re-issue it.
    /// 3. In automatic mode, map a valid distance onto open/closed.  An
    ///    invalid (`None`) distance skips the branch entirely.
    pub fn evaluate(
        &mut self,
        now_ms: u64,
        distance_cm: Option<f32>,
        current: ServoAngle,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if let State::Manual(o) = self.state {
            if now_ms.saturating_sub(o.issued_at_ms) > self.policy.timeout_ms {
                info!("Arbitration: override expired, back to automatic");
                self.state = State::Automatic;
                outcome.reverted = true;
            } else {
                // A manual move that never reached the servo is retried.
                if ServoAngle::new(o.requested_angle).is_some_and(|a| a != current) {
                    outcome.directive = Some(ServoDirective {
                        angle: o.requested_angle,
                        source: ControlMode::Manual,
                    });
                }
                return outcome;
            }
        }

        let Some(target) = distance_cm.and_then(|d| self.automatic_target(d)) else {
            return outcome;
        };
        if target != current.degrees() {
            outcome.directive = Some(ServoDirective {
                angle: target,
                source: ControlMode::Automatic,
            });
        }
        outcome
    }

    /// Distance policy: near ⇒ open, far ⇒ closed, non-positive ⇒ no opinion.
    fn automatic_target(&self, distance_cm: f32) -> Option<i16> {
        if !distance_cm.is_finite() || distance_cm <= 0.0 {
            None
        } else if distance_cm < self.policy.open_distance_cm {
            Some(self.policy.open_angle)
        } else {
            Some(self.policy.closed_angle)
        }
    }
}
