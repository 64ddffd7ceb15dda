//! Application service, the hexagonal core.
//!
//! [`NodeService`] owns the arbitration controller, the buzzer policy and
//! the record of what the actuators were last told.  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorSnapshot ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                     │        NodeService        │
//!   ActuatorPort ◀────│  Arbitration · Buzzer     │
//!                     └──────────────────────────┘
//!                                  ▲
//!                     RemoteCommand (link queue)
//! ```

use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::control::arbitration::{ArbitrationController, ControlMode, ServoAngle, ServoDirective};
use crate::control::buzzer::BuzzerPolicy;
use crate::control::context::{ActuatorState, SensorSnapshot};

use super::commands::RemoteCommand;
use super::events::{AppEvent, SensorBranch, TelemetryData};
use super::ports::{ActuatorPort, EventSink};

/// Where the servo is parked at boot and on shutdown.
pub const PARK_ANGLE: ServoAngle = ServoAngle::ZERO;

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService {
    arbiter: ArbitrationController,
    buzzer: BuzzerPolicy,
    actuators: ActuatorState,
    tick_count: u64,
}

impl NodeService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            arbiter: ArbitrationController::new(config),
            buzzer: BuzzerPolicy::new(config.buzzer_threshold_c),
            actuators: ActuatorState::default(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot directive: park the servo and silence the buzzer.
    ///
    /// Written unconditionally since the hardware state is unknown at power-on.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.force_safe_outputs(hw);
        sink.emit(&AppEvent::Started {
            angle: PARK_ANGLE.degrees(),
        });
        info!("NodeService started, servo parked at {}°", PARK_ANGLE.degrees());
    }

    /// Safe shutdown: buzzer off, servo parked, regardless of mode or of
    /// what the service believes the hardware holds.
    pub fn shutdown(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.force_safe_outputs(hw);
        sink.emit(&AppEvent::Shutdown);
        info!("NodeService shut down, outputs parked");
    }

    fn force_safe_outputs(&mut self, hw: &mut impl ActuatorPort) {
        hw.set_buzzer(false);
        self.actuators.buzzer_on = false;
        match hw.set_servo_angle(PARK_ANGLE) {
            Ok(()) => self.actuators.current_angle = PARK_ANGLE,
            Err(e) => warn!("Parking servo at {}° failed: {}", PARK_ANGLE.degrees(), e),
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Decode a raw control write and apply it.  Unknown payloads are
    /// dropped without touching the mode or the override timestamp.
    pub fn handle_payload(
        &mut self,
        payload: &[u8],
        at_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<RemoteCommand> {
        let Some(cmd) = RemoteCommand::parse(payload) else {
            let prefix = payload.first().copied();
            debug!("Ignoring control write with prefix {:?}", prefix);
            sink.emit(&AppEvent::CommandIgnored { prefix });
            return None;
        };
        self.handle_command(cmd, at_ms, hw, sink);
        Some(cmd)
    }

    /// Apply a remote command received at `at_ms`.
    pub fn handle_command(
        &mut self,
        cmd: RemoteCommand,
        at_ms: u64,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let prev = self.arbiter.mode();
        let directive = self
            .arbiter
            .on_command(cmd, at_ms, self.actuators.current_angle);

        let now = self.arbiter.mode();
        if now != prev {
            sink.emit(&AppEvent::ModeChanged { from: prev, to: now });
        }
        if let Some(d) = directive {
            self.apply_servo(d, hw, sink);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle against an already-sampled snapshot.
    ///
    /// The climate and distance branches are independent: a failed read in
    /// one never suppresses the other.  Returns the telemetry summary when
    /// the climate branch was valid.
    pub fn tick(
        &mut self,
        now_ms: u64,
        snapshot: &SensorSnapshot,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<TelemetryData> {
        self.tick_count += 1;

        // 1. Buzzer branch
        match snapshot.climate {
            Some(c) => {
                let want = self.buzzer.decide(Some(c), self.actuators.buzzer_on);
                if want {
                    warn!("Temperature {:.1}°C above alarm threshold", c.temperature_c);
                }
                if want != self.actuators.buzzer_on {
                    hw.set_buzzer(want);
                    self.actuators.buzzer_on = want;
                    sink.emit(&AppEvent::BuzzerChanged(want));
                }
            }
            None => sink.emit(&AppEvent::SensorSkipped(SensorBranch::Climate)),
        }

        // 2. Servo branch
        if snapshot.distance_cm.is_none() {
            sink.emit(&AppEvent::SensorSkipped(SensorBranch::Distance));
        }
        let outcome = self
            .arbiter
            .evaluate(now_ms, snapshot.distance_cm, self.actuators.current_angle);
        if outcome.reverted {
            sink.emit(&AppEvent::ModeChanged {
                from: ControlMode::Manual,
                to: ControlMode::Automatic,
            });
        }
        if let Some(d) = outcome.directive {
            self.apply_servo(d, hw, sink);
        }

        // 3. Telemetry
        snapshot.climate.map(|c| TelemetryData {
            temperature_c: c.temperature_c,
            humidity_pct: c.humidity_pct,
            distance_cm: snapshot.distance_cm,
            mode: self.arbiter.mode(),
            servo_angle: self.actuators.current_angle.degrees(),
            buzzer_on: self.actuators.buzzer_on,
        })
    }

    /// Range-check a directive and write it.  Out-of-range angles are
    /// dropped; `current_angle` only changes after a successful write.
    fn apply_servo(
        &mut self,
        directive: ServoDirective,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let Some(angle) = ServoAngle::new(directive.angle) else {
            info!("Dropping servo directive: {}° out of range", directive.angle);
            sink.emit(&AppEvent::DirectiveDropped {
                angle: directive.angle,
            });
            return;
        };
        if angle == self.actuators.current_angle {
            return;
        }

        if let Err(error) = hw.set_servo_angle(angle) {
            warn!(
                "Servo write to {}° failed ({}), still holding {}°",
                angle.degrees(),
                error,
                self.actuators.current_angle.degrees()
            );
            sink.emit(&AppEvent::ServoFault {
                angle: angle.degrees(),
                error,
            });
            return;
        }
        let from = self.actuators.current_angle.degrees();
        self.actuators.current_angle = angle;
        info!(
            "Servo {}° -> {}° ({:?})",
            from,
            angle.degrees(),
            directive.source
        );
        sink.emit(&AppEvent::ServoMoved {
            from,
            to: angle.degrees(),
            source: directive.source,
        });
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> ControlMode {
        self.arbiter.mode()
    }

    pub fn arbiter(&self) -> &ArbitrationController {
        &self.arbiter
    }

    pub fn actuators(&self) -> ActuatorState {
        self.actuators
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
