//! Integration tests for the NodeService → actuators pipeline.
//!
//! Drives the service with scripted snapshots and commands and checks
//! what reaches the (mock) hardware.

use crate::mock_hw::{reading, ActuatorCall, LogSink, MockHardware};

use proxgate::app::commands::RemoteCommand;
use proxgate::app::events::{AppEvent, SensorBranch};
use proxgate::app::service::NodeService;
use proxgate::config::NodeConfig;
use proxgate::control::arbitration::ControlMode;

fn make_service() -> (NodeService, MockHardware, LogSink) {
    let mut svc = NodeService::new(&NodeConfig::default());
    let mut hw = MockHardware::new();
    let mut sink = LogSink::new();
    svc.start(&mut hw, &mut sink);
    hw.clear();
    (svc, hw, sink)
}

// ── Automatic policy ─────────────────────────────────────────

#[test]
fn near_then_far_opens_then_closes() {
    let (mut svc, mut hw, mut sink) = make_service();

    svc.tick(0, &reading(Some(22.0), Some(10.0)), &mut hw, &mut sink);
    svc.tick(1_000, &reading(Some(22.0), Some(20.0)), &mut hw, &mut sink);

    assert_eq!(hw.servo_writes(), vec![90, 0]);
    assert_eq!(svc.mode(), ControlMode::Automatic);
}

#[test]
fn steady_distance_writes_once() {
    let (mut svc, mut hw, mut sink) = make_service();
    for t in 0..5 {
        svc.tick(t * 1_000, &reading(None, Some(8.0)), &mut hw, &mut sink);
    }
    assert_eq!(hw.servo_writes(), vec![90]);
}

// ── Manual override ──────────────────────────────────────────

#[test]
fn open_command_holds_for_timeout_then_reverts() {
    let (mut svc, mut hw, mut sink) = make_service();

    svc.handle_payload(b"1", 0, &mut hw, &mut sink);
    assert_eq!(hw.servo_writes(), vec![90]);
    assert_eq!(svc.mode(), ControlMode::Manual);

    // Far object: automatic would close, but the override holds.
    for t in [1_000, 2_000, 3_000] {
        svc.tick(t, &reading(Some(22.0), Some(50.0)), &mut hw, &mut sink);
        assert_eq!(svc.mode(), ControlMode::Manual, "at {t} ms");
    }
    assert_eq!(hw.servo_writes(), vec![90]);

    // First evaluation past 3000 ms reverts and applies the automatic policy.
    svc.tick(4_000, &reading(Some(22.0), Some(50.0)), &mut hw, &mut sink);
    assert_eq!(svc.mode(), ControlMode::Automatic);
    assert_eq!(hw.servo_writes(), vec![90, 0]);
    assert!(sink.events.contains(&AppEvent::ModeChanged {
        from: ControlMode::Manual,
        to: ControlMode::Automatic,
    }));
}

#[test]
fn repeated_command_rearms_without_redundant_write() {
    let (mut svc, mut hw, mut sink) = make_service();

    svc.handle_payload(b"0", 0, &mut hw, &mut sink);
    assert!(hw.servo_writes().is_empty(), "servo already at 0°");
    assert_eq!(svc.mode(), ControlMode::Manual);

    svc.handle_payload(b"0", 2_500, &mut hw, &mut sink);
    svc.tick(4_000, &reading(None, Some(5.0)), &mut hw, &mut sink);
    assert_eq!(svc.mode(), ControlMode::Manual, "re-armed at 2500 ms");
    assert!(hw.servo_writes().is_empty());

    svc.tick(5_501, &reading(None, Some(5.0)), &mut hw, &mut sink);
    assert_eq!(svc.mode(), ControlMode::Automatic);
    assert_eq!(hw.servo_writes(), vec![90]);
}

#[test]
fn latest_command_wins() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.handle_command(RemoteCommand::Open, 0, &mut hw, &mut sink);
    svc.handle_command(RemoteCommand::Close, 500, &mut hw, &mut sink);
    assert_eq!(hw.servo_writes(), vec![90, 0]);
    assert_eq!(
        svc.arbiter().manual_override().map(|o| o.issued_at_ms),
        Some(500)
    );
}

#[test]
fn unknown_payloads_do_not_touch_override() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.handle_payload(b"1", 0, &mut hw, &mut sink);

    for junk in [&b""[..], b"2", b"x1", b"\n"] {
        assert!(svc.handle_payload(junk, 2_000, &mut hw, &mut sink).is_none());
    }
    assert_eq!(
        svc.arbiter().manual_override().map(|o| o.issued_at_ms),
        Some(0)
    );

    svc.tick(3_001, &reading(None, Some(50.0)), &mut hw, &mut sink);
    assert_eq!(svc.mode(), ControlMode::Automatic);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CommandIgnored { .. })),
        4
    );
}

#[test]
fn out_of_range_command_angle_is_dropped_but_mode_holds() {
    let config = NodeConfig {
        open_angle_deg: 120,
        ..NodeConfig::default()
    };
    let mut svc = NodeService::new(&config);
    let mut hw = MockHardware::new();
    let mut sink = LogSink::new();

    svc.handle_command(RemoteCommand::Open, 0, &mut hw, &mut sink);
    assert!(hw.servo_writes().is_empty());
    assert_eq!(svc.mode(), ControlMode::Manual);
    assert_eq!(svc.actuators().current_angle.degrees(), 0);
    assert!(sink
        .events
        .contains(&AppEvent::DirectiveDropped { angle: 120 }));
}

// ── Servo write failures ─────────────────────────────────────

#[test]
fn failed_automatic_write_is_retried_next_tick() {
    let (mut svc, mut hw, mut sink) = make_service();
    hw.servo_faults = 1;

    svc.tick(0, &reading(None, Some(10.0)), &mut hw, &mut sink);
    assert_eq!(svc.actuators().current_angle.degrees(), 0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ServoFault { angle: 90, .. })),
        1
    );

    svc.tick(1_000, &reading(None, Some(10.0)), &mut hw, &mut sink);
    assert_eq!(hw.servo_writes(), vec![90, 90]);
    assert_eq!(svc.actuators().current_angle.degrees(), 90);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ServoMoved { .. })),
        1
    );
}

#[test]
fn failed_manual_write_is_retried_while_override_holds() {
    let (mut svc, mut hw, mut sink) = make_service();
    hw.servo_faults = 1;

    svc.handle_payload(b"1", 0, &mut hw, &mut sink);
    assert_eq!(svc.mode(), ControlMode::Manual);
    assert_eq!(svc.actuators().current_angle.degrees(), 0);

    // Far object: automatic would keep 0°, the override still wants 90°.
    svc.tick(1_000, &reading(None, Some(50.0)), &mut hw, &mut sink);
    assert_eq!(hw.servo_writes(), vec![90, 90]);
    assert_eq!(svc.actuators().current_angle.degrees(), 90);
    assert_eq!(svc.mode(), ControlMode::Manual);

    svc.tick(2_000, &reading(None, Some(50.0)), &mut hw, &mut sink);
    assert_eq!(hw.servo_writes(), vec![90, 90], "no write once held");
}

#[test]
fn failed_park_on_shutdown_is_logged_not_recorded() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.handle_payload(b"1", 0, &mut hw, &mut sink);
    hw.servo_faults = 1;

    svc.shutdown(&mut hw, &mut sink);
    assert_eq!(svc.actuators().current_angle.degrees(), 90);
    assert!(!svc.actuators().buzzer_on);
    assert_eq!(sink.events.last(), Some(&AppEvent::Shutdown));
}

// ── Branch independence ──────────────────────────────────────

#[test]
fn climate_failure_does_not_block_servo() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.buzzer_on_for_test(&mut hw, &mut sink);

    let t = svc.tick(1_000, &reading(None, Some(10.0)), &mut hw, &mut sink);
    assert!(t.is_none(), "no telemetry without climate");
    assert_eq!(hw.servo_writes(), vec![90]);
    // Buzzer keeps its previous state.
    assert_eq!(hw.buzzer_writes(), vec![true]);
    assert!(svc.actuators().buzzer_on);
    assert!(sink
        .events
        .contains(&AppEvent::SensorSkipped(SensorBranch::Climate)));
}

#[test]
fn distance_failure_does_not_block_buzzer() {
    let (mut svc, mut hw, mut sink) = make_service();
    let t = svc.tick(0, &reading(Some(35.0), None), &mut hw, &mut sink);
    assert!(t.is_some());
    assert_eq!(hw.calls, vec![ActuatorCall::Buzzer(true)]);
}

#[test]
fn buzzer_threshold_is_strict() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.tick(0, &reading(Some(30.0), None), &mut hw, &mut sink);
    assert!(hw.buzzer_writes().is_empty(), "30.0 °C is not above 30.0");
    svc.tick(1_000, &reading(Some(30.1), None), &mut hw, &mut sink);
    svc.tick(2_000, &reading(Some(30.0), None), &mut hw, &mut sink);
    assert_eq!(hw.buzzer_writes(), vec![true, false]);
}

#[test]
fn buzzer_ignores_control_mode() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.handle_payload(b"1", 0, &mut hw, &mut sink);
    svc.tick(500, &reading(Some(40.0), Some(100.0)), &mut hw, &mut sink);
    assert_eq!(hw.buzzer_writes(), vec![true]);
}

// ── Telemetry ────────────────────────────────────────────────

#[test]
fn telemetry_reflects_post_tick_state() {
    let (mut svc, mut hw, mut sink) = make_service();
    let t = svc
        .tick(0, &reading(Some(31.26), Some(4.0)), &mut hw, &mut sink)
        .expect("climate valid");
    assert_eq!(t.servo_angle, 90);
    assert!(t.buzzer_on);
    assert_eq!(t.distance_cm, Some(4.0));
    assert_eq!(t.link_payload().as_str(), "T:31.3C H:50.0%");
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn shutdown_parks_from_manual_with_buzzer_on() {
    let (mut svc, mut hw, mut sink) = make_service();
    svc.handle_payload(b"1", 0, &mut hw, &mut sink);
    svc.tick(100, &reading(Some(45.0), None), &mut hw, &mut sink);
    hw.clear();

    svc.shutdown(&mut hw, &mut sink);
    assert_eq!(
        hw.calls,
        vec![ActuatorCall::Buzzer(false), ActuatorCall::Servo(0)]
    );
    assert_eq!(sink.events.last(), Some(&AppEvent::Shutdown));
}

// ── Helpers ──────────────────────────────────────────────────

trait BuzzerOn {
    fn buzzer_on_for_test(&mut self, hw: &mut MockHardware, sink: &mut LogSink);
}

impl BuzzerOn for NodeService {
    /// Sound the buzzer through the public API, then forget the writes.
    fn buzzer_on_for_test(&mut self, hw: &mut MockHardware, sink: &mut LogSink) {
        self.tick(0, &reading(Some(35.0), None), hw, sink);
        assert!(self.actuators().buzzer_on);
    }
}
