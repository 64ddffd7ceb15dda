//! Integration tests for the cooperative control loop.
//!
//! Every test owns its link queue so parallel test threads never share
//! events.  The one exception is the sensor-read hook, which needs a
//! `static` queue because the hook is a plain `fn()`.

use crate::mock_hw::{reading, ActuatorCall, LogSink, MockHardware, MockLink, SimClock};

use proxgate::app::events::AppEvent;
use proxgate::app::ports::RemoteLinkPort;
use proxgate::config::NodeConfig;
use proxgate::control::arbitration::ControlMode;
use proxgate::error::LinkError;
use proxgate::link::{LinkEvent, LinkQueue, LINK_QUEUE_DEPTH};
use proxgate::runtime::ControlLoop;

type Loop<'q> = ControlLoop<'q, MockHardware, MockLink, SimClock, LogSink>;

fn make_loop<'q>(queue: &'q LinkQueue, hw: MockHardware) -> (Loop<'q>, SimClock) {
    let clock = SimClock::default();
    let mut ctl = ControlLoop::new(
        &NodeConfig::default(),
        hw,
        MockLink::default(),
        clock.clone(),
        LogSink::new(),
        queue,
    );
    ctl.start();
    (ctl, clock)
}

// ── Startup ──────────────────────────────────────────────────

#[test]
fn start_parks_outputs_and_advertises() {
    let queue = LinkQueue::new();
    let (ctl, _clock) = make_loop(&queue, MockHardware::new());

    assert_eq!(
        ctl.hw().calls,
        vec![ActuatorCall::Buzzer(false), ActuatorCall::Servo(0)]
    );
    assert_eq!(ctl.link().advertise_calls, 1);
    assert_eq!(ctl.sink().events, vec![AppEvent::Started { angle: 0 }]);
    assert_eq!(ctl.hw().reads, 0, "first tick waits for poll");
}

#[test]
fn first_poll_ticks_then_waits_for_interval() {
    let queue = LinkQueue::new();
    let (mut ctl, clock) = make_loop(&queue, MockHardware::new());

    assert!(ctl.poll());
    clock.set(999);
    assert!(!ctl.poll());
    clock.set(1_000);
    assert!(ctl.poll());
    assert_eq!(ctl.service().tick_count(), 2);
}

#[test]
fn missed_slots_are_skipped_not_replayed() {
    let queue = LinkQueue::new();
    let (mut ctl, clock) = make_loop(&queue, MockHardware::new());

    assert!(ctl.poll());
    clock.set(5_500);
    assert!(ctl.poll());
    clock.set(6_000);
    assert!(!ctl.poll(), "no burst after a stall");
    clock.set(6_500);
    assert!(ctl.poll());
    assert_eq!(ctl.service().tick_count(), 3);
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn queued_command_applies_between_ticks() {
    let queue = LinkQueue::new();
    let (mut ctl, clock) = make_loop(&queue, MockHardware::new());
    assert!(ctl.poll());
    ctl.hw_mut().clear();

    clock.set(200);
    assert!(queue.push(LinkEvent::write(b"1", 200)));
    assert!(!ctl.poll(), "not a tick yet");

    assert_eq!(ctl.hw().servo_writes(), vec![90]);
    assert_eq!(ctl.service().mode(), ControlMode::Manual);
}

static DURING_READ: LinkQueue = LinkQueue::new();

fn close_during_read() {
    let _ = DURING_READ.push(LinkEvent::write(b"0", 1_000));
}

#[test]
fn command_arriving_during_sensor_read_wins_over_automatic() {
    let mut hw = MockHardware::with_fallback(reading(Some(22.0), Some(5.0)));
    hw.on_read = Some(close_during_read);
    let (mut ctl, clock) = make_loop(&DURING_READ, hw);

    assert!(DURING_READ.push(LinkEvent::write(b"1", 0)));
    clock.set(1_000);
    assert!(ctl.poll());

    // Boot park, OPEN before the read, CLOSE during it.  The near object
    // would have opened the servo, but the close is already recorded.
    assert_eq!(ctl.hw().servo_writes(), vec![0, 90, 0]);
    assert_eq!(ctl.service().mode(), ControlMode::Manual);
    assert_eq!(
        ctl.service().arbiter().manual_override().map(|o| o.issued_at_ms),
        Some(1_000)
    );
}

// ── Telemetry ────────────────────────────────────────────────

#[test]
fn telemetry_is_notified_only_while_connected() {
    let queue = LinkQueue::new();
    let hw = MockHardware::with_fallback(reading(Some(22.0), Some(50.0)));
    let (mut ctl, clock) = make_loop(&queue, hw);

    assert!(ctl.poll());
    assert!(ctl.link().notified.is_empty());
    assert_eq!(
        ctl.sink().count(|e| matches!(e, AppEvent::Telemetry(_))),
        1,
        "telemetry is still logged without a peer"
    );

    assert!(queue.push(LinkEvent::Connected { conn_id: 3 }));
    clock.set(1_000);
    assert!(ctl.poll());
    assert_eq!(ctl.link().notified, vec!["T:22.0C H:50.0%".to_owned()]);
}

#[test]
fn no_telemetry_when_climate_read_fails() {
    let queue = LinkQueue::new();
    let hw = MockHardware::with_fallback(reading(None, Some(50.0)));
    let (mut ctl, _clock) = make_loop(&queue, hw);

    assert!(queue.push(LinkEvent::Connected { conn_id: 0 }));
    assert!(ctl.poll());
    assert!(ctl.link().notified.is_empty());
}

#[test]
fn notify_failure_does_not_stop_control() {
    let queue = LinkQueue::new();
    let hw = MockHardware::with_fallback(reading(Some(22.0), Some(5.0)));
    let (mut ctl, _clock) = make_loop(&queue, hw);

    assert!(queue.push(LinkEvent::Connected { conn_id: 1 }));
    ctl.link_mut().fail_with = Some(LinkError::NotifyFailed(-1));

    assert!(ctl.poll());
    assert!(ctl.link().notified.is_empty());
    assert_eq!(ctl.hw().servo_writes(), vec![0, 90]);
}

// ── Link churn ───────────────────────────────────────────────

#[test]
fn disconnect_readvertises_and_keeps_manual_mode() {
    let queue = LinkQueue::new();
    let (mut ctl, clock) = make_loop(&queue, MockHardware::new());

    assert!(queue.push(LinkEvent::Connected { conn_id: 7 }));
    assert!(queue.push(LinkEvent::write(b"1", 0)));
    assert!(queue.push(LinkEvent::Disconnected));
    ctl.service_link();

    assert!(!ctl.link().is_connected());
    assert_eq!(ctl.link().advertise_calls, 2);
    assert_eq!(ctl.service().mode(), ControlMode::Manual);

    assert!(queue.push(LinkEvent::Connected { conn_id: 8 }));
    clock.set(1_000);
    ctl.poll();
    assert_eq!(ctl.link().conn_id, Some(8));
    assert_eq!(ctl.service().mode(), ControlMode::Manual);
    assert_eq!(
        ctl.sink().count(|e| matches!(e, AppEvent::PeerConnected(_))),
        2
    );
}

#[test]
fn disconnect_behind_a_write_burst_is_not_lost() {
    let queue = LinkQueue::new();
    let (mut ctl, _clock) = make_loop(&queue, MockHardware::new());

    assert!(queue.push(LinkEvent::Connected { conn_id: 2 }));
    ctl.service_link();
    assert!(ctl.link().is_connected());

    for i in 0..LINK_QUEUE_DEPTH as u64 {
        assert!(queue.push(LinkEvent::write(b"0", i)));
    }
    // Channel full: the oldest write gives way to the newest.
    assert!(!queue.push(LinkEvent::write(b"1", 50)));
    assert!(queue.push(LinkEvent::Disconnected));

    assert_eq!(ctl.service_link(), 1 + LINK_QUEUE_DEPTH);
    assert!(!ctl.link().is_connected());
    assert_eq!(ctl.link().advertise_calls, 2);
    assert_eq!(
        ctl.sink().count(|e| matches!(e, AppEvent::PeerDisconnected)),
        1
    );
    assert_eq!(
        ctl.service()
            .arbiter()
            .manual_override()
            .map(|o| o.issued_at_ms),
        Some(50)
    );
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn run_until_parks_outputs_on_stop() {
    let queue = LinkQueue::new();
    let hw = MockHardware::with_fallback(reading(Some(35.0), Some(5.0)));
    let (mut ctl, clock) = make_loop(&queue, hw);

    let mut passes = 0;
    let idle_clock = clock.clone();
    ctl.run_until(
        || {
            passes += 1;
            passes > 100
        },
        |poll_ms| idle_clock.advance(u64::from(poll_ms)),
    );

    // 100 passes at 20 ms cover 0..1980 ms: ticks at 0 and 1000.
    assert_eq!(ctl.service().tick_count(), 2);
    let calls = &ctl.hw().calls;
    assert_eq!(
        &calls[calls.len() - 2..],
        &[ActuatorCall::Buzzer(false), ActuatorCall::Servo(0)]
    );
    assert_eq!(ctl.sink().events.last(), Some(&AppEvent::Shutdown));
}

#[test]
fn shutdown_discards_pending_commands() {
    let queue = LinkQueue::new();
    let (mut ctl, _clock) = make_loop(&queue, MockHardware::new());
    ctl.hw_mut().clear();

    assert!(queue.push(LinkEvent::write(b"1", 0)));
    ctl.shutdown();

    assert_eq!(
        ctl.hw().calls,
        vec![ActuatorCall::Buzzer(false), ActuatorCall::Servo(0)]
    );
    assert_eq!(queue.drain(|_| {}), 0);
}
