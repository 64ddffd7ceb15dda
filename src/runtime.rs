//! Cooperative control loop.
//!
//! Glues the [`NodeService`] to its adapters.  One thread owns everything;
//! the only cross-thread input is the [`LinkQueue`].
//!
//! Per tick:
//!
//! 1. drain the link queue (connects, disconnects, commands)
//! 2. sample both sensors (may block for a few ms)
//! 3. drain the link queue again, so a command that arrived during the
//!    blocking reads is recorded before evaluation
//! 4. evaluate buzzer + arbitration and write actuators
//! 5. push telemetry to the peer, if one is connected
//!
//! Between ticks [`ControlLoop::poll`] keeps draining the queue so remote
//! commands take effect within one poll interval rather than one tick.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::{ActuatorPort, ClockPort, EventSink, RemoteLinkPort, SensorPort};
use crate::app::service::NodeService;
use crate::config::NodeConfig;
use crate::error::LinkError;
use crate::link::{LinkEvent, LinkQueue};

// ── Shutdown request ─────────────────────────────────────────

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Ask the control loop to park the outputs and stop.  Safe to call from
/// any task.
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

#[cfg(test)]
pub(crate) fn clear_shutdown_request() {
    SHUTDOWN_REQUESTED.store(false, Ordering::Release);
}

// ── ControlLoop ──────────────────────────────────────────────

pub struct ControlLoop<'q, H, L, C, S> {
    service: NodeService,
    hw: H,
    link: L,
    clock: C,
    sink: S,
    queue: &'q LinkQueue,
    tick_interval_ms: u64,
    poll_interval_ms: u32,
    next_tick_ms: u64,
}

impl<'q, H, L, C, S> ControlLoop<'q, H, L, C, S>
where
    H: SensorPort + ActuatorPort,
    L: RemoteLinkPort,
    C: ClockPort,
    S: EventSink,
{
    pub fn new(config: &NodeConfig, hw: H, link: L, clock: C, sink: S, queue: &'q LinkQueue) -> Self {
        Self {
            service: NodeService::new(config),
            hw,
            link,
            clock,
            sink,
            queue,
            tick_interval_ms: u64::from(config.tick_interval_ms),
            poll_interval_ms: config.link_poll_interval_ms,
            next_tick_ms: 0,
        }
    }

    /// Apply the boot directive and open the link for connections.  The
    /// first tick runs on the next [`poll`](Self::poll).
    pub fn start(&mut self) {
        self.service.start(&mut self.hw, &mut self.sink);
        self.link.advertise();
        self.next_tick_ms = self.clock.now_ms();
    }

    /// One scheduler pass: service the link, then tick if due.  Returns
    /// `true` when a tick ran.
    pub fn poll(&mut self) -> bool {
        self.service_link();

        let now = self.clock.now_ms();
        if now < self.next_tick_ms {
            return false;
        }
        self.run_tick();

        // Skip missed slots instead of bursting to catch up.
        self.next_tick_ms += self.tick_interval_ms;
        let now = self.clock.now_ms();
        if self.next_tick_ms <= now {
            self.next_tick_ms = now + self.tick_interval_ms;
        }
        true
    }

    /// Poll until `should_stop` returns `true`, then shut down.  `idle` is
    /// called between passes with the configured poll interval.
    pub fn run_until(&mut self, mut should_stop: impl FnMut() -> bool, mut idle: impl FnMut(u32)) {
        info!("Control loop running ({} ms tick)", self.tick_interval_ms);
        while !should_stop() {
            self.poll();
            idle(self.poll_interval_ms);
        }
        self.shutdown();
    }

    /// Park outputs.  Pending link events are discarded.
    pub fn shutdown(&mut self) {
        let dropped = self.queue.drain(|_| {});
        if dropped > 0 {
            debug!("Shutdown: discarded {} pending link events", dropped);
        }
        self.service.shutdown(&mut self.hw, &mut self.sink);
    }

    /// Drain every pending link event.  Returns how many were handled.
    pub fn service_link(&mut self) -> usize {
        let queue = self.queue;
        queue.drain(|event| self.dispatch(event))
    }

    fn dispatch(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected { conn_id } => {
                self.link.on_peer_connected(conn_id);
                self.sink.emit(&AppEvent::PeerConnected(conn_id));
            }
            LinkEvent::Disconnected => {
                // Mode and any pending override survive link churn.
                self.link.on_peer_disconnected();
                self.link.advertise();
                self.sink.emit(&AppEvent::PeerDisconnected);
            }
            LinkEvent::Write { payload, at_ms } => {
                self.service
                    .handle_payload(&payload, at_ms, &mut self.hw, &mut self.sink);
            }
        }
    }

    fn run_tick(&mut self) {
        let snapshot = self.hw.read_all();
        self.service_link();

        let now = self.clock.now_ms();
        let telemetry = self
            .service
            .tick(now, &snapshot, &mut self.hw, &mut self.sink);

        if let Some(t) = telemetry {
            self.sink.emit(&AppEvent::Telemetry(t));
            self.publish(&t);
        }
    }

    fn publish(&mut self, telemetry: &TelemetryData) {
        if !self.link.is_connected() {
            return;
        }
        let payload = telemetry.link_payload();
        match self.link.notify(&payload) {
            Ok(()) => {}
            Err(LinkError::NotConnected) => debug!("Telemetry skipped: peer gone"),
            Err(e) => warn!("Telemetry notify failed: {}", e),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn service(&self) -> &NodeService {
        &self.service
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
