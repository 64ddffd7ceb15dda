//! Link event queue between the BLE stack and the control loop.
//!
//! The Bluedroid GATT callback runs on the BT host task.  It never touches
//! domain state: it timestamps each event and pushes it here.  The control
//! loop is the only consumer, so every mode/override mutation happens on
//! one thread.
//!
//! ```text
//! ┌──────────────┐  LinkEvent  ┌──────────────┐
//! │  GATT cb     │────────────▶│ Control Loop │
//! │  (BT task)   │             │  (main task) │
//! └──────────────┘             └──────────────┘
//! ```
//!
//! Control writes go through a bounded channel.  When it is full the oldest
//! write gives way, so the newest command always survives.  Connects and
//! disconnects never queue: they update a latch that the consumer compares
//! against what it last saw, so a burst of writes cannot hide a lost peer.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::Vec;

/// Bytes of a control write kept; only the first one is decoded.
pub const MAX_WRITE_LEN: usize = 20;

/// Channel depth for pending control writes.
pub const LINK_QUEUE_DEPTH: usize = 8;

/// Something that happened on the remote link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected { conn_id: u16 },
    Disconnected,
    /// A control-characteristic write, stamped with the receive time.
    Write {
        payload: Vec<u8, MAX_WRITE_LEN>,
        at_ms: u64,
    },
}

impl LinkEvent {
    /// Build a write event, truncating oversized payloads.
    pub fn write(data: &[u8], at_ms: u64) -> Self {
        let len = data.len().min(MAX_WRITE_LEN);
        let mut payload = Vec::new();
        // Cannot fail: `len` is bounded by the capacity.
        let _ = payload.extend_from_slice(&data[..len]);
        Self::Write { payload, at_ms }
    }
}

/// Peer state as last reported by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeerLatch {
    /// Bumped on every connect and disconnect.
    changes: u32,
    connected: bool,
    /// Handle of the most recent connection, kept after it closes.
    conn_id: u16,
}

impl PeerLatch {
    const IDLE: Self = Self {
        changes: 0,
        connected: false,
        conn_id: 0,
    };
}

type Latch = Mutex<CriticalSectionRawMutex, Cell<PeerLatch>>;

pub struct LinkQueue {
    writes: Channel<CriticalSectionRawMutex, LinkEvent, LINK_QUEUE_DEPTH>,
    /// Written by the producer.
    peer: Latch,
    /// What the consumer has already dispatched.
    seen: Latch,
}

impl LinkQueue {
    pub const fn new() -> Self {
        Self {
            writes: Channel::new(),
            peer: Mutex::new(Cell::new(PeerLatch::IDLE)),
            seen: Mutex::new(Cell::new(PeerLatch::IDLE)),
        }
    }

    /// Non-blocking push.  Connection changes are always recorded.  Returns
    /// `false` when the write channel was full and its oldest entry was
    /// dropped to make room.
    pub fn push(&self, event: LinkEvent) -> bool {
        match event {
            LinkEvent::Connected { conn_id } => {
                self.update_peer(|p| {
                    p.connected = true;
                    p.conn_id = conn_id;
                });
                true
            }
            LinkEvent::Disconnected => {
                self.update_peer(|p| p.connected = false);
                true
            }
            write @ LinkEvent::Write { .. } => match self.writes.try_send(write) {
                Ok(()) => true,
                Err(TrySendError::Full(write)) => {
                    let _ = self.writes.try_receive();
                    let _ = self.writes.try_send(write);
                    false
                }
            },
        }
    }

    /// Hand every pending event to `f`: connection changes first, then
    /// writes in arrival order.  Returns how many events were handed out.
    ///
    /// Only the control loop may call this.
    pub fn drain(&self, mut f: impl FnMut(LinkEvent)) -> usize {
        let mut handled = 0;
        let now = self.peer.lock(Cell::get);
        let before = self.seen.lock(|s| s.replace(now));

        if now.changes != before.changes {
            if before.connected {
                f(LinkEvent::Disconnected);
                handled += 1;
            } else if !now.connected {
                // A whole session opened and closed between two drains.
                f(LinkEvent::Connected { conn_id: now.conn_id });
                f(LinkEvent::Disconnected);
                handled += 2;
            }
            if now.connected {
                f(LinkEvent::Connected { conn_id: now.conn_id });
                handled += 1;
            }
        }

        while let Ok(event) = self.writes.try_receive() {
            f(event);
            handled += 1;
        }
        handled
    }

    fn update_peer(&self, change: impl FnOnce(&mut PeerLatch)) {
        self.peer.lock(|cell| {
            let mut p = cell.get();
            p.changes = p.changes.wrapping_add(1);
            change(&mut p);
            cell.set(p);
        });
    }
}

impl Default for LinkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Link events: BLE callback → control loop.
pub static LINK_EVENTS: LinkQueue = LinkQueue::new();
