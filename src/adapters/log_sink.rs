//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! The `TELEM` line doubles as the per-cycle console report.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                let distance = t.distance_cm.unwrap_or(-1.0);
                info!(
                    "TELEM | T={:.1}\u{00b0}C H={:.1}% | dist={:.1}cm | mode={:?} \
                     servo={}\u{00b0} | buzzer={}",
                    t.temperature_c,
                    t.humidity_pct,
                    distance,
                    t.mode,
                    t.servo_angle,
                    if t.buzzer_on { "ON" } else { "off" },
                );
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            AppEvent::ServoMoved { from, to, source } => {
                info!("SERVO | {}\u{00b0} -> {}\u{00b0} ({:?})", from, to, source);
            }
            AppEvent::DirectiveDropped { angle } => {
                info!("SERVO | dropped out-of-range {}\u{00b0}", angle);
            }
            AppEvent::ServoFault { angle, error } => {
                warn!("SERVO | write to {}\u{00b0} failed: {}", angle, error);
            }
            AppEvent::BuzzerChanged(on) => {
                info!("BUZZ  | {}", if *on { "ON" } else { "off" });
            }
            AppEvent::CommandIgnored { prefix } => {
                debug!("CMD   | ignored prefix {:?}", prefix);
            }
            AppEvent::SensorSkipped(branch) => {
                warn!("SENSE | {:?} branch skipped", branch);
            }
            AppEvent::PeerConnected(conn_id) => {
                info!("LINK  | peer connected (conn_id={})", conn_id);
            }
            AppEvent::PeerDisconnected => {
                info!("LINK  | peer disconnected, advertising");
            }
            AppEvent::Started { angle } => {
                info!("START | servo parked at {}\u{00b0}", angle);
            }
            AppEvent::Shutdown => {
                info!("STOP  | outputs parked");
            }
        }
    }
}
