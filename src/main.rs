//! Proxgate firmware entry point
//!
//! Hexagonal architecture around a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   BleLink        Esp32Time     │
//! │  (Sensor+Actuator) (EventSink)    (RemoteLink)   (Clock)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeService (pure logic)                  │    │
//! │  │  Arbitration · Buzzer policy · Telemetry               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ControlLoop (tick scheduling · link queue · shutdown)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use log::{info, warn};

use proxgate::adapters::ble::BleLink;
use proxgate::adapters::hardware::HardwareAdapter;
use proxgate::adapters::log_sink::LogEventSink;
use proxgate::adapters::time::Esp32TimeAdapter;
use proxgate::config::NodeConfig;
use proxgate::drivers::buzzer::BuzzerDriver;
use proxgate::drivers::hw_init;
use proxgate::drivers::servo::ServoDriver;
use proxgate::drivers::signal_pin::SignalPin;
use proxgate::drivers::stop_button::StopButton;
use proxgate::link::LINK_EVENTS;
use proxgate::pins;
use proxgate::runtime::{self, ControlLoop};
use proxgate::sensors::dht22::Dht22;
use proxgate::sensors::ultrasonic::UltrasonicRanger;
use proxgate::sensors::SensorHub;

/// Build-time JSON override, e.g.
/// `PROXGATE_CONFIG_JSON='{"open_distance_cm":25.0}' cargo build`.
fn load_config() -> NodeConfig {
    match option_env!("PROXGATE_CONFIG_JSON") {
        Some(json) => match NodeConfig::from_json(json) {
            Ok(cfg) => {
                info!("Config: build-time override applied");
                cfg
            }
            Err(e) => {
                warn!("Config override rejected ({}), using defaults", e);
                NodeConfig::default()
            }
        },
        None => NodeConfig::default(),
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Proxgate v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    config.validate().map_err(|e| anyhow::anyhow!("config: {e}"))?;

    // ── 3. Initialise hardware peripherals ────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow::anyhow!("HAL init failed: {e}"))?;

    // ── 4. Construct adapters ─────────────────────────────────
    let clock = Esp32TimeAdapter::new();

    let sensor_hub = SensorHub::new(
        UltrasonicRanger::new(
            SignalPin::new(pins::RANGER_SIGNAL_GPIO),
            Ets,
            clock,
            config.echo_timeout_us,
        ),
        Dht22::new(SignalPin::new(pins::CLIMATE_DATA_GPIO), Ets, clock),
    );
    let hw = HardwareAdapter::new(sensor_hub, ServoDriver::new(), BuzzerDriver::new());

    let mut ble = BleLink::new(config.device_name.clone());
    if let Err(e) = ble.start() {
        // Automatic control still works without the link.
        warn!("BLE unavailable ({}), continuing without remote link", e);
    }

    let mut stop_button = StopButton::new(pins::STOP_BUTTON_GPIO);

    // ── 5. Control loop ───────────────────────────────────────
    let mut control = ControlLoop::new(&config, hw, ble, clock, LogEventSink::new(), &LINK_EVENTS);
    control.start();

    info!("System ready. Hold the stop button 2 s to shut down.");

    control.run_until(runtime::shutdown_requested, |poll_ms| {
        if stop_button.poll(clock.uptime_ms()) {
            runtime::request_shutdown();
        }
        FreeRtos::delay_ms(poll_ms);
    });

    info!("Shutdown complete.");
    Ok(())
}
