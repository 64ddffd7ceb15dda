//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `ble`          | RemoteLinkPort     | Bluedroid GATT server    |
//! | `hardware`     | SensorPort         | Ranger, DHT22 (GPIO)     |
//! |                | ActuatorPort       | Servo (LEDC), buzzer     |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `time`         | ClockPort          | ESP32 system timer       |
//! |                | MicrosClock        |                          |

pub mod ble;
pub mod hardware;
pub mod log_sink;
pub mod time;
