//! Fuzz target: control characteristic writes
//!
//! Feeds arbitrary payloads through the link queue truncation and the
//! service's payload handler.  The servo must only ever be written with
//! in-range angles, and an ignored payload must leave the mode untouched.
//!
//! cargo fuzz run fuzz_control_write

#![no_main]

use libfuzzer_sys::fuzz_target;
use proxgate::app::events::AppEvent;
use proxgate::app::ports::{ActuatorPort, EventSink};
use proxgate::app::service::NodeService;
use proxgate::config::NodeConfig;
use proxgate::control::arbitration::ServoAngle;
use proxgate::error::ActuatorError;
use proxgate::link::{LinkEvent, MAX_WRITE_LEN};

struct Outputs;

impl ActuatorPort for Outputs {
    fn set_servo_angle(&mut self, angle: ServoAngle) -> Result<(), ActuatorError> {
        assert!((-90..=90).contains(&angle.degrees()));
        Ok(())
    }

    fn set_buzzer(&mut self, _on: bool) {}
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let LinkEvent::Write { payload, at_ms } = LinkEvent::write(data, 0) else {
        panic!("write constructor produced another variant");
    };
    assert!(payload.len() <= MAX_WRITE_LEN);

    let mut svc = NodeService::new(&NodeConfig::default());
    let before = svc.mode();
    if svc
        .handle_payload(&payload, at_ms, &mut Outputs, &mut Discard)
        .is_none()
    {
        assert_eq!(svc.mode(), before);
    }
});
