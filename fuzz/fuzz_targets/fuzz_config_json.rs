//! Fuzz target: `NodeConfig::from_json`
//!
//! Malformed or hostile overrides must be rejected, never panic, and any
//! accepted config must pass validation.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use proxgate::config::NodeConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(cfg) = NodeConfig::from_json(json) {
        assert!(cfg.validate().is_ok());
    }
});
