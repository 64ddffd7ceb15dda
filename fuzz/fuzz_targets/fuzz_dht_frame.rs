//! Fuzz target: `dht22::decode_frame`
//!
//! Any frame that decodes must carry a matching checksum and land inside
//! the sensor's documented range.
//!
//! cargo fuzz run fuzz_dht_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use proxgate::sensors::dht22::decode_frame;

fuzz_target!(|frame: [u8; 5]| {
    if let Ok(r) = decode_frame(&frame) {
        let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, frame[4]);
        assert!((0.0..=100.0).contains(&r.humidity_pct));
        assert!((-40.0..=80.0).contains(&r.temperature_c));
    }
});
