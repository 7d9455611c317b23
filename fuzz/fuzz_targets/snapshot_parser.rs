#![no_main]

use elbenwald_adapters::parse_snapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        if let Ok(records) = parse_snapshot(json) {
            // accepted records always carry an id and a zone
            for record in &records {
                assert!(!record.instance_id.trim().is_empty());
                assert!(!record.availability_zone.trim().is_empty());
            }
        }
    }
});
