#![no_main]

use elbenwald_core::config::ElbenwaldConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(toml_str) = std::str::from_utf8(data) {
        if let Ok(config) = ElbenwaldConfig::parse(toml_str) {
            let _ = config.validate();
        }
    }
});
