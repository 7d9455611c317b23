#![no_main]

use elbenwald_adapters::AwsCredentials;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        if let Ok(credentials) = AwsCredentials::from_yaml(yaml) {
            let vars = credentials.env_vars();
            assert!(vars.len() >= 2);
        }
    }
});
