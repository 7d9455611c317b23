#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use elbenwald_core::aggregator::HealthAggregator;
use elbenwald_core::types::{InstanceHealthRecord, InstanceState};

/// Structured fuzzer input
#[derive(Arbitrary, Debug)]
struct FuzzRecord {
    /// Small zone space so zones collide
    zone: u8,
    state: FuzzState,
    transient: bool,
    description_suffix: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzState {
    InService,
    OutOfService,
    Unknown,
}

fuzz_target!(|input: Vec<FuzzRecord>| {
    let records: Vec<InstanceHealthRecord> = input
        .iter()
        .take(256)
        .enumerate()
        .map(|(i, r)| {
            let state = match r.state {
                FuzzState::InService => InstanceState::InService,
                FuzzState::OutOfService => InstanceState::OutOfService,
                FuzzState::Unknown => InstanceState::Unknown,
            };
            let description = if r.transient {
                format!("A transient error occurred. {}", r.description_suffix)
            } else {
                r.description_suffix.clone()
            };
            InstanceHealthRecord::new(format!("i-{i}"), format!("zone-{}", r.zone % 8), state, description)
        })
        .collect();

    let observed_at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let aggregation = HealthAggregator::default()
        .aggregate_at(&records, observed_at)
        .expect("every record has a zone");
    let report = aggregation.report;

    let sum: u64 = report.zone_stats.values().map(|z| z.healthy_count).sum();
    assert_eq!(report.total, sum);
    assert_eq!(report.zones, report.zone_stats.len());
    assert_eq!(report.healthy_zones + report.unhealthy_zones, report.zones);
    assert!(report.total <= records.len() as u64);

    let in_service = records.iter().filter(|r| r.state.is_in_service()).count();
    assert_eq!(aggregation.events.len(), records.len() - in_service);
});
