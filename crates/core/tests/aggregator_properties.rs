//! Aggregation scenarios and invariants over arbitrary record batches.

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use elbenwald_core::aggregator::HealthAggregator;
use elbenwald_core::types::{InstanceHealthRecord, InstanceState};
use proptest::prelude::*;

const TRANSIENT: &str = "A transient error occurred. Please try again later.";
const FAILED: &str = "Instance has failed at least the UnhealthyThreshold number of health checks consecutively.";

// =============================================================================
// fleet scenarios
// =============================================================================

#[test]
fn two_zones_one_fully_down() {
    // Given: zone a with two healthy instances, zone b with only failures
    let records = vec![
        InstanceHealthRecord::in_service("i-1", "us-east-1a"),
        InstanceHealthRecord::in_service("i-2", "us-east-1a"),
        InstanceHealthRecord::out_of_service("i-3", "us-east-1b", FAILED),
        InstanceHealthRecord::out_of_service("i-4", "us-east-1b", FAILED),
    ];

    // When
    let aggregation = HealthAggregator::default().aggregate(&records).unwrap();
    let report = aggregation.report;

    // Then
    assert_eq!(report.total, 2);
    assert_eq!(report.zones, 2);
    assert_eq!(report.healthy_zones, 1);
    assert_eq!(report.unhealthy_zones, 1);
    assert_eq!(report.unknown_zones, 0);
    assert_eq!(report.minimum, Some(0));
    assert_eq!(report.average, 1.0);
    assert_eq!(aggregation.events.len(), 2);
}

#[test]
fn three_zone_fleet_with_transient_errors() {
    // Given: A 3 in service; B 2 in service + 1 transient;
    // C 2 in service + 2 transient
    let records = vec![
        InstanceHealthRecord::in_service("i-a1", "A"),
        InstanceHealthRecord::in_service("i-a2", "A"),
        InstanceHealthRecord::in_service("i-a3", "A"),
        InstanceHealthRecord::in_service("i-b1", "B"),
        InstanceHealthRecord::in_service("i-b2", "B"),
        InstanceHealthRecord::out_of_service("i-b3", "B", TRANSIENT),
        InstanceHealthRecord::in_service("i-c1", "C"),
        InstanceHealthRecord::in_service("i-c2", "C"),
        InstanceHealthRecord::out_of_service("i-c3", "C", TRANSIENT),
        InstanceHealthRecord::out_of_service("i-c4", "C", TRANSIENT),
    ];

    // When
    let aggregation = HealthAggregator::default().aggregate(&records).unwrap();
    let report = aggregation.report;

    // Then
    assert_eq!(report.healthy_count("A"), Some(3));
    assert_eq!(report.healthy_count("B"), Some(3));
    assert_eq!(report.healthy_count("C"), Some(4));
    assert_eq!(report.total, 10);
    assert_eq!(report.zones, 3);
    assert_eq!(report.healthy_zones, 3);
    assert_eq!(report.unhealthy_zones, 0);
    assert_eq!(report.unknown_zones, 2);
    assert_eq!(report.minimum, Some(3));
    assert!((report.average - 10.0 / 3.0).abs() < 1e-9);
    assert_eq!(aggregation.events.len(), 3);
}

#[test]
fn persistent_failure_in_mixed_zone_is_not_counted() {
    // Given: C 2 in service + 1 persistent failure + 1 transient
    let records = vec![
        InstanceHealthRecord::in_service("i-a1", "A"),
        InstanceHealthRecord::in_service("i-a2", "A"),
        InstanceHealthRecord::in_service("i-a3", "A"),
        InstanceHealthRecord::in_service("i-b1", "B"),
        InstanceHealthRecord::in_service("i-b2", "B"),
        InstanceHealthRecord::out_of_service("i-b3", "B", TRANSIENT),
        InstanceHealthRecord::in_service("i-c1", "C"),
        InstanceHealthRecord::in_service("i-c2", "C"),
        InstanceHealthRecord::out_of_service("i-c3", "C", FAILED),
        InstanceHealthRecord::out_of_service("i-c4", "C", TRANSIENT),
    ];

    let aggregation = HealthAggregator::default().aggregate(&records).unwrap();
    let report = aggregation.report;

    // Then: the persistent failure adds nothing, the transient one counts
    assert_eq!(report.healthy_count("C"), Some(3));
    assert_eq!(report.total, 9);
    assert_eq!(report.unknown_zones, 2);
    assert_eq!(report.minimum, Some(3));
    assert_eq!(report.average, 3.0);
    assert_eq!(aggregation.events.len(), 3);
}

#[test]
fn single_zone_single_persistent_failure() {
    let records = vec![InstanceHealthRecord::out_of_service("i-1", "Z", FAILED)];

    let report = HealthAggregator::default()
        .aggregate(&records)
        .unwrap()
        .report;

    assert_eq!(report.healthy_count("Z"), Some(0));
    assert_eq!(report.total, 0);
    assert_eq!(report.zones, 1);
    assert_eq!(report.healthy_zones, 0);
    assert_eq!(report.unhealthy_zones, 1);
    assert_eq!(report.minimum, Some(0));
    assert_eq!(report.average, 0.0);
}

#[test]
fn transient_zone_is_healthy_and_unknown() {
    // Given: one zone healthy only because of a transient error
    let records = vec![
        InstanceHealthRecord::in_service("i-1", "a"),
        InstanceHealthRecord::out_of_service("i-2", "b", TRANSIENT),
        InstanceHealthRecord::out_of_service("i-3", "b", FAILED),
    ];

    let report = HealthAggregator::default()
        .aggregate(&records)
        .unwrap()
        .report;

    assert_eq!(report.healthy_count("a"), Some(1));
    assert_eq!(report.healthy_count("b"), Some(1));
    assert_eq!(report.healthy_zones, 2);
    assert_eq!(report.unhealthy_zones, 0);
    assert_eq!(report.unknown_zones, 1);
    assert_eq!(report.minimum, Some(1));
}

#[test]
fn three_zones_average_is_fractional() {
    let records = vec![
        InstanceHealthRecord::in_service("i-1", "a"),
        InstanceHealthRecord::in_service("i-2", "a"),
        InstanceHealthRecord::in_service("i-3", "b"),
        InstanceHealthRecord::out_of_service("i-4", "c", FAILED),
    ];

    let report = HealthAggregator::default()
        .aggregate(&records)
        .unwrap()
        .report;

    assert_eq!(report.total, 3);
    assert_eq!(report.zones, 3);
    assert!((report.average - 1.0).abs() < f64::EPSILON);
    assert_eq!(report.minimum, Some(0));
}

#[test]
fn event_log_lines_follow_input_order() {
    let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let records = vec![
        InstanceHealthRecord::out_of_service("i-9", "b", FAILED),
        InstanceHealthRecord::out_of_service("i-1", "a", TRANSIENT),
    ];

    let events = HealthAggregator::default()
        .aggregate_at(&records, at)
        .unwrap()
        .events;
    let lines: Vec<String> = events.iter().map(|e| e.log_line("web")).collect();

    assert_eq!(
        lines,
        vec![
            format!("[2024-01-15 12:00:00 +0000] [web] [b] [i-9] [{FAILED}]"),
            format!("[2024-01-15 12:00:00 +0000] [web] [a] [i-1] [{TRANSIENT}]"),
        ]
    );
}

// =============================================================================
// invariants
// =============================================================================

fn arb_state() -> impl Strategy<Value = InstanceState> {
    prop_oneof![
        3 => Just(InstanceState::InService),
        2 => Just(InstanceState::OutOfService),
        1 => Just(InstanceState::Unknown),
    ]
}

fn arb_description() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(TRANSIENT.to_owned()),
        Just(FAILED.to_owned()),
        Just("N/A".to_owned()),
        "[a-z ]{0,24}",
    ]
}

fn arb_record() -> impl Strategy<Value = InstanceHealthRecord> {
    (
        "i-[0-9a-f]{8}",
        prop::sample::select(vec!["us-east-1a", "us-east-1b", "us-east-1c", "eu-west-1a"]),
        arb_state(),
        arb_description(),
    )
        .prop_map(|(id, zone, state, description)| {
            InstanceHealthRecord::new(id, zone, state, description)
        })
}

proptest! {
    #[test]
    fn summary_fields_are_consistent(records in prop::collection::vec(arb_record(), 0..64)) {
        let aggregation = HealthAggregator::default().aggregate(&records).unwrap();
        let report = &aggregation.report;

        let distinct_zones: BTreeSet<&str> =
            records.iter().map(|r| r.availability_zone.as_str()).collect();
        prop_assert_eq!(report.zones, distinct_zones.len());
        prop_assert_eq!(report.healthy_zones + report.unhealthy_zones, report.zones);
        prop_assert!(report.unknown_zones <= report.healthy_zones);

        let sum: u64 = report.zone_stats.values().map(|z| z.healthy_count).sum();
        prop_assert_eq!(report.total, sum);
        prop_assert!(report.total <= records.len() as u64);

        for stats in report.zone_stats.values() {
            prop_assert!(stats.transient_count <= stats.healthy_count);
        }

        let not_serving = records.iter().filter(|r| !r.state.is_in_service()).count();
        prop_assert_eq!(aggregation.events.len(), not_serving);

        match report.minimum {
            None => prop_assert_eq!(report.zones, 0),
            Some(min) => {
                prop_assert!(report.zone_stats.values().all(|z| z.healthy_count >= min));
                prop_assert!(report.average >= min as f64);
            }
        }
    }

    #[test]
    fn report_is_independent_of_input_order(records in prop::collection::vec(arb_record(), 0..32)) {
        let aggregator = HealthAggregator::default();
        let forward = aggregator.aggregate(&records).unwrap().report;

        let mut reversed = records.clone();
        reversed.reverse();
        let backward = aggregator.aggregate(&reversed).unwrap().report;

        prop_assert_eq!(forward, backward);
    }
}
