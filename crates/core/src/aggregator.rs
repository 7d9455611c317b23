//! Per-zone health aggregation.
//!
//! [`HealthAggregator`] turns one batch of [`InstanceHealthRecord`]s into an
//! [`AggregateReport`] and the [`UnhealthyEvent`]s to log. It holds no state
//! between calls, so one aggregator can serve any number of load balancers
//! concurrently.
//!
//! # Classification
//!
//! | state         | description         | healthy | transient | event |
//! |---------------|---------------------|---------|-----------|-------|
//! | `InService`   | -                   | +1      | -         | no    |
//! | not in service| transient pattern   | +1      | +1        | yes   |
//! | not in service| anything else       | +0      | -         | yes   |
//!
//! Every zone that shows up in the input gets an explicit entry, even when
//! none of its instances is healthy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{SubstringClassifier, TransientClassifier};
use crate::error::AggregateError;
use crate::types::{InstanceHealthRecord, UnhealthyEvent};

/// Health counts of one availability zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ZoneStatistics {
    /// Instances counted as healthy, transient failures included
    pub healthy_count: u64,
    /// Instances failing with a transient error
    pub transient_count: u64,
}

/// Aggregated health of every zone behind one load balancer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    /// Per-zone counts, keyed by zone
    pub zone_stats: BTreeMap<String, ZoneStatistics>,
    /// Sum of all per-zone healthy counts
    pub total: u64,
    /// Distinct zones observed
    pub zones: usize,
    /// Zones with at least one healthy instance
    pub healthy_zones: usize,
    /// `zones - healthy_zones`
    pub unhealthy_zones: usize,
    /// Zones with at least one transient-error instance
    pub unknown_zones: usize,
    /// Smallest per-zone healthy count; `None` without zones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<u64>,
    /// `total / zones`, 0 without zones
    pub average: f64,
}

impl AggregateReport {
    /// Derives the summary fields from per-zone statistics.
    pub fn from_zone_stats(zone_stats: BTreeMap<String, ZoneStatistics>) -> Self {
        let total: u64 = zone_stats.values().map(|z| z.healthy_count).sum();
        let zones = zone_stats.len();
        let healthy_zones = zone_stats.values().filter(|z| z.healthy_count > 0).count();
        let unknown_zones = zone_stats.values().filter(|z| z.transient_count > 0).count();
        let minimum = zone_stats.values().map(|z| z.healthy_count).min();
        #[allow(clippy::cast_precision_loss)]
        let average = if zones > 0 {
            total as f64 / zones as f64
        } else {
            0.0
        };

        Self {
            zone_stats,
            total,
            zones,
            healthy_zones,
            unhealthy_zones: zones - healthy_zones,
            unknown_zones,
            minimum,
            average,
        }
    }

    /// Healthy count of a zone, if the zone was observed.
    pub fn healthy_count(&self, zone: &str) -> Option<u64> {
        self.zone_stats.get(zone).map(|z| z.healthy_count)
    }

    /// Whether no instance was observed at all.
    pub fn is_empty(&self) -> bool {
        self.zones == 0
    }
}

/// Result of aggregating one batch.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub report: AggregateReport,
    /// One event per non-service record, in input order
    pub events: Vec<UnhealthyEvent>,
}

/// Stateless zone health aggregator with an injectable transient classifier.
pub struct HealthAggregator {
    classifier: Box<dyn TransientClassifier>,
}

impl HealthAggregator {
    pub fn new(classifier: Box<dyn TransientClassifier>) -> Self {
        Self { classifier }
    }

    /// Aggregates `records`, stamping events with the current time.
    pub fn aggregate(
        &self,
        records: &[InstanceHealthRecord],
    ) -> Result<Aggregation, AggregateError> {
        self.aggregate_at(records, Utc::now())
    }

    /// Aggregates `records`, stamping events with `observed_at`.
    ///
    /// # Errors
    ///
    /// [`AggregateError::MissingZone`] for a record with an empty zone. The
    /// batch is rejected as a whole rather than aggregated without it.
    pub fn aggregate_at(
        &self,
        records: &[InstanceHealthRecord],
        observed_at: DateTime<Utc>,
    ) -> Result<Aggregation, AggregateError> {
        let mut zone_stats: BTreeMap<String, ZoneStatistics> = BTreeMap::new();
        let mut events = Vec::new();

        for record in records {
            if record.availability_zone.is_empty() {
                return Err(AggregateError::MissingZone {
                    instance_id: record.instance_id.clone(),
                });
            }

            let stats = zone_stats
                .entry(record.availability_zone.clone())
                .or_default();

            if record.state.is_in_service() {
                stats.healthy_count += 1;
                continue;
            }

            if self.classifier.is_transient(&record.description) {
                stats.healthy_count += 1;
                stats.transient_count += 1;
            }

            events.push(UnhealthyEvent::new(
                observed_at,
                &record.availability_zone,
                &record.instance_id,
                &record.description,
            ));
        }

        Ok(Aggregation {
            report: AggregateReport::from_zone_stats(zone_stats),
            events,
        })
    }
}

impl Default for HealthAggregator {
    fn default() -> Self {
        Self::new(Box::new(SubstringClassifier::default()))
    }
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthAggregator").finish_non_exhaustive()
    }
}
