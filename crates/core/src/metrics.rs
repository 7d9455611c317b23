//! Metric names and descriptions.
//!
//! Every metric is defined here and recorded through the `metrics` facade
//! (`metrics::gauge!(...)`). Without an installed recorder the calls are
//! no-ops, so library code records unconditionally.
//!
//! # Naming
//!
//! - prefix: `elbenwald_`
//! - suffix: `_total` (counter), `_seconds` (histogram), none (gauge)

// ─── label keys ──────────────────────────────────────────────────────

/// Load balancer name
pub const LABEL_LOAD_BALANCER: &str = "load_balancer";

/// Availability zone
pub const LABEL_ZONE: &str = "zone";

/// Check result (success, fetch_error, aggregate_error)
pub const LABEL_RESULT: &str = "result";

// ─── report gauges (one series per load balancer) ──────────────────

/// Healthy instances of one zone (labels: load_balancer, zone)
pub const ZONE_HEALTHY_INSTANCES: &str = "elbenwald_zone_healthy_instances";

/// Transient-error instances of one zone (labels: load_balancer, zone)
pub const ZONE_TRANSIENT_INSTANCES: &str = "elbenwald_zone_transient_instances";

/// Healthy instances across all zones
pub const HEALTHY_INSTANCES: &str = "elbenwald_healthy_instances";

/// Zones observed
pub const ZONES: &str = "elbenwald_zones";

/// Zones with at least one healthy instance
pub const HEALTHY_ZONES: &str = "elbenwald_healthy_zones";

/// Zones without healthy instances
pub const UNHEALTHY_ZONES: &str = "elbenwald_unhealthy_zones";

/// Zones with at least one transient-error instance
pub const UNKNOWN_ZONES: &str = "elbenwald_unknown_zones";

/// Smallest per-zone healthy count (not set without zones)
pub const MINIMUM_ZONE_HEALTHY: &str = "elbenwald_minimum_zone_healthy_instances";

/// Average per-zone healthy count
pub const AVERAGE_ZONE_HEALTHY: &str = "elbenwald_average_zone_healthy_instances";

// ─── check counters ─────────────────────────────────────────────────

/// Completed or aborted checks (labels: load_balancer, result)
pub const CHECKS_TOTAL: &str = "elbenwald_checks_total";

/// Unhealthy-instance events emitted (label: load_balancer)
pub const UNHEALTHY_EVENTS_TOTAL: &str = "elbenwald_unhealthy_events_total";

/// Failed report deliveries (label: load_balancer)
pub const REPORT_FAILURES_TOTAL: &str = "elbenwald_report_failures_total";

/// Failed error log appends (label: load_balancer)
pub const EVENT_LOG_FAILURES_TOTAL: &str = "elbenwald_event_log_failures_total";

/// Duration of one check, fetch included (histogram)
pub const CHECK_DURATION_SECONDS: &str = "elbenwald_check_duration_seconds";

// ─── daemon ─────────────────────────────────────────────────────────

/// Daemon uptime (gauge, seconds)
pub const DAEMON_UPTIME_SECONDS: &str = "elbenwald_daemon_uptime_seconds";

/// Build info (gauge, always 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "elbenwald_daemon_build_info";

/// Check rounds started by the daemon (counter)
pub const DAEMON_ROUNDS_TOTAL: &str = "elbenwald_daemon_rounds_total";

/// Buckets for [`CHECK_DURATION_SECONDS`]; fetches are network bound.
pub const CHECK_DURATION_BUCKETS: [f64; 9] = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Registers HELP text for every metric.
///
/// Call once, after the global recorder is installed.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_gauge!(
        ZONE_HEALTHY_INSTANCES,
        "Instances counted healthy in the zone, transient failures included"
    );
    describe_gauge!(
        ZONE_TRANSIENT_INSTANCES,
        "Instances failing with a transient error in the zone"
    );
    describe_gauge!(HEALTHY_INSTANCES, "Healthy instances across all zones");
    describe_gauge!(ZONES, "Availability zones observed");
    describe_gauge!(HEALTHY_ZONES, "Zones with at least one healthy instance");
    describe_gauge!(UNHEALTHY_ZONES, "Zones without any healthy instance");
    describe_gauge!(
        UNKNOWN_ZONES,
        "Zones with at least one instance failing with a transient error"
    );
    describe_gauge!(MINIMUM_ZONE_HEALTHY, "Smallest per-zone healthy count");
    describe_gauge!(AVERAGE_ZONE_HEALTHY, "Average per-zone healthy count");

    describe_counter!(CHECKS_TOTAL, "Health checks run, by result");
    describe_counter!(
        UNHEALTHY_EVENTS_TOTAL,
        "Instances observed outside of InService"
    );
    describe_counter!(REPORT_FAILURES_TOTAL, "Aggregate reports that failed to deliver");
    describe_counter!(
        EVENT_LOG_FAILURES_TOTAL,
        "Error log appends that failed"
    );
    describe_histogram!(
        CHECK_DURATION_SECONDS,
        "Time to fetch, aggregate and deliver one check in seconds"
    );

    describe_gauge!(DAEMON_UPTIME_SECONDS, "Elbenwald daemon uptime in seconds");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
    describe_counter!(DAEMON_ROUNDS_TOTAL, "Check rounds started by the daemon");
}
