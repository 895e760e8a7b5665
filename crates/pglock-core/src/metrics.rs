// Lease coordination metrics, recorded through the `metrics` facade.
// Without an installed recorder every call is a no-op.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register metric descriptions. Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "lease_acquire_total",
        "Total number of lease acquisition attempts by outcome"
    );
    describe_histogram!(
        "lease_acquire_duration_seconds",
        "Lease acquisition latency in seconds"
    );
    describe_counter!(
        "lease_release_total",
        "Total number of lease release requests by result"
    );
    describe_counter!(
        "lease_store_errors_total",
        "Total number of lease store failures by operation"
    );
}

/// Record one acquisition attempt
pub(crate) fn record_acquire(outcome: &'static str, duration: Duration) {
    counter!("lease_acquire_total", "outcome" => outcome).increment(1);
    histogram!("lease_acquire_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

/// Record one release request
pub(crate) fn record_release(rows_affected: u64) {
    let result = if rows_affected > 0 {
        "released"
    } else {
        "not_found"
    };
    counter!("lease_release_total", "result" => result).increment(1);
}

/// Record a store failure that surfaced as unavailable
pub(crate) fn record_store_error(operation: &'static str) {
    counter!("lease_store_errors_total", "operation" => operation).increment(1);
}
