//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, HistogramVec,
    IntCounterVec,
};

static SIGN_ATTEMPTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SIGN_COMMITTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SIGN_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static SIGN_INDETERMINATE_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static RECONCILIATION_RUNS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static COMMIT_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Helper macro to reduce boilerplate for getting a metric from OnceCell.
/// This will panic if `install()` has not been called, which is intentional
/// as it indicates a critical application setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl DriverMetricsSink for PrometheusSink {
    fn inc_sign_attempt(&self, kid: &str) {
        get_metric!(SIGN_ATTEMPTS_TOTAL).with_label_values(&[kid]).inc();
    }
    fn inc_sign_committed(&self, kid: &str, mirrored: bool) {
        get_metric!(SIGN_COMMITTED_TOTAL)
            .with_label_values(&[kid, if mirrored { "true" } else { "false" }])
            .inc();
    }
    fn inc_sign_rejected(&self, kid: &str, code: &str) {
        get_metric!(SIGN_REJECTED_TOTAL).with_label_values(&[kid, code]).inc();
    }
    fn inc_sign_indeterminate(&self, kid: &str) {
        get_metric!(SIGN_INDETERMINATE_TOTAL).with_label_values(&[kid]).inc();
    }
    fn inc_reconciliation_run(&self, kid: &str) {
        get_metric!(RECONCILIATION_RUNS_TOTAL).with_label_values(&[kid]).inc();
    }
    fn observe_commit_latency(&self, kid: &str, duration_secs: f64) {
        get_metric!(COMMIT_LATENCY_SECONDS).with_label_values(&[kid]).observe(duration_secs);
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, code: &str) {
        get_metric!(ERRORS_TOTAL).with_label_values(&[kind, code]).inc();
    }
}

/// Initializes all Prometheus metrics collectors and returns a static
/// reference to the sink. Must be called exactly once at process startup.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    SIGN_ATTEMPTS_TOTAL
        .set(register_int_counter_vec!(
            "sentinel_driver_sign_attempts_total",
            "Total commit_and_sign attempts.",
            &["kid"]
        )?)
        .expect("static already initialized");
    SIGN_COMMITTED_TOTAL
        .set(register_int_counter_vec!(
            "sentinel_driver_sign_committed_total",
            "Total commit_and_sign calls that reached a committed outcome.",
            &["kid", "mirrored"]
        )?)
        .expect("static already initialized");
    SIGN_REJECTED_TOTAL
        .set(register_int_counter_vec!(
            "sentinel_driver_sign_rejected_total",
            "Total commit_and_sign calls rejected by the cluster, by error code.",
            &["kid", "code"]
        )?)
        .expect("static already initialized");
    SIGN_INDETERMINATE_TOTAL
        .set(register_int_counter_vec!(
            "sentinel_driver_sign_indeterminate_total",
            "Total commit_and_sign calls with an indeterminate outcome; the index is marked unusable.",
            &["kid"]
        )?)
        .expect("static already initialized");
    RECONCILIATION_RUNS_TOTAL
        .set(register_int_counter_vec!(
            "sentinel_driver_reconciliation_runs_total",
            "Total reconciliation runs that found the log and the ledger mirror disagreeing.",
            &["kid"]
        )?)
        .expect("static already initialized");
    COMMIT_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "sentinel_driver_commit_latency_seconds",
            "End-to-end latency of a commit_and_sign call.",
            &["kid"],
            exponential_buckets(0.005, 2.0, 14)?
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "sentinel_errors_total",
            "Total number of errors, categorized by crate/subsystem and stable error code.",
            &["kind", "code"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
