//! Abstract traits for metrics reporting, decoupling the signer driver from
//! the Prometheus registration details in [`crate::prometheus`].

use once_cell::sync::OnceCell;

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured driver metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn driver_metrics() -> &'static dyn DriverMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// A sink for metrics produced by the signer-side protocol driver: one
/// `commit_and_sign` call ends in exactly one of committed / rejected /
/// indeterminate, optionally preceded by a reconciliation run.
pub trait DriverMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of `commit_and_sign` attempts for `kid`.
    fn inc_sign_attempt(&self, kid: &str);
    /// Increments the counter of committed signatures for `kid`, labeled
    /// by whether the commit reached the log or only the ledger mirror.
    fn inc_sign_committed(&self, kid: &str, mirrored: bool);
    /// Increments the counter of rejected commit attempts for `kid`.
    fn inc_sign_rejected(&self, kid: &str, code: &str);
    /// Increments the counter of indeterminate outcomes (the discard rule's
    /// "mark unusable, do not sign" case) for `kid`.
    fn inc_sign_indeterminate(&self, kid: &str);
    /// Increments the counter of reconciliation runs that found the log and
    /// the ledger mirror disagreeing for `kid`.
    fn inc_reconciliation_run(&self, kid: &str);
    /// Observes the end-to-end latency of one `commit_and_sign` call.
    fn observe_commit_latency(&self, kid: &str, duration_secs: f64);
}
impl DriverMetricsSink for NopSink {
    fn inc_sign_attempt(&self, _kid: &str) {}
    fn inc_sign_committed(&self, _kid: &str, _mirrored: bool) {}
    fn inc_sign_rejected(&self, _kid: &str, _code: &str) {}
    fn inc_sign_indeterminate(&self, _kid: &str) {}
    fn inc_reconciliation_run(&self, _kid: &str) {}
    fn observe_commit_latency(&self, _kid: &str, _duration_secs: f64) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind
    /// (crate or subsystem) and its stable `ErrorCode`.
    fn inc_error(&self, kind: &'static str, code: &str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _code: &str) {}
}

/// A unified sink that implements all domain-specific traits, providing a
/// single point of implementation for a metrics backend like Prometheus.
pub trait MetricsSink: DriverMetricsSink + ErrorMetricsSink {}

impl<T> MetricsSink for T where T: DriverMetricsSink + ErrorMetricsSink {}
