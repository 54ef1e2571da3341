//! Prometheus metrics, registered once at server start and exposed on `/metrics`.

use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec,
};

static REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static REQUEST_LATENCY: OnceCell<HistogramVec> = OnceCell::new();
static COMMITS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static FORWARDS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

pub fn install() {
    let _ = REQUESTS_TOTAL.set(
        register_int_counter_vec!(
            "sentinel_gateway_requests_total",
            "Total HTTP requests handled by the gateway",
            &["route", "result"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = REQUEST_LATENCY.set(
        register_histogram_vec!(
            "sentinel_gateway_request_duration_seconds",
            "Gateway request latency in seconds",
            &["route", "result"],
            exponential_buckets(0.001, 2.0, 15).expect("buckets")
        )
        .expect("register_histogram_vec"),
    );
    let _ = COMMITS_TOTAL.set(
        register_int_counter_vec!(
            "sentinel_gateway_commits_total",
            "Total commit_index outcomes",
            &["result", "error_code"]
        )
        .expect("register_int_counter_vec"),
    );
    let _ = FORWARDS_TOTAL.set(
        register_int_counter_vec!(
            "sentinel_gateway_leader_forwards_total",
            "Total requests forwarded to the current leader",
            &["result"]
        )
        .expect("register_int_counter_vec"),
    );
}

macro_rules! get_metric {
    ($m:expr) => {
        $m.get().expect("metrics::install() must be called before serving")
    };
}

pub fn record_request(route: &str, result: &str, elapsed_secs: f64) {
    get_metric!(REQUESTS_TOTAL).with_label_values(&[route, result]).inc();
    get_metric!(REQUEST_LATENCY)
        .with_label_values(&[route, result])
        .observe(elapsed_secs);
}

pub fn record_commit(result: &str, error_code: &str) {
    get_metric!(COMMITS_TOTAL).with_label_values(&[result, error_code]).inc();
}

pub fn record_forward(result: &str) {
    get_metric!(FORWARDS_TOTAL).with_label_values(&[result]).inc();
}

pub async fn handler() -> ([(axum::http::HeaderName, String); 1], axum::body::Bytes) {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::with_capacity(1 << 16);
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::error!(target: "gateway", error = %e, "failed to encode prometheus metrics");
    }
    (
        [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buf.into(),
    )
}
