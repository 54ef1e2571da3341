#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Observability shared by the `sentinel-node` and `sentinel-cli` binaries:
//! structured JSON logging initialization and a Prometheus metrics sink for
//! the signer-side protocol driver. The gateway crate registers its own
//! request-path metrics directly since it already owns an axum router to
//! mount `/metrics` on; this crate exists for the signer daemon, which
//! doesn't.

/// A lightweight HTTP server exposing `/metrics`, `/healthz`, and `/readyz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;

pub use init::init_tracing;
pub use sinks::{driver_metrics, error_metrics};
