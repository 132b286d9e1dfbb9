//! Prometheus metrics for the engine.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

/// Per-indexer search outcomes, labelled by protocol and result.
pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ludarr_search_requests_total", "Indexer search requests"),
        &["protocol", "result"], // result: "success", "error"
    )
    .unwrap()
});

/// Results returned per aggregate search.
pub static SEARCH_RESULTS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "ludarr_search_results",
            "Merged results per aggregate search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
    )
    .unwrap()
});

/// Submission attempts by client kind.
pub static SUBMIT_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ludarr_submit_attempts_total", "Download submission attempts"),
        &["client"],
    )
    .unwrap()
});

/// Reconciliation cycles run.
pub static RECONCILE_CYCLES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ludarr_reconcile_cycles_total",
        "Reconciliation cycles completed",
    )
    .unwrap()
});

/// Tracked download transitions applied, by new status.
pub static DOWNLOAD_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ludarr_download_transitions_total",
            "Tracked download status transitions",
        ),
        &["status"],
    )
    .unwrap()
});

/// Get all engine metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCH_REQUESTS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(SUBMIT_ATTEMPTS.clone()),
        Box::new(RECONCILE_CYCLES.clone()),
        Box::new(DOWNLOAD_TRANSITIONS.clone()),
    ]
}
