//! Prometheus exposition endpoint.

use axum::http::StatusCode;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::OnceLock;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let registry = Registry::new();
        for metric in ludarr_core::metrics::all_metrics() {
            // Registration only fails on duplicates; the registry is built once.
            let _ = registry.register(metric);
        }
        registry
    })
}

/// GET /metrics
pub async fn render_metrics() -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry().gather(), &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
