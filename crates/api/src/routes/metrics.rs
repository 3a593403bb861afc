//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::Dispatcher;

/// State for the metrics route: the exporter plus the dispatcher whose
/// registry size is sampled on every scrape.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub dispatcher: Arc<Dispatcher>,
}

/// GET /metrics — returns Prometheus-formatted metrics.
pub async fn get(State(state): State<MetricsState>) -> impl IntoResponse {
    let stats = state.dispatcher.stats();
    metrics::gauge!("notifications_registered_handlers", "mode" => "inline")
        .set(stats.inline as f64);
    metrics::gauge!("notifications_registered_handlers", "mode" => "deferred")
        .set(stats.deferred as f64);

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.handle.render(),
    )
}
