//! HTTP API server for the product catalog.
//!
//! Provides REST endpoints for product management plus read-only views of the
//! notification engine, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use catalog::{CatalogService, InMemoryProductRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::Dispatcher;
use notifications::handlers::{
    AuditTrailHandler, CacheRefreshHandler, LoggingHandler, StockAlertHandler,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::metrics::MetricsState;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub catalog: CatalogService<InMemoryProductRepository>,
    pub dispatcher: Arc<Dispatcher>,
    pub audit: AuditTrailHandler,
    pub alerts: StockAlertHandler,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(MetricsState {
            handle: metrics_handle,
            dispatcher: state.dispatcher.clone(),
        });

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/products",
            post(routes::products::create).get(routes::products::list),
        )
        .route(
            "/products/{id}",
            get(routes::products::get)
                .put(routes::products::update)
                .delete(routes::products::delete),
        )
        .route("/products/{id}/stock", post(routes::products::adjust_stock))
        .route("/products/{id}/price", post(routes::products::change_price))
        .route(
            "/products/{id}/discount",
            post(routes::products::apply_discount),
        )
        .route("/notifications/stats", get(routes::notifications::stats))
        .route("/audit", get(routes::notifications::audit))
        .route("/alerts", get(routes::notifications::alerts))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the dispatcher, the reference handlers and the catalog service.
///
/// This is the only place a dispatcher is created; everything that publishes
/// or reads notifications receives this instance.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    let dispatcher = Arc::new(Dispatcher::with_config(config.dispatcher.clone()));

    let audit = AuditTrailHandler::with_capacity(config.history_capacity);
    let alerts = StockAlertHandler::with_capacity(config.history_capacity);
    dispatcher.register(Arc::new(LoggingHandler::new()));
    dispatcher.register(Arc::new(audit.clone()));
    dispatcher.register(Arc::new(alerts.clone()));
    dispatcher.register(Arc::new(CacheRefreshHandler::new()));

    let stats = dispatcher.stats();
    tracing::info!(
        handlers = stats.total,
        inline = stats.inline,
        deferred = stats.deferred,
        "notification handlers registered"
    );

    let catalog = CatalogService::with_config(
        InMemoryProductRepository::new(),
        dispatcher.clone(),
        config.catalog.clone(),
    );

    Arc::new(AppState {
        catalog,
        dispatcher,
        audit,
        alerts,
    })
}
