//! Read-only views over the notification engine and its reference handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use notifications::handlers::{AuditEntry, StockAlert};
use notifications::{DispatchCounts, DispatcherStats};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::products::parse_product_id;

#[derive(Serialize)]
pub struct NotificationStatsResponse {
    pub handlers: DispatcherStats,
    pub counts: DispatchCounts,
    pub max_in_flight_deferred: usize,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub product_id: Option<String>,
}

#[derive(Serialize)]
pub struct AuditEntryResponse {
    pub event_id: String,
    pub kind: &'static str,
    pub product_id: String,
    pub sku: String,
    pub actor: String,
    pub description: Option<String>,
    pub at: String,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            event_id: entry.event_id.to_string(),
            kind: entry.kind.as_str(),
            product_id: entry.product_id.to_string(),
            sku: entry.sku,
            actor: entry.actor.to_string(),
            description: entry.description,
            at: entry.at.to_rfc3339(),
        }
    }
}

/// GET /notifications/stats — registry composition and dispatch counters.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<NotificationStatsResponse> {
    Json(NotificationStatsResponse {
        handlers: state.dispatcher.stats(),
        counts: state.dispatcher.counters(),
        max_in_flight_deferred: state.dispatcher.config().max_in_flight_deferred,
    })
}

/// GET /audit — the audit trail, optionally filtered by `?product_id=`.
#[tracing::instrument(skip(state, query))]
pub async fn audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, ApiError> {
    let entries = match query.product_id.as_deref() {
        Some(id) => state.audit.entries_for(parse_product_id(id)?).await,
        None => state.audit.entries().await,
    };
    Ok(Json(entries.into_iter().map(AuditEntryResponse::from).collect()))
}

/// GET /alerts — stock alerts raised so far.
pub async fn alerts(State(state): State<Arc<AppState>>) -> Json<Vec<StockAlert>> {
    Json(state.alerts.alerts().await)
}
