//! In-memory audit trail of catalog changes.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Actor, ProductId};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::event::{EventEnvelope, EventId, EventKind};
use crate::handler::{EventHandler, ExecutionMode};
use crate::handlers::DEFAULT_HISTORY_CAPACITY;

/// One recorded occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub event_id: EventId,
    pub kind: EventKind,
    pub product_id: ProductId,
    pub sku: String,
    pub actor: Actor,
    pub description: Option<String>,
    pub at: DateTime<Utc>,
}

impl From<&EventEnvelope> for AuditEntry {
    fn from(event: &EventEnvelope) -> Self {
        Self {
            event_id: event.event_id(),
            kind: event.kind(),
            product_id: event.subject().id,
            sku: event.subject().sku.clone(),
            actor: event.actor().clone(),
            description: event.description().map(str::to_string),
            at: event.timestamp(),
        }
    }
}

/// Inline handler that appends every event to an ordered trail.
///
/// Runs inline so an entry exists before the triggering request completes.
/// Only the most recent `capacity` entries are kept.
#[derive(Clone)]
pub struct AuditTrailHandler {
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
    capacity: usize,
}

impl AuditTrailHandler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Keeps at most `capacity` entries (minimum 1), evicting the oldest.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All retained entries, oldest first.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Entries for a single product, oldest first.
    pub async fn entries_for(&self, product_id: ProductId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.product_id == product_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl EventHandler for AuditTrailHandler {
    fn name(&self) -> &str {
        "AuditTrailHandler"
    }

    fn is_interested_in(&self, _kind: EventKind) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        10
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Inline
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(AuditEntry::from(event));
        Ok(())
    }
}

impl Default for AuditTrailHandler {
    fn default() -> Self {
        Self::new()
    }
}
