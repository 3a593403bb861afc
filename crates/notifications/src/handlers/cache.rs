//! Product snapshot cache kept fresh from catalog events.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ProductId;
use tokio::sync::RwLock;

use crate::Result;
use crate::event::{EventEnvelope, EventKind, ProductSnapshot};
use crate::handler::{EventHandler, ExecutionMode};

/// Deferred handler that mirrors the latest product snapshots.
///
/// Snapshots are upserted on every state-changing event and evicted on
/// deletion. Failed operations leave the cache untouched. Deferred tasks may
/// finish out of order, so an entry is only replaced by an event that is at
/// least as recent. Deletions leave a timestamped tombstone so an older event
/// finishing late cannot bring the product back.
#[derive(Clone, Default)]
pub struct CacheRefreshHandler {
    products: Arc<RwLock<HashMap<ProductId, Entry>>>,
}

/// Last applied event time, and the snapshot (`None` once deleted).
type Entry = (DateTime<Utc>, Option<ProductSnapshot>);

impl CacheRefreshHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &ProductId) -> Option<ProductSnapshot> {
        self.products
            .read()
            .await
            .get(id)
            .and_then(|(_, snapshot)| snapshot.clone())
    }

    /// Number of cached (not deleted) products.
    pub async fn len(&self) -> usize {
        self.products
            .read()
            .await
            .values()
            .filter(|(_, snapshot)| snapshot.is_some())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventHandler for CacheRefreshHandler {
    fn name(&self) -> &str {
        "CacheRefreshHandler"
    }

    fn is_interested_in(&self, kind: EventKind) -> bool {
        kind != EventKind::OperationFailed
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Deferred
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let subject = event.subject();
        let mut products = self.products.write().await;

        let stale = products
            .get(&subject.id)
            .is_some_and(|(applied_at, _)| *applied_at > event.timestamp());
        if stale {
            tracing::debug!(product_id = %subject.id, kind = %event.kind(), "skipping stale event");
            return Ok(());
        }

        let snapshot = (event.kind() != EventKind::EntityDeleted).then(|| subject.clone());
        products.insert(subject.id, (event.timestamp(), snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn snapshot(id: ProductId, stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            id,
            sku: "SKU-C".to_string(),
            name: "Cup".to_string(),
            category: None,
            price: Money::from_cents(300),
            stock,
        }
    }

    fn event(kind: EventKind, subject: ProductSnapshot) -> EventEnvelope {
        EventEnvelope::builder()
            .kind(kind)
            .subject(subject)
            .try_build()
            .unwrap()
    }

    fn event_at(kind: EventKind, subject: ProductSnapshot, at: DateTime<Utc>) -> EventEnvelope {
        EventEnvelope::builder()
            .kind(kind)
            .subject(subject)
            .timestamp(at)
            .try_build()
            .unwrap()
    }

    #[tokio::test]
    async fn upserts_and_evicts() {
        let cache = CacheRefreshHandler::new();
        let id = ProductId::new();

        cache
            .handle(&event(EventKind::EntityCreated, snapshot(id, 5)))
            .await
            .unwrap();
        assert_eq!(cache.get(&id).await.unwrap().stock, 5);

        cache
            .handle(&event(EventKind::StockChanged, snapshot(id, 2)))
            .await
            .unwrap();
        assert_eq!(cache.get(&id).await.unwrap().stock, 2);

        cache
            .handle(&event(EventKind::EntityDeleted, snapshot(id, 2)))
            .await
            .unwrap();
        assert!(cache.get(&id).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn older_snapshots_do_not_overwrite_newer_ones() {
        let cache = CacheRefreshHandler::new();
        let id = ProductId::new();
        let now = Utc::now();

        cache
            .handle(&event_at(EventKind::StockChanged, snapshot(id, 1), now))
            .await
            .unwrap();
        cache
            .handle(&event_at(
                EventKind::StockChanged,
                snapshot(id, 9),
                now - chrono::Duration::seconds(1),
            ))
            .await
            .unwrap();

        assert_eq!(cache.get(&id).await.unwrap().stock, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn older_events_do_not_resurrect_deleted_products() {
        let cache = CacheRefreshHandler::new();
        let id = ProductId::new();
        let created_at = Utc::now();

        cache
            .handle(&event_at(
                EventKind::EntityDeleted,
                snapshot(id, 4),
                created_at + chrono::Duration::milliseconds(5),
            ))
            .await
            .unwrap();
        cache
            .handle(&event_at(EventKind::EntityCreated, snapshot(id, 4), created_at))
            .await
            .unwrap();

        assert!(cache.get(&id).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn newer_events_apply_after_a_delete() {
        let cache = CacheRefreshHandler::new();
        let id = ProductId::new();
        let deleted_at = Utc::now();

        cache
            .handle(&event_at(EventKind::EntityDeleted, snapshot(id, 0), deleted_at))
            .await
            .unwrap();
        cache
            .handle(&event_at(
                EventKind::EntityCreated,
                snapshot(id, 7),
                deleted_at + chrono::Duration::seconds(1),
            ))
            .await
            .unwrap();

        assert_eq!(cache.get(&id).await.unwrap().stock, 7);
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn ignores_failed_operations() {
        let cache = CacheRefreshHandler::new();
        assert!(!cache.is_interested_in(EventKind::OperationFailed));
        assert!(cache.is_interested_in(EventKind::PriceChanged));
        assert!(cache.is_deferred());
    }
}
