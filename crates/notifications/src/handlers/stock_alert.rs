//! Low-stock alerting.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ProductId;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::event::{EventEnvelope, EventKind};
use crate::handler::{EventHandler, ExecutionMode};
use crate::handlers::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    pub product_id: ProductId,
    pub sku: String,
    pub stock: u32,
    pub severity: AlertSeverity,
    pub raised_at: DateTime<Utc>,
}

/// Deferred handler that raises an alert for low or exhausted stock.
///
/// Keeps the most recent `capacity` alerts.
#[derive(Clone)]
pub struct StockAlertHandler {
    alerts: Arc<RwLock<VecDeque<StockAlert>>>,
    capacity: usize,
}

impl StockAlertHandler {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            alerts: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn alerts(&self) -> Vec<StockAlert> {
        self.alerts.read().await.iter().cloned().collect()
    }

    /// Alerts at the given severity.
    pub async fn alerts_with(&self, severity: AlertSeverity) -> Vec<StockAlert> {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| a.severity == severity)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventHandler for StockAlertHandler {
    fn name(&self) -> &str {
        "StockAlertHandler"
    }

    fn is_interested_in(&self, kind: EventKind) -> bool {
        matches!(kind, EventKind::StockLow | EventKind::StockExhausted)
    }

    fn priority(&self) -> i32 {
        50
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Deferred
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let severity = match event.kind() {
            EventKind::StockExhausted => AlertSeverity::Critical,
            _ => AlertSeverity::Warning,
        };
        let subject = event.subject();

        tracing::warn!(
            product_id = %subject.id,
            sku = %subject.sku,
            stock = subject.stock,
            ?severity,
            "stock alert raised"
        );

        let mut alerts = self.alerts.write().await;
        if alerts.len() == self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(StockAlert {
            product_id: subject.id,
            sku: subject.sku.clone(),
            stock: subject.stock,
            severity,
            raised_at: event.timestamp(),
        });
        Ok(())
    }
}

impl Default for StockAlertHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ProductSnapshot;
    use common::Money;

    fn event(kind: EventKind, stock: u32) -> EventEnvelope {
        EventEnvelope::builder()
            .kind(kind)
            .subject(ProductSnapshot {
                id: ProductId::new(),
                sku: "SKU-S".to_string(),
                name: "Screw".to_string(),
                category: None,
                price: Money::from_cents(10),
                stock,
            })
            .try_build()
            .unwrap()
    }

    #[test]
    fn only_interested_in_low_and_exhausted() {
        let handler = StockAlertHandler::new();
        let interested: Vec<_> = EventKind::ALL
            .into_iter()
            .filter(|k| handler.is_interested_in(*k))
            .collect();
        assert_eq!(interested, vec![EventKind::StockLow, EventKind::StockExhausted]);
        assert!(handler.is_deferred());
    }

    #[tokio::test]
    async fn severity_follows_kind() {
        let handler = StockAlertHandler::new();
        handler.handle(&event(EventKind::StockLow, 3)).await.unwrap();
        handler.handle(&event(EventKind::StockExhausted, 0)).await.unwrap();

        let warnings = handler.alerts_with(AlertSeverity::Warning).await;
        let critical = handler.alerts_with(AlertSeverity::Critical).await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].stock, 3);
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].stock, 0);
        assert_eq!(handler.alerts().await.len(), 2);
    }

    #[tokio::test]
    async fn keeps_only_the_latest_alerts() {
        let handler = StockAlertHandler::with_capacity(2);
        for stock in [3, 2, 1] {
            handler.handle(&event(EventKind::StockLow, stock)).await.unwrap();
        }

        let stocks: Vec<_> = handler.alerts().await.iter().map(|a| a.stock).collect();
        assert_eq!(stocks, vec![2, 1]);
    }
}
