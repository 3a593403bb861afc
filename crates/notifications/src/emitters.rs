//! Shorthand for publishing the common event kinds.

use common::Money;
use serde_json::json;

use crate::dispatcher::Dispatcher;
use crate::event::{EventEnvelope, EventEnvelopeBuilder, EventKind, ProductSnapshot};

fn envelope(kind: EventKind, subject: ProductSnapshot, actor: Option<&str>) -> EventEnvelopeBuilder {
    EventEnvelope::builder()
        .kind(kind)
        .subject(subject)
        .actor(actor)
}

impl Dispatcher {
    pub async fn entity_created(&self, subject: ProductSnapshot, actor: Option<&str>) {
        let description = format!("Product {} created", subject.sku);
        self.publish(envelope(EventKind::EntityCreated, subject, actor).description(description))
            .await;
    }

    pub async fn entity_updated(&self, subject: ProductSnapshot, actor: Option<&str>) {
        let description = format!("Product {} updated", subject.sku);
        self.publish(envelope(EventKind::EntityUpdated, subject, actor).description(description))
            .await;
    }

    pub async fn entity_deleted(&self, subject: ProductSnapshot, actor: Option<&str>) {
        let description = format!("Product {} deleted", subject.sku);
        self.publish(envelope(EventKind::EntityDeleted, subject, actor).description(description))
            .await;
    }

    /// Publishes a stock movement; `previous_stock` is the level before the change.
    pub async fn stock_changed(
        &self,
        subject: ProductSnapshot,
        actor: Option<&str>,
        previous_stock: u32,
    ) {
        let delta = i64::from(subject.stock) - i64::from(previous_stock);
        let description = format!(
            "Stock of {} changed from {} to {}",
            subject.sku, previous_stock, subject.stock
        );
        self.publish(
            envelope(EventKind::StockChanged, subject, actor)
                .description(description)
                .extra(json!({ "previous_stock": previous_stock, "delta": delta })),
        )
        .await;
    }

    pub async fn stock_low(&self, subject: ProductSnapshot, actor: Option<&str>, threshold: u32) {
        let description = format!(
            "Stock of {} is low: {} left (threshold {})",
            subject.sku, subject.stock, threshold
        );
        self.publish(
            envelope(EventKind::StockLow, subject, actor)
                .description(description)
                .extra(json!({ "threshold": threshold })),
        )
        .await;
    }

    pub async fn stock_exhausted(&self, subject: ProductSnapshot, actor: Option<&str>) {
        let description = format!("Product {} is out of stock", subject.sku);
        self.publish(envelope(EventKind::StockExhausted, subject, actor).description(description))
            .await;
    }

    pub async fn price_changed(
        &self,
        subject: ProductSnapshot,
        actor: Option<&str>,
        previous_price: Money,
    ) {
        let description = format!(
            "Price of {} changed from {} to {}",
            subject.sku, previous_price, subject.price
        );
        self.publish(
            envelope(EventKind::PriceChanged, subject, actor)
                .description(description)
                .extra(json!({ "previous_price_cents": previous_price.cents() })),
        )
        .await;
    }

    pub async fn discount_applied(
        &self,
        subject: ProductSnapshot,
        actor: Option<&str>,
        percent: u8,
        previous_price: Money,
    ) {
        let description = format!(
            "{}% discount applied to {}: {} -> {}",
            percent, subject.sku, previous_price, subject.price
        );
        self.publish(
            envelope(EventKind::DiscountApplied, subject, actor)
                .description(description)
                .extra(json!({
                    "percent": percent,
                    "previous_price_cents": previous_price.cents(),
                })),
        )
        .await;
    }

    /// Publishes a failed operation against `subject`, which is left unchanged.
    pub async fn operation_failed(
        &self,
        subject: ProductSnapshot,
        actor: Option<&str>,
        operation: &str,
        reason: &str,
    ) {
        let description = format!("{operation} failed for {}: {reason}", subject.sku);
        self.publish(
            envelope(EventKind::OperationFailed, subject, actor)
                .description(description)
                .extra(json!({ "operation": operation, "reason": reason })),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::handler::EventHandler;
    use async_trait::async_trait;
    use common::ProductId;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<EventEnvelope>>,
    }

    #[async_trait]
    impl EventHandler for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        fn is_interested_in(&self, _kind: EventKind) -> bool {
            true
        }

        async fn handle(&self, event: &EventEnvelope) -> Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn subject(stock: u32, price: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(),
            sku: "SKU-9".to_string(),
            name: "Gadget".to_string(),
            category: None,
            price: Money::from_cents(price),
            stock,
        }
    }

    fn setup() -> (Dispatcher, Arc<Capture>) {
        let dispatcher = Dispatcher::new();
        let capture = Arc::new(Capture::default());
        dispatcher.register(capture.clone());
        (dispatcher, capture)
    }

    fn last(capture: &Capture) -> EventEnvelope {
        capture.seen.lock().unwrap().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn created_defaults_to_system_actor() {
        let (dispatcher, capture) = setup();
        dispatcher.entity_created(subject(4, 100), None).await;

        let event = last(&capture);
        assert_eq!(event.kind(), EventKind::EntityCreated);
        assert!(event.actor().is_system());
        assert_eq!(event.description(), Some("Product SKU-9 created"));
    }

    #[tokio::test]
    async fn stock_changed_carries_previous_level_and_delta() {
        let (dispatcher, capture) = setup();
        dispatcher
            .stock_changed(subject(2, 100), Some("bob"), 7)
            .await;

        let event = last(&capture);
        assert_eq!(event.kind(), EventKind::StockChanged);
        assert_eq!(event.actor().as_str(), "bob");
        assert_eq!(event.extra_field("previous_stock"), Some(&json!(7)));
        assert_eq!(event.extra_field("delta"), Some(&json!(-5)));
    }

    #[tokio::test]
    async fn price_and_discount_carry_previous_price() {
        let (dispatcher, capture) = setup();
        dispatcher
            .price_changed(subject(1, 1500), None, Money::from_cents(1200))
            .await;
        assert_eq!(
            last(&capture).extra_field("previous_price_cents"),
            Some(&json!(1200))
        );

        dispatcher
            .discount_applied(subject(1, 900), None, 10, Money::from_cents(1000))
            .await;
        let event = last(&capture);
        assert_eq!(event.kind(), EventKind::DiscountApplied);
        assert_eq!(event.extra_field("percent"), Some(&json!(10)));
        assert_eq!(event.extra_field("previous_price_cents"), Some(&json!(1000)));
    }

    #[tokio::test]
    async fn every_emitter_publishes_its_kind() {
        let (dispatcher, capture) = setup();
        let s = || subject(0, 100);

        dispatcher.entity_created(s(), None).await;
        dispatcher.entity_updated(s(), None).await;
        dispatcher.entity_deleted(s(), None).await;
        dispatcher.stock_changed(s(), None, 1).await;
        dispatcher.stock_low(s(), None, 5).await;
        dispatcher.stock_exhausted(s(), None).await;
        dispatcher.price_changed(s(), None, Money::zero()).await;
        dispatcher.discount_applied(s(), None, 5, Money::zero()).await;
        dispatcher
            .operation_failed(s(), None, "adjust_stock", "insufficient stock")
            .await;

        let kinds: Vec<_> = capture
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(EventEnvelope::kind)
            .collect();
        assert_eq!(kinds, EventKind::ALL.to_vec());
    }
}
