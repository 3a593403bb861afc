//! Event envelope and the kinds of occurrences it describes.

use chrono::{DateTime, Utc};
use common::{Actor, Money, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EnvelopeError;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a domain occurrence. Handlers filter on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    EntityCreated,
    EntityUpdated,
    EntityDeleted,
    StockChanged,
    StockLow,
    StockExhausted,
    PriceChanged,
    DiscountApplied,
    OperationFailed,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 9] = [
        EventKind::EntityCreated,
        EventKind::EntityUpdated,
        EventKind::EntityDeleted,
        EventKind::StockChanged,
        EventKind::StockLow,
        EventKind::StockExhausted,
        EventKind::PriceChanged,
        EventKind::DiscountApplied,
        EventKind::OperationFailed,
    ];

    /// Stable dotted name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::EntityCreated => "entity.created",
            EventKind::EntityUpdated => "entity.updated",
            EventKind::EntityDeleted => "entity.deleted",
            EventKind::StockChanged => "stock.changed",
            EventKind::StockLow => "stock.low",
            EventKind::StockExhausted => "stock.exhausted",
            EventKind::PriceChanged => "price.changed",
            EventKind::DiscountApplied => "discount.applied",
            EventKind::OperationFailed => "operation.failed",
        }
    }

    /// Returns true for the kinds that describe stock movements.
    pub fn is_stock(&self) -> bool {
        matches!(
            self,
            EventKind::StockChanged | EventKind::StockLow | EventKind::StockExhausted
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a product captured at the moment an event was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub price: Money,
    pub stock: u32,
}

/// An immutable record of one domain occurrence.
///
/// Envelopes are only created through [`EventEnvelope::builder`]. The
/// dispatcher shares a single envelope between every handler of a dispatch,
/// so there are no mutable accessors.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    event_id: EventId,
    kind: EventKind,
    timestamp: DateTime<Utc>,
    subject: ProductSnapshot,
    actor: Actor,
    description: Option<String>,
    extra: Option<serde_json::Value>,
}

impl EventEnvelope {
    /// Creates a new event envelope builder.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn subject(&self) -> &ProductSnapshot {
        &self.subject
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Kind-specific payload, e.g. the previous price of a price change.
    pub fn extra(&self) -> Option<&serde_json::Value> {
        self.extra.as_ref()
    }

    /// Looks up a single field of the extra payload.
    pub fn extra_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.as_ref().and_then(|extra| extra.get(key))
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    event_id: Option<EventId>,
    kind: Option<EventKind>,
    timestamp: Option<DateTime<Utc>>,
    subject: Option<ProductSnapshot>,
    actor: Option<Actor>,
    description: Option<String>,
    extra: Option<serde_json::Value>,
}

impl EventEnvelopeBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn subject(mut self, subject: ProductSnapshot) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the acting user. Missing or blank ids resolve to the system actor.
    pub fn actor(mut self, actor: Option<&str>) -> Self {
        self.actor = Some(Actor::from_optional(actor));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Builds the envelope, failing if the kind or subject is missing.
    pub fn try_build(self) -> Result<EventEnvelope, EnvelopeError> {
        Ok(EventEnvelope {
            event_id: self.event_id.unwrap_or_default(),
            kind: self.kind.ok_or(EnvelopeError::MissingKind)?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            subject: self.subject.ok_or(EnvelopeError::MissingSubject)?,
            actor: self.actor.unwrap_or_default(),
            description: self.description,
            extra: self.extra,
        })
    }
}
