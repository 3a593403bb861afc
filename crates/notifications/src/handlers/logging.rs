//! Structured log line per event.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::Result;
use crate::event::{EventEnvelope, EventKind};
use crate::handler::{EventHandler, ExecutionMode};

/// Inline handler that logs every event before anything else runs.
#[derive(Debug, Default)]
pub struct LoggingHandler {
    logged: AtomicU64,
}

impl LoggingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events logged so far.
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventHandler for LoggingHandler {
    fn name(&self) -> &str {
        "LoggingHandler"
    }

    fn is_interested_in(&self, _kind: EventKind) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        0
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Inline
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let subject = event.subject();
        if event.kind() == EventKind::OperationFailed {
            tracing::warn!(
                event_id = %event.event_id(),
                kind = %event.kind(),
                product_id = %subject.id,
                sku = %subject.sku,
                actor = %event.actor(),
                description = event.description().unwrap_or_default(),
                "catalog event"
            );
        } else {
            tracing::info!(
                event_id = %event.event_id(),
                kind = %event.kind(),
                product_id = %subject.id,
                sku = %subject.sku,
                actor = %event.actor(),
                description = event.description().unwrap_or_default(),
                "catalog event"
            );
        }
        self.logged.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
