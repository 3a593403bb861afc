//! The contract every reactive component implements.

use async_trait::async_trait;

use crate::Result;
use crate::event::{EventEnvelope, EventKind};

/// Priority assigned to handlers that do not override [`EventHandler::priority`].
pub const DEFAULT_PRIORITY: i32 = 100;

/// Where a handler runs relative to the code that published the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Runs on the publishing task, before `notify` returns.
    Inline,
    /// Runs in its own task; the publisher never waits for it.
    Deferred,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Inline => "inline",
            ExecutionMode::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component that reacts to domain events.
///
/// Handlers declare which kinds they care about, where they run, and in what
/// order relative to other handlers (lower priority runs first). Priority and
/// mode are read once, when the handler is registered.
///
/// `handle` may fail or even panic; containing that is the dispatcher's job.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// Returns true if this handler wants events of the given kind.
    fn is_interested_in(&self, kind: EventKind) -> bool;

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Inline
    }

    fn is_deferred(&self) -> bool {
        self.mode() == ExecutionMode::Deferred
    }

    /// Reacts to a single event.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;
}
