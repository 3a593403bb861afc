//! Delivers envelopes to the handlers interested in them.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::DispatcherConfig;
use crate::event::{EventEnvelope, EventEnvelopeBuilder, EventKind};
use crate::handler::{EventHandler, ExecutionMode};
use crate::registry::{HandlerRegistry, Registration};

/// Handler counts derived from the current registry contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub total: usize,
    pub inline: usize,
    pub deferred: usize,
}

/// Running totals of what the dispatcher has done since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchCounts {
    /// Envelopes passed to `notify`.
    pub dispatched: u64,
    /// Handler invocations that completed successfully.
    pub delivered: u64,
    /// Handler invocations or interest checks that failed or panicked.
    pub failed: u64,
    /// Deferred deliveries dropped because the in-flight limit was reached.
    pub dropped: u64,
    /// Envelopes rejected before dispatch because they were malformed.
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
enum Failure {
    Error(String),
    Panic(String),
}

impl Failure {
    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Failure::Panic(message)
    }

    fn label(&self) -> &'static str {
        match self {
            Failure::Error(_) => "error",
            Failure::Panic(_) => "panic",
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Error(msg) => write!(f, "{msg}"),
            Failure::Panic(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// Result of running one handler for one envelope.
#[derive(Debug)]
struct DispatchOutcome {
    handler: String,
    mode: ExecutionMode,
    elapsed: Duration,
    result: Result<(), Failure>,
}

impl DispatchOutcome {
    fn record(&self, counters: &Counters) {
        metrics::histogram!(
            "notifications_handler_duration_seconds",
            "handler" => self.handler.clone(),
            "mode" => self.mode.as_str()
        )
        .record(self.elapsed.as_secs_f64());

        match &self.result {
            Ok(()) => {
                Counters::bump(&counters.delivered);
                tracing::debug!(
                    handler = %self.handler,
                    mode = %self.mode,
                    elapsed = ?self.elapsed,
                    "event delivered"
                );
            }
            Err(failure) => {
                Counters::bump(&counters.failed);
                metrics::counter!(
                    "notifications_handler_failures_total",
                    "handler" => self.handler.clone(),
                    "mode" => self.mode.as_str(),
                    "cause" => failure.label()
                )
                .increment(1);
                tracing::error!(
                    handler = %self.handler,
                    mode = %self.mode,
                    elapsed = ?self.elapsed,
                    error = %failure,
                    "event handler failed"
                );
            }
        }
    }
}

/// Runs one handler, converting errors and panics into a [`DispatchOutcome`].
async fn deliver(registration: &Registration, envelope: &EventEnvelope) -> DispatchOutcome {
    let started = Instant::now();
    let handler = registration.handler();

    let result = match AssertUnwindSafe(async { handler.handle(envelope).await })
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(Failure::Error(error.to_string())),
        Err(panic) => Err(Failure::from_panic(&*panic)),
    };

    DispatchOutcome {
        handler: registration.name().to_string(),
        mode: registration.mode(),
        elapsed: started.elapsed(),
        result,
    }
}

/// In-process publish/subscribe dispatcher.
///
/// For each envelope the dispatcher:
/// - takes a snapshot of the registry (later registrations do not affect it)
/// - keeps the handlers interested in the envelope's kind
/// - runs the inline ones one after another, in priority order, on the
///   calling task
/// - spawns one task per deferred handler and returns without waiting
///
/// Handler failures are logged and counted, never returned. Deferred tasks are
/// capped by [`DispatcherConfig::max_in_flight_deferred`]; deliveries above the
/// cap are dropped.
pub struct Dispatcher {
    registry: HandlerRegistry,
    config: DispatcherConfig,
    deferred_permits: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            registry: HandlerRegistry::new(),
            deferred_permits: Arc::new(Semaphore::new(config.max_in_flight_deferred)),
            counters: Arc::new(Counters::default()),
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Registers a handler. Returns false if this instance is already registered.
    pub fn register(&self, handler: Arc<dyn EventHandler>) -> bool {
        self.registry.register(handler)
    }

    pub fn unregister(&self, handler: &Arc<dyn EventHandler>) -> bool {
        self.registry.unregister(handler)
    }

    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Returns handler counts for the current registry contents.
    pub fn stats(&self) -> DispatcherStats {
        let snapshot = self.registry.snapshot();
        let inline = snapshot
            .iter()
            .filter(|r| r.mode() == ExecutionMode::Inline)
            .count();

        DispatcherStats {
            total: snapshot.len(),
            inline,
            deferred: snapshot.len() - inline,
        }
    }

    pub fn counters(&self) -> DispatchCounts {
        self.counters.snapshot()
    }

    /// Builds an envelope and dispatches it. Malformed envelopes are logged and
    /// dropped.
    pub async fn publish(&self, builder: EventEnvelopeBuilder) {
        match builder.try_build() {
            Ok(envelope) => self.notify(envelope).await,
            Err(error) => {
                Counters::bump(&self.counters.rejected);
                metrics::counter!("notifications_rejected_total").increment(1);
                tracing::warn!(%error, "rejected malformed event envelope");
            }
        }
    }

    /// Delivers an envelope to every interested handler.
    ///
    /// Returns once the inline handlers have finished and the deferred ones
    /// have been spawned.
    #[tracing::instrument(
        skip(self, envelope),
        fields(event_id = %envelope.event_id(), kind = %envelope.kind())
    )]
    pub async fn notify(&self, envelope: EventEnvelope) {
        let kind = envelope.kind();
        Counters::bump(&self.counters.dispatched);
        metrics::counter!("notifications_dispatched_total", "kind" => kind.as_str()).increment(1);

        let envelope = Arc::new(envelope);
        let snapshot = self.registry.snapshot();

        let (inline, deferred): (Vec<&Registration>, Vec<&Registration>) = snapshot
            .iter()
            .filter(|r| self.is_interested(r, kind))
            .partition(|r| r.mode() == ExecutionMode::Inline);

        tracing::debug!(
            inline = inline.len(),
            deferred = deferred.len(),
            "dispatching event"
        );

        for registration in inline {
            deliver(registration, &envelope)
                .await
                .record(&self.counters);
        }

        for registration in deferred {
            self.spawn_deferred(registration.clone(), Arc::clone(&envelope));
        }
    }

    /// Waits until every deferred task spawned so far has finished.
    ///
    /// Deferred deliveries attempted while draining are dropped.
    pub async fn drain(&self) {
        let all = u32::try_from(self.config.max_in_flight_deferred).unwrap_or(u32::MAX);
        if let Ok(permits) = self.deferred_permits.acquire_many(all).await {
            drop(permits);
        }
    }

    fn is_interested(&self, registration: &Registration, kind: EventKind) -> bool {
        let handler = registration.handler();
        match std::panic::catch_unwind(AssertUnwindSafe(|| handler.is_interested_in(kind))) {
            Ok(interested) => interested,
            Err(panic) => {
                let failure = Failure::from_panic(&*panic);
                Counters::bump(&self.counters.failed);
                metrics::counter!(
                    "notifications_handler_failures_total",
                    "handler" => registration.name().to_string(),
                    "mode" => registration.mode().as_str(),
                    "cause" => "interest"
                )
                .increment(1);
                tracing::error!(
                    handler = %registration.name(),
                    error = %failure,
                    "interest check failed; skipping handler"
                );
                false
            }
        }
    }

    fn spawn_deferred(&self, registration: Registration, envelope: Arc<EventEnvelope>) {
        let permit = match Arc::clone(&self.deferred_permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                Counters::bump(&self.counters.dropped);
                metrics::counter!(
                    "notifications_deferred_dropped_total",
                    "handler" => registration.name().to_string()
                )
                .increment(1);
                tracing::warn!(
                    handler = %registration.name(),
                    limit = self.config.max_in_flight_deferred,
                    "deferred handler limit reached; dropping delivery"
                );
                return;
            }
        };

        let counters = Arc::clone(&self.counters);
        tokio::spawn(
            async move {
                deliver(&registration, &envelope).await.record(&counters);
                drop(permit);
            }
            .instrument(tracing::Span::current()),
        );
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
