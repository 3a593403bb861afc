//! Domain-event notification engine for the product catalog.
//!
//! This crate decouples state-changing catalog operations from the reactions
//! to them:
//! - [`EventEnvelope`] describes one occurrence and is immutable once built
//! - [`EventHandler`] is the contract reactive components implement
//! - [`HandlerRegistry`] keeps handlers ordered by priority
//! - [`Dispatcher`] routes each envelope to interested handlers, inline or
//!   deferred, and contains their failures
//! - [`handlers`] holds the reference handlers the application wires in

pub mod config;
pub mod dispatcher;
mod emitters;
pub mod error;
pub mod event;
pub mod handler;
pub mod handlers;
pub mod registry;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatchCounts, Dispatcher, DispatcherStats};
pub use error::{EnvelopeError, HandlerError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, EventKind, ProductSnapshot};
pub use handler::{DEFAULT_PRIORITY, EventHandler, ExecutionMode};
pub use registry::{HandlerRegistry, Registration, Snapshot};
