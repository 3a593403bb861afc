//! Reference handlers wired in by the application.

pub mod audit;
pub mod cache;
pub mod logging;
pub mod stock_alert;

pub use audit::{AuditEntry, AuditTrailHandler};
pub use cache::CacheRefreshHandler;
pub use logging::LoggingHandler;
pub use stock_alert::{AlertSeverity, StockAlert, StockAlertHandler};

/// Entries kept by the audit trail and the alert list unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;
