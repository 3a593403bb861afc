pub mod health;
pub mod metrics;
pub mod notifications;
pub mod products;
