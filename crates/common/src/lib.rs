//! Shared value types for the product catalog workspace.

mod types;

pub use types::{Actor, Money, ProductId};
