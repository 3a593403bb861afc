//! Catalog error types.

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No product with this id exists.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Another product already uses this SKU.
    #[error("SKU already in use: {0}")]
    DuplicateSku(String),

    #[error("SKU is required")]
    InvalidSku,

    #[error("Product name is required")]
    InvalidName,

    /// An update that names no field to change.
    #[error("Nothing to update: provide name or category")]
    EmptyUpdate,

    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: i64 },

    #[error("Invalid discount: {percent}% (must be between 1 and 99)")]
    InvalidDiscount { percent: u8 },

    /// A stock adjustment would take the level below zero.
    #[error("Insufficient stock: {available} available, adjustment of {delta}")]
    InsufficientStock { available: u32, delta: i64 },
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
