//! Product catalog operations.
//!
//! [`CatalogService`] validates and stores each change, then publishes the
//! matching domain event through a shared [`notifications::Dispatcher`].

pub mod config;
pub mod error;
pub mod product;
pub mod repository;
pub mod service;

pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use product::{NewProduct, Product, ProductUpdate};
pub use repository::{InMemoryProductRepository, ProductRepository};
pub use service::CatalogService;
