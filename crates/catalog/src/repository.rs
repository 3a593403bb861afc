use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use tokio::sync::RwLock;

use crate::error::{CatalogError, Result};
use crate::product::Product;

/// Storage for catalog products.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Stores a new product. Fails with `DuplicateSku` if the SKU is taken.
    async fn insert(&self, product: Product) -> Result<()>;

    /// Replaces an existing product. Fails with `NotFound` if it does not exist.
    async fn save(&self, product: Product) -> Result<()>;

    /// Removes a product and returns it.
    async fn remove(&self, id: ProductId) -> Result<Product>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>>;

    /// Returns all products ordered by SKU.
    async fn list(&self) -> Result<Vec<Product>>;
}

/// In-memory product repository.
#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored products.
    pub async fn count(&self) -> usize {
        self.products.read().await.len()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        if products.values().any(|p| p.sku() == product.sku()) {
            return Err(CatalogError::DuplicateSku(product.sku().to_string()));
        }
        products.insert(product.id(), product);
        Ok(())
    }

    async fn save(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id()) {
            Some(existing) => {
                *existing = product;
                Ok(())
            }
            None => Err(CatalogError::NotFound(product.id())),
        }
    }

    async fn remove(&self, id: ProductId) -> Result<Product> {
        self.products
            .write()
            .await
            .remove(&id)
            .ok_or(CatalogError::NotFound(id))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let mut products: Vec<_> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(products)
    }
}
