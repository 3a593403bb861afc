//! Catalog service: product mutations followed by event publication.

use std::sync::Arc;

use common::{Money, ProductId};
use notifications::Dispatcher;
use tokio::sync::Mutex;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::product::{NewProduct, Product, ProductUpdate};
use crate::repository::ProductRepository;

fn record_operation(operation: &'static str) {
    metrics::counter!("catalog_operations_total", "operation" => operation).increment(1);
}

/// Service for managing catalog products.
///
/// Every mutation is stored first and published second, so handlers only
/// ever see committed state and cannot fail the operation. Read-modify-write
/// sequences are serialized; publication happens after the write lock is
/// released.
pub struct CatalogService<R: ProductRepository> {
    repository: R,
    dispatcher: Arc<Dispatcher>,
    config: CatalogConfig,
    writes: Mutex<()>,
}

impl<R: ProductRepository> CatalogService<R> {
    pub fn new(repository: R, dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_config(repository, dispatcher, CatalogConfig::default())
    }

    pub fn with_config(repository: R, dispatcher: Arc<Dispatcher>, config: CatalogConfig) -> Self {
        Self {
            repository,
            dispatcher,
            config,
            writes: Mutex::new(()),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, new: NewProduct, actor: Option<&str>) -> Result<Product> {
        let product = Product::create(new)?;
        {
            let _guard = self.writes.lock().await;
            self.repository.insert(product.clone()).await?;
        }
        record_operation("create");
        tracing::info!(product_id = %product.id(), sku = product.sku(), "product created");

        self.dispatcher
            .entity_created(product.snapshot(), actor)
            .await;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
        actor: Option<&str>,
    ) -> Result<Product> {
        if update.is_empty() {
            return Err(CatalogError::EmptyUpdate);
        }
        let (product, ()) = self.modify(id, |p| p.update(update)).await?;
        record_operation("update");

        self.dispatcher
            .entity_updated(product.snapshot(), actor)
            .await;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId, actor: Option<&str>) -> Result<Product> {
        let product = {
            let _guard = self.writes.lock().await;
            self.repository.remove(id).await?
        };
        record_operation("delete");
        tracing::info!(product_id = %id, sku = product.sku(), "product deleted");

        self.dispatcher
            .entity_deleted(product.snapshot(), actor)
            .await;
        Ok(product)
    }

    /// Adds `delta` units (negative to remove) to a product's stock.
    ///
    /// A decrease that leaves the level at zero also publishes
    /// `StockExhausted`; one that leaves it at or below the low-stock
    /// threshold publishes `StockLow`. An adjustment that would go below zero
    /// is rejected and published as `OperationFailed`.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        id: ProductId,
        delta: i64,
        actor: Option<&str>,
    ) -> Result<Product> {
        let (product, previous) = match self.modify(id, |p| p.adjust_stock(delta)).await {
            Ok(result) => result,
            Err(error @ CatalogError::InsufficientStock { .. }) => {
                tracing::warn!(product_id = %id, %error, "stock adjustment rejected");
                if let Some(product) = self.repository.get(id).await? {
                    self.dispatcher
                        .operation_failed(
                            product.snapshot(),
                            actor,
                            "adjust_stock",
                            &error.to_string(),
                        )
                        .await;
                }
                return Err(error);
            }
            Err(error) => return Err(error),
        };
        record_operation("adjust_stock");

        let snapshot = product.snapshot();
        self.dispatcher
            .stock_changed(snapshot.clone(), actor, previous)
            .await;

        let stock = product.stock();
        if stock < previous {
            if stock == 0 {
                self.dispatcher.stock_exhausted(snapshot, actor).await;
            } else if stock <= self.config.low_stock_threshold {
                self.dispatcher
                    .stock_low(snapshot, actor, self.config.low_stock_threshold)
                    .await;
            }
        }
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_price(
        &self,
        id: ProductId,
        price: Money,
        actor: Option<&str>,
    ) -> Result<Product> {
        let (product, previous) = self.modify(id, |p| p.set_price(price)).await?;
        record_operation("change_price");

        self.dispatcher
            .price_changed(product.snapshot(), actor, previous)
            .await;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn apply_discount(
        &self,
        id: ProductId,
        percent: u8,
        actor: Option<&str>,
    ) -> Result<Product> {
        let (product, previous) = self.modify(id, |p| p.apply_discount(percent)).await?;
        record_operation("apply_discount");

        self.dispatcher
            .discount_applied(product.snapshot(), actor, percent, previous)
            .await;
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.repository
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.repository.list().await
    }

    /// Loads, changes and stores a product under the write lock.
    async fn modify<T, F>(&self, id: ProductId, change: F) -> Result<(Product, T)>
    where
        F: FnOnce(&mut Product) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.writes.lock().await;
        let mut product = self
            .repository
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        let outcome = change(&mut product)?;
        self.repository.save(product.clone()).await?;
        Ok((product, outcome))
    }
}
