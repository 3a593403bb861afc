//! Product entity and its validation rules.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use notifications::ProductSnapshot;

use crate::error::{CatalogError, Result};

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub price: Money,
    pub stock: u32,
}

impl NewProduct {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: None,
            price,
            stock: 0,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }
}

/// Partial update of descriptive fields. `None` leaves a field unchanged.
///
/// Price and stock have dedicated operations so that they publish their own
/// events.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.category.is_none()
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    category: Option<String>,
    price: Money,
    stock: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Validates the input and creates a product with a fresh id.
    pub fn create(new: NewProduct) -> Result<Self> {
        let sku = new.sku.trim().to_string();
        if sku.is_empty() {
            return Err(CatalogError::InvalidSku);
        }
        let name = validate_name(&new.name)?;
        validate_price(new.price)?;

        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(),
            sku,
            name,
            category: normalize_category(new.category),
            price: new.price,
            stock: new.stock,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a descriptive update.
    pub fn update(&mut self, update: ProductUpdate) -> Result<()> {
        let name = update.name.as_deref().map(validate_name).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if update.category.is_some() {
            self.category = normalize_category(update.category);
        }
        self.touch();
        Ok(())
    }

    /// Adds `delta` (which may be negative) to the stock level.
    ///
    /// Returns the previous level.
    pub fn adjust_stock(&mut self, delta: i64) -> Result<u32> {
        let previous = self.stock;
        let next = i64::from(previous)
            .checked_add(delta)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(CatalogError::InsufficientStock {
                available: previous,
                delta,
            })?;

        self.stock = next;
        self.touch();
        Ok(previous)
    }

    /// Sets a new price. Returns the previous price.
    pub fn set_price(&mut self, price: Money) -> Result<Money> {
        validate_price(price)?;
        let previous = self.price;
        self.price = price;
        self.touch();
        Ok(previous)
    }

    /// Reduces the price by `percent`. Returns the previous price.
    pub fn apply_discount(&mut self, percent: u8) -> Result<Money> {
        if !(1..=99).contains(&percent) {
            return Err(CatalogError::InvalidDiscount { percent });
        }
        let discounted = self.price.discounted(percent);
        // a price of a few cents can round down to nothing
        validate_price(discounted)?;
        self.set_price(discounted)
    }

    /// Captures the current state for an event.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            price: self.price,
            stock: self.stock,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidName);
    }
    Ok(name.to_string())
}

fn validate_price(price: Money) -> Result<()> {
    if !price.is_positive() {
        return Err(CatalogError::InvalidPrice {
            price: price.cents(),
        });
    }
    Ok(())
}

fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product::create(
            NewProduct::new("SKU-001", "Widget", Money::from_cents(1000))
                .with_category("tools")
                .with_stock(10),
        )
        .unwrap()
    }

    #[test]
    fn create_trims_and_validates() {
        let product = Product::create(
            NewProduct::new("  SKU-2 ", "  Bolt  ", Money::from_cents(25)).with_category("   "),
        )
        .unwrap();
        assert_eq!(product.sku(), "SKU-2");
        assert_eq!(product.name(), "Bolt");
        assert_eq!(product.category(), None);
        assert_eq!(product.stock(), 0);
    }

    #[test]
    fn create_rejects_invalid_input() {
        let err = Product::create(NewProduct::new("", "x", Money::from_cents(1))).unwrap_err();
        assert_eq!(err, CatalogError::InvalidSku);

        let err = Product::create(NewProduct::new("S", " ", Money::from_cents(1))).unwrap_err();
        assert_eq!(err, CatalogError::InvalidName);

        let err = Product::create(NewProduct::new("S", "x", Money::zero())).unwrap_err();
        assert_eq!(err, CatalogError::InvalidPrice { price: 0 });
    }

    #[test]
    fn adjust_stock_returns_previous_level() {
        let mut product = widget();
        assert_eq!(product.adjust_stock(-4).unwrap(), 10);
        assert_eq!(product.stock(), 6);
        assert_eq!(product.adjust_stock(5).unwrap(), 6);
        assert_eq!(product.stock(), 11);
    }

    #[test]
    fn adjust_stock_cannot_go_negative() {
        let mut product = widget();
        let err = product.adjust_stock(-11).unwrap_err();
        assert_eq!(
            err,
            CatalogError::InsufficientStock {
                available: 10,
                delta: -11
            }
        );
        assert_eq!(product.stock(), 10);
    }

    #[test]
    fn discount_reduces_price() {
        let mut product = widget();
        let previous = product.apply_discount(25).unwrap();
        assert_eq!(previous.cents(), 1000);
        assert_eq!(product.price().cents(), 750);
    }

    #[test]
    fn discount_bounds() {
        let mut product = widget();
        assert_eq!(
            product.apply_discount(0).unwrap_err(),
            CatalogError::InvalidDiscount { percent: 0 }
        );
        assert_eq!(
            product.apply_discount(100).unwrap_err(),
            CatalogError::InvalidDiscount { percent: 100 }
        );
        assert_eq!(product.price().cents(), 1000);
    }

    #[test]
    fn update_keeps_unset_fields() {
        let mut product = widget();
        product
            .update(ProductUpdate {
                name: Some("Widget Pro".to_string()),
                category: None,
            })
            .unwrap();
        assert_eq!(product.name(), "Widget Pro");
        assert_eq!(product.category(), Some("tools"));
        assert!(product.updated_at() >= product.created_at());
    }

    #[test]
    fn snapshot_copies_state() {
        let product = widget();
        let snapshot = product.snapshot();
        assert_eq!(snapshot.id, product.id());
        assert_eq!(snapshot.sku, "SKU-001");
        assert_eq!(snapshot.stock, 10);
        assert_eq!(snapshot.price, Money::from_cents(1000));
    }
}
