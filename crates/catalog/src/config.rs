//! Catalog configuration loaded from environment variables.

/// Reads from environment variables:
/// - `CATALOG_LOW_STOCK_THRESHOLD` — stock level at or below which a decrease
///   raises a low-stock event (default: `5`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub low_stock_threshold: u32,
}

impl CatalogConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            low_stock_threshold: std::env::var("CATALOG_LOW_STOCK_THRESHOLD")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.low_stock_threshold),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
        }
    }
}
