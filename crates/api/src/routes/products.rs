//! Product CRUD, stock and pricing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use catalog::{NewProduct, Product, ProductUpdate};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the id of the user performing the request.
pub const USER_HEADER: &str = "x-user-id";

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: u32,
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Deserialize)]
pub struct ChangePriceRequest {
    pub price_cents: i64,
}

#[derive(Deserialize)]
pub struct ApplyDiscountRequest {
    pub percent: u8,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub stock: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id().to_string(),
            sku: product.sku().to_string(),
            name: product.name().to_string(),
            category: product.category().map(String::from),
            price_cents: product.price().cents(),
            stock: product.stock(),
            created_at: product.created_at().to_rfc3339(),
            updated_at: product.updated_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /products — create a product.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let mut new = NewProduct::new(req.sku, req.name, Money::from_cents(req.price_cents))
        .with_stock(req.stock);
    if let Some(category) = req.category {
        new = new.with_category(category);
    }

    let product = state.catalog.create_product(new, actor(&headers)).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// GET /products — list products ordered by SKU.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// GET /products/:id — load one product.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.get_product(parse_product_id(&id)?).await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// PUT /products/:id — change name and/or category.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    let update = ProductUpdate {
        name: req.name,
        category: req.category,
    };

    let product = state
        .catalog
        .update_product(id, update, actor(&headers))
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// DELETE /products/:id — remove a product.
#[tracing::instrument(skip(state, headers))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let id = parse_product_id(&id)?;
    state.catalog.delete_product(id, actor(&headers)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/:id/stock — add (or with a negative delta, remove) stock.
#[tracing::instrument(skip(state, headers, req))]
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AdjustStockRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state
        .catalog
        .adjust_stock(id, req.delta, actor(&headers))
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// POST /products/:id/price — set a new price.
#[tracing::instrument(skip(state, headers, req))]
pub async fn change_price(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ChangePriceRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state
        .catalog
        .change_price(id, Money::from_cents(req.price_cents), actor(&headers))
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// POST /products/:id/discount — reduce the price by a percentage.
#[tracing::instrument(skip(state, headers, req))]
pub async fn apply_discount(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ApplyDiscountRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state
        .catalog
        .apply_discount(id, req.percent, actor(&headers))
        .await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// Reads the acting user from the request. Missing or non-UTF-8 values fall
/// back to the system actor downstream.
fn actor(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_HEADER).and_then(|v| v.to_str().ok())
}

pub(crate) fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(ProductId::from(uuid))
}
