//! Storefront catalog reads.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{ApiError, AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::product::{Category, Product};

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>, ApiError> {
    let page = params.page();
    let (products, total) = state
        .backend
        .list_published_products(page, params.per_page())
        .await?;
    Ok(Json(PaginatedResponse {
        data: products,
        total,
        page,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .backend
        .find_product_by_slug(&slug)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| ApiError::not_found("Product not found."))?;
    Ok(Json(product))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.backend.list_categories().await?;
    Ok(Json(categories))
}
