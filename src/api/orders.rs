//! Order lookup (public confirmation view) and admin order management.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{publish_events, require_admin, ApiError, AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::order::{Order, OrderItem, OrderStatus, StatusHistoryEntry};

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub address: String,
    pub delivery_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub subtotal: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub status: OrderStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDto {
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id(),
            order_number: order.order_number().as_str().to_owned(),
            customer_name: order.customer().name.clone(),
            customer_phone: order.customer().phone.clone(),
            wilaya_code: order.customer().wilaya_code.clone(),
            wilaya_name: order.customer().wilaya_name.clone(),
            address: order.customer().address.clone(),
            delivery_method: order.customer().delivery_method.as_str().to_owned(),
            note: order.customer().note.clone(),
            subtotal: order.subtotal(),
            shipping: order.shipping(),
            discount: order.discount(),
            total: order.total(),
            coupon_code: order.coupon_code().map(|c| c.as_str().to_owned()),
            status: order.status(),
            status_history: order.status_history().to_vec(),
            items: order.items().to_vec(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// Confirmation view keyed by the order number handed out at checkout.
pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderDto>, ApiError> {
    let order = state
        .backend
        .find_order_by_number(&order_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found."))?;
    Ok(Json(OrderDto::from_order(&order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderDto>>, ApiError> {
    require_admin(&state, &headers).await?;
    let page = params.page();
    let (orders, total) = state.backend.list_orders(page, params.per_page()).await?;
    Ok(Json(PaginatedResponse {
        data: orders.iter().map(OrderDto::from_order).collect(),
        total,
        page,
    }))
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDto>, ApiError> {
    require_admin(&state, &headers).await?;
    let order = state
        .backend
        .find_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found."))?;
    Ok(Json(OrderDto::from_order(&order)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<OrderDto>, ApiError> {
    require_admin(&state, &headers).await?;
    let mut order = state
        .backend
        .find_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found."))?;

    order
        .transition(request.status, request.note, Utc::now())
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    state.backend.persist_order_status(&order).await?;

    let events = order.take_events();
    publish_events(&state, &events).await;

    Ok(Json(OrderDto::from_order(&order)))
}
