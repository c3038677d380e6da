//! Admin analytics summary over a trailing window.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{require_admin, ApiError, AppState};
use crate::analytics::{
    orders_by_status, orders_by_wilaya, percent_change, revenue_by_day, top_products, DayBucket,
    ProductSales, StatusCount, WilayaBucket,
};

const TOP_PRODUCTS: usize = 5;
const TOP_WILAYAS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    /// Window length in days; defaults to 30, clamped to [1, 365].
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub days: i64,
    pub total_revenue: i64,
    pub total_orders: usize,
    pub average_order_value: f64,
    /// Percent change versus the immediately preceding window of the same
    /// length; 0 when that window was empty.
    pub revenue_change: f64,
    pub orders_change: f64,
    pub revenue_by_day: Vec<DayBucket>,
    pub top_products: Vec<ProductSales>,
    pub orders_by_status: Vec<StatusCount>,
    pub orders_by_wilaya: Vec<WilayaBucket>,
}

pub async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SummaryParams>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    require_admin(&state, &headers).await?;

    let days = params.days.unwrap_or(30).clamp(1, 365);
    let end = Utc::now();
    let start = end - Duration::days(days);
    let previous_start = start - Duration::days(days);

    let orders = state.backend.orders_between(start, end).await?;
    let previous_orders = state.backend.orders_between(previous_start, start).await?;
    let sales = state.backend.item_sales_between(start, end).await?;

    let total_revenue: i64 = orders.iter().map(|o| o.total).sum();
    let previous_revenue: i64 = previous_orders.iter().map(|o| o.total).sum();
    let total_orders = orders.len();
    let average_order_value = if total_orders == 0 {
        0.0
    } else {
        total_revenue as f64 / total_orders as f64
    };

    let mut by_wilaya = orders_by_wilaya(&orders);
    by_wilaya.truncate(TOP_WILAYAS);

    Ok(Json(AnalyticsSummary {
        days,
        total_revenue,
        total_orders,
        average_order_value,
        revenue_change: percent_change(total_revenue, previous_revenue),
        orders_change: percent_change(total_orders as i64, previous_orders.len() as i64),
        revenue_by_day: revenue_by_day(&orders),
        top_products: top_products(&sales, TOP_PRODUCTS),
        orders_by_status: orders_by_status(&orders),
        orders_by_wilaya: by_wilaya,
    }))
}
