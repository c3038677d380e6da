//! Read-only reporting folds for the admin dashboard.
//!
//! Pure functions over a fetched window of order and order-item rows; no
//! retries and no partial-failure handling — if the fetch fails the caller
//! renders nothing and logs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::aggregates::order::OrderStatus;

/// Order row slice consumed by the folds.
#[derive(Clone, Debug)]
pub struct OrderSummary {
    pub total: i64,
    pub status: OrderStatus,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub created_at: DateTime<Utc>,
}

/// Order-item row slice for product rankings.
#[derive(Clone, Debug)]
pub struct ItemSale {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub revenue: i64,
    pub orders: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductSales {
    pub product_id: Uuid,
    pub product_name: String,
    pub units: u32,
    pub revenue: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct WilayaBucket {
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub orders: u32,
    pub revenue: i64,
}

/// Buckets revenue and order counts by calendar day (UTC date of creation),
/// ascending. Days without orders are simply absent; callers fill gaps if
/// their rendering needs them.
pub fn revenue_by_day(orders: &[OrderSummary]) -> Vec<DayBucket> {
    let mut days: BTreeMap<NaiveDate, (i64, u32)> = BTreeMap::new();
    for order in orders {
        let entry = days.entry(order.created_at.date_naive()).or_default();
        entry.0 += order.total;
        entry.1 += 1;
    }
    days.into_iter()
        .map(|(date, (revenue, orders))| DayBucket {
            date,
            revenue,
            orders,
        })
        .collect()
}

/// Percent change versus the preceding window; 0 when the previous window
/// was empty.
pub fn percent_change(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (current - previous) as f64 / previous as f64 * 100.0
}

/// Ranks products by summed revenue, descending, truncated to `limit`.
pub fn top_products(sales: &[ItemSale], limit: usize) -> Vec<ProductSales> {
    let mut by_product: BTreeMap<Uuid, ProductSales> = BTreeMap::new();
    for sale in sales {
        let entry = by_product
            .entry(sale.product_id)
            .or_insert_with(|| ProductSales {
                product_id: sale.product_id,
                product_name: sale.product_name.clone(),
                units: 0,
                revenue: 0,
            });
        entry.units += sale.quantity;
        entry.revenue += sale.unit_price * i64::from(sale.quantity);
    }
    let mut ranked: Vec<ProductSales> = by_product.into_values().collect();
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    ranked.truncate(limit);
    ranked
}

pub fn orders_by_status(orders: &[OrderSummary]) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&'static str, (OrderStatus, u32)> = BTreeMap::new();
    for order in orders {
        counts
            .entry(order.status.as_str())
            .or_insert((order.status, 0))
            .1 += 1;
    }
    counts
        .into_values()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

/// Order counts and revenue per wilaya, busiest first.
pub fn orders_by_wilaya(orders: &[OrderSummary]) -> Vec<WilayaBucket> {
    let mut buckets: BTreeMap<String, WilayaBucket> = BTreeMap::new();
    for order in orders {
        let entry = buckets
            .entry(order.wilaya_code.clone())
            .or_insert_with(|| WilayaBucket {
                wilaya_code: order.wilaya_code.clone(),
                wilaya_name: order.wilaya_name.clone(),
                orders: 0,
                revenue: 0,
            });
        entry.orders += 1;
        entry.revenue += order.total;
    }
    let mut ranked: Vec<WilayaBucket> = buckets.into_values().collect();
    ranked.sort_by(|a, b| b.orders.cmp(&a.orders));
    ranked
}
