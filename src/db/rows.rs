//! Row types for every table the service reads, with narrowing conversions
//! into the domain. Loosely-shaped records stop here: a row that fails
//! conversion surfaces as an `InvalidRow` error instead of leaking into
//! business logic.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::coupon::{Coupon, CouponKind};
use crate::domain::aggregates::order::{
    CustomerDetails, Order, OrderItem, OrderStatus, OrderTotals, StatusHistoryEntry,
};
use crate::domain::aggregates::product::{
    Category, Product, ProductImage, ProductOption, ProductVariant,
};
use crate::domain::value_objects::{CouponCode, OrderNumber};
use crate::error::StorefrontError;
use crate::shipping::{DeliveryMethod, ShippingRate};
use crate::upsell::{DisplayLocation, RuleKind, TriggerKind, UpsellRule};

fn invalid(table: &'static str, id: impl ToString, reason: impl ToString) -> StorefrontError {
    StorefrontError::InvalidRow {
        table,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub sku: Option<String>,
    pub stock: i32,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn into_product(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            price: self.price,
            sale_price: self.sale_price,
            sku: self.sku,
            stock: self.stock.max(0) as u32,
            is_published: self.is_published,
            category_id: self.category_id,
            images: vec![],
            options: vec![],
            variants: vec![],
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProductImageRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub host_image_id: String,
    pub position: i32,
    pub is_primary: bool,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        ProductImage {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
            host_image_id: row.host_image_id,
            position: row.position,
            is_primary: row.is_primary,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProductOptionRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub values: Vec<String>,
    pub position: i32,
}

impl From<ProductOptionRow> for ProductOption {
    fn from(row: ProductOptionRow) -> Self {
        ProductOption {
            id: row.id,
            name: row.name,
            values: row.values,
            position: row.position,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ProductVariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: Option<String>,
    pub price: Option<i64>,
    pub stock: i32,
    pub option_values: Value,
    pub is_available: bool,
}

impl ProductVariantRow {
    pub fn into_variant(self) -> crate::Result<ProductVariant> {
        let option_values: BTreeMap<String, String> =
            serde_json::from_value(self.option_values)
                .map_err(|e| invalid("product_variants", self.id, e))?;
        Ok(ProductVariant {
            id: self.id,
            sku: self.sku,
            price: self.price,
            stock: self.stock.max(0) as u32,
            option_values,
            is_available: self.is_available,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub position: i32,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            parent_id: row.parent_id,
            image_url: row.image_url,
            position: row.position,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub value: i64,
    pub min_order: Option<i64>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CouponRow {
    pub fn into_coupon(self) -> crate::Result<Coupon> {
        let code =
            CouponCode::new(self.code.as_str()).map_err(|e| invalid("coupons", self.id, e))?;
        let kind = CouponKind::parse(&self.kind).map_err(|e| invalid("coupons", self.id, e))?;
        Ok(Coupon {
            id: self.id,
            code,
            kind,
            value: self.value,
            min_order: self.min_order,
            max_uses: self.max_uses.map(|m| m.max(0) as u32),
            used_count: self.used_count.max(0) as u32,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ShippingRateRow {
    pub id: Uuid,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub office_price: i64,
    pub home_price: i64,
    pub is_active: bool,
}

impl From<ShippingRateRow> for ShippingRate {
    fn from(row: ShippingRateRow) -> Self {
        ShippingRate {
            id: row.id,
            wilaya_code: row.wilaya_code,
            wilaya_name: row.wilaya_name,
            office_price: row.office_price,
            home_price: row.home_price,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UpsellRuleRow {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub trigger_kind: String,
    pub trigger_id: Option<Uuid>,
    pub trigger_min_amount: Option<i64>,
    pub target_product_ids: Vec<Uuid>,
    pub display_location: String,
    pub discount_percent: Option<i64>,
    pub message: Option<String>,
    pub is_active: bool,
    pub priority: i32,
}

impl UpsellRuleRow {
    pub fn into_rule(self) -> crate::Result<UpsellRule> {
        let kind = RuleKind::parse(&self.kind).map_err(|e| invalid("upsell_rules", self.id, e))?;
        let trigger_kind = TriggerKind::parse(&self.trigger_kind)
            .map_err(|e| invalid("upsell_rules", self.id, e))?;
        let display_location = DisplayLocation::parse(&self.display_location)
            .map_err(|e| invalid("upsell_rules", self.id, e))?;
        Ok(UpsellRule {
            id: self.id,
            name: self.name,
            kind,
            trigger_kind,
            trigger_id: self.trigger_id,
            trigger_min_amount: self.trigger_min_amount,
            target_product_ids: self.target_product_ids,
            display_location,
            discount_percent: self.discount_percent,
            message: self.message,
            is_active: self.is_active,
            priority: self.priority,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub address: String,
    pub delivery_method: String,
    pub note: Option<String>,
    pub subtotal: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
    pub coupon_code: Option<String>,
    pub status: String,
    pub status_history: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_order(self, items: Vec<OrderItem>) -> crate::Result<Order> {
        let delivery_method = DeliveryMethod::parse(&self.delivery_method)
            .map_err(|e| invalid("orders", self.id, e))?;
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e: String| invalid("orders", self.id, e))?;
        let status_history: Vec<StatusHistoryEntry> =
            serde_json::from_value(self.status_history)
                .map_err(|e| invalid("orders", self.id, e))?;
        let coupon_code = self
            .coupon_code
            .map(CouponCode::new)
            .transpose()
            .map_err(|e| invalid("orders", self.id, e))?;
        Ok(Order::from_parts(
            self.id,
            OrderNumber::from_raw(self.order_number),
            CustomerDetails {
                name: self.customer_name,
                phone: self.customer_phone,
                wilaya_code: self.wilaya_code,
                wilaya_name: self.wilaya_name,
                address: self.address,
                delivery_method,
                note: self.note,
            },
            OrderTotals {
                subtotal: self.subtotal,
                shipping: self.shipping,
                discount: self.discount,
            },
            self.total,
            coupon_code,
            status,
            status_history,
            items,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[derive(Debug, FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub variant_id: Option<Uuid>,
    pub selected_options: Value,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

impl OrderItemRow {
    pub fn into_item(self) -> crate::Result<OrderItem> {
        let selected_options: BTreeMap<String, String> =
            serde_json::from_value(self.selected_options)
                .map_err(|e| invalid("order_items", self.id, e))?;
        Ok(OrderItem {
            product_id: self.product_id,
            product_name: self.product_name,
            product_image: self.product_image,
            variant_id: self.variant_id,
            selected_options,
            quantity: self.quantity.max(0) as u32,
            unit_price: self.unit_price,
            total: self.total,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct OrderStatRow {
    pub total: i64,
    pub status: String,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ItemSaleRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Clone, Debug, FromRow, serde::Serialize)]
pub struct AdminProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}
