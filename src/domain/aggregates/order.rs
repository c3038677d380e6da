//! Order aggregate.
//!
//! Orders are created exactly once at checkout submission and never deleted;
//! the only mutation afterwards is an admin status transition, which appends
//! to the history log rather than overwriting it. Item rows snapshot the
//! product at purchase time so later catalog edits cannot rewrite history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartItem;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{CouponCode, OrderNumber};
use crate::shipping::DeliveryMethod;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            other => Err(format!("unknown order status \"{other}\"")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Snapshot of a cart line frozen into an order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub variant_id: Option<Uuid>,
    pub selected_options: BTreeMap<String, String>,
    pub quantity: u32,
    pub unit_price: i64,
    pub total: i64,
}

impl OrderItem {
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            product_id: item.product().product_id,
            product_name: item.product().name.clone(),
            product_image: item.product().image_url.clone(),
            variant_id: item.variant_id(),
            selected_options: item.selected_options().clone(),
            quantity: item.quantity(),
            unit_price: item.unit_price(),
            total: item.line_total(),
        }
    }
}

/// Shipping and contact details collected by the checkout form.
#[derive(Clone, Debug)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub address: String,
    pub delivery_method: DeliveryMethod,
    pub note: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub shipping: i64,
    pub discount: i64,
}

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    customer: CustomerDetails,
    subtotal: i64,
    shipping: i64,
    discount: i64,
    total: i64,
    coupon_code: Option<CouponCode>,
    status: OrderStatus,
    status_history: Vec<StatusHistoryEntry>,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

impl Order {
    /// Creates a pending order with its initial history entry and raises the
    /// `Placed` event. Total = subtotal − discount + shipping, floored at 0.
    pub fn place(
        customer: CustomerDetails,
        items: Vec<OrderItem>,
        totals: OrderTotals,
        coupon_code: Option<CouponCode>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        let id = Uuid::new_v4();
        let order_number = OrderNumber::generate();
        let total = (totals.subtotal - totals.discount + totals.shipping).max(0);
        let mut order = Self {
            id,
            order_number: order_number.clone(),
            customer,
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            discount: totals.discount,
            total,
            coupon_code,
            status: OrderStatus::Pending,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                note: None,
            }],
            items,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise(DomainEvent::Order(OrderEvent::Placed {
            order_id: id,
            order_number: order_number.as_str().to_owned(),
            total,
        }));
        Ok(order)
    }

    /// Rehydrates a persisted order without raising events.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        order_number: OrderNumber,
        customer: CustomerDetails,
        totals: OrderTotals,
        total: i64,
        coupon_code: Option<CouponCode>,
        status: OrderStatus,
        status_history: Vec<StatusHistoryEntry>,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_number,
            customer,
            subtotal: totals.subtotal,
            shipping: totals.shipping,
            discount: totals.discount,
            total,
            coupon_code,
            status,
            status_history,
            items,
            created_at,
            updated_at,
            events: vec![],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    pub fn subtotal(&self) -> i64 {
        self.subtotal
    }

    pub fn shipping(&self) -> i64 {
        self.shipping
    }

    pub fn discount(&self) -> i64 {
        self.discount
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn coupon_code(&self) -> Option<&CouponCode> {
        self.coupon_code.as_ref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Admin status change: appends to the history log and raises an event.
    /// Re-asserting the current status is rejected rather than recorded.
    pub fn transition(
        &mut self,
        to: OrderStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if to == self.status {
            return Err(OrderError::StatusUnchanged(to));
        }
        let from = self.status;
        self.status = to;
        self.status_history.push(StatusHistoryEntry {
            status: to,
            timestamp: now,
            note,
        });
        self.updated_at = now;
        self.raise(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: self.id,
            order_number: self.order_number.as_str().to_owned(),
            from,
            to,
        }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("an order needs at least one item")]
    NoItems,
    #[error("order is already {0}")]
    StatusUnchanged(OrderStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: "Amine Benali".into(),
            phone: "0551234567".into(),
            wilaya_code: "16".into(),
            wilaya_name: "Alger".into(),
            address: "12 Rue Didouche Mourad, Alger".into(),
            delivery_method: DeliveryMethod::Home,
            note: None,
        }
    }

    fn item(price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: Uuid::new_v4(),
            product_name: "Widget".into(),
            product_image: None,
            variant_id: None,
            selected_options: BTreeMap::new(),
            quantity,
            unit_price: price,
            total: price * i64::from(quantity),
        }
    }

    #[test]
    fn place_computes_total_and_seeds_history() {
        let order = Order::place(
            customer(),
            vec![item(800, 3)],
            OrderTotals {
                subtotal: 2400,
                shipping: 600,
                discount: 480,
            },
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.total(), 2520);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.status_history().len(), 1);
        assert_eq!(order.status_history()[0].status, OrderStatus::Pending);
    }

    #[test]
    fn place_floors_total_at_zero() {
        let order = Order::place(
            customer(),
            vec![item(100, 1)],
            OrderTotals {
                subtotal: 100,
                shipping: 0,
                discount: 400,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total(), 0);
    }

    #[test]
    fn place_rejects_empty_orders() {
        let result = Order::place(
            customer(),
            vec![],
            OrderTotals {
                subtotal: 0,
                shipping: 0,
                discount: 0,
            },
            None,
            Utc::now(),
        );
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn transition_appends_history_instead_of_overwriting() {
        let mut order = Order::place(
            customer(),
            vec![item(1000, 1)],
            OrderTotals {
                subtotal: 1000,
                shipping: 400,
                discount: 0,
            },
            None,
            Utc::now(),
        )
        .unwrap();

        order
            .transition(OrderStatus::Confirmed, None, Utc::now())
            .unwrap();
        order
            .transition(OrderStatus::Shipped, Some("Yalidine".into()), Utc::now())
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Shipped);
        let statuses: Vec<_> = order.status_history().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Shipped
            ]
        );
    }

    #[test]
    fn transition_rejects_same_status() {
        let mut order = Order::place(
            customer(),
            vec![item(1000, 1)],
            OrderTotals {
                subtotal: 1000,
                shipping: 0,
                discount: 0,
            },
            None,
            Utc::now(),
        )
        .unwrap();

        let err = order
            .transition(OrderStatus::Pending, None, Utc::now())
            .unwrap_err();
        assert_eq!(err, OrderError::StatusUnchanged(OrderStatus::Pending));
        assert_eq!(order.status_history().len(), 1);
    }

    #[test]
    fn placed_event_is_raised_once() {
        let mut order = Order::place(
            customer(),
            vec![item(1000, 2)],
            OrderTotals {
                subtotal: 2000,
                shipping: 400,
                discount: 0,
            },
            None,
            Utc::now(),
        )
        .unwrap();

        let events = order.take_events();
        assert_eq!(events.len(), 1);
        assert!(order.take_events().is_empty());
    }
}
