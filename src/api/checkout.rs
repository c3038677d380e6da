//! Checkout submission and the abandoned-cart draft endpoint.
//!
//! The cart is client-held: the request carries the lines, the server
//! re-prices every line from the catalog (upsell offer prices are
//! re-derived from the rule, never trusted from the client) and runs the
//! checkout flow against the result.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use super::{publish_events, ApiError, AppState};
use crate::checkout::{AbandonedCart, CheckoutError, CheckoutFlow};
use crate::domain::aggregates::cart::{Cart, CartProduct, CartStore, NoPersistence};
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::CouponCode;
use crate::upsell::{offer_unit_price, UpsellRule};
use crate::validation::CheckoutForm;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub session_id: String,
    pub form: CheckoutForm,
    pub items: Vec<CheckoutLine>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: BTreeMap<String, String>,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    /// Set when the line came from an upsell widget; the discounted price is
    /// recomputed server-side from the rule.
    #[serde(default)]
    pub offer_rule_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_number: String,
    pub subtotal: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_dropped: Option<CouponDroppedNotice>,
}

#[derive(Debug, Serialize)]
pub struct CouponDroppedNotice {
    pub code: String,
    pub message: String,
}

pub async fn submit_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let session_id = request.session_id.trim();
    if session_id.is_empty() {
        return Err(ApiError::bad_request("A session id is required."));
    }

    let cart = build_cart(&state, &request.items, true).await?;
    let mut cart = CartStore::from_cart(cart, NoPersistence);
    if let Some(raw) = request
        .form
        .coupon_code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        let code = CouponCode::new(raw).map_err(|_| ApiError::bad_request("Invalid coupon code."))?;
        cart.apply_coupon(code);
    }

    let mut flow = CheckoutFlow::new(Arc::new(state.backend.clone()), session_id);
    let receipt = flow
        .submit(&mut cart, &request.form, Utc::now())
        .await
        .map_err(map_checkout_error)?;

    publish_events(&state, &receipt.events).await;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_number: receipt.order_number.as_str().to_owned(),
            subtotal: receipt.subtotal,
            shipping: receipt.shipping,
            discount: receipt.discount,
            total: receipt.total,
            coupon_dropped: receipt.dropped_coupon.map(|d| CouponDroppedNotice {
                code: d.code.as_str().to_owned(),
                message: format!(
                    "The coupon was removed and the total updated. {}",
                    d.reason.message()
                ),
            }),
        }),
    ))
}

fn map_checkout_error(err: CheckoutError) -> ApiError {
    match err {
        CheckoutError::Invalid(fields) => ApiError::validation(fields),
        CheckoutError::EmptyCart => ApiError::bad_request("Your cart is empty."),
        CheckoutError::ShippingUnresolved { wilaya_code } => ApiError::bad_request(format!(
            "Delivery to wilaya {wilaya_code} is not available yet."
        )),
        CheckoutError::SubmitInFlight | CheckoutError::AlreadyCompleted => {
            ApiError::conflict("This order was already submitted.")
        }
        CheckoutError::Backend(err) => {
            tracing::error!(error = %err, "checkout placement failed");
            ApiError::retryable_submit()
        }
    }
}

/// Rebuilds a cart from client lines with catalog-authoritative prices.
/// With `strict`, unknown, unpublished or out-of-stock products reject the
/// request; drafts skip them instead.
async fn build_cart(
    state: &AppState,
    lines: &[CheckoutLine],
    strict: bool,
) -> Result<Cart, ApiError> {
    let mut ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let products: HashMap<Uuid, Product> = state
        .backend
        .products_by_ids(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut cart = Cart::new();
    for line in lines {
        let Some(product) = products.get(&line.product_id) else {
            if strict {
                return Err(ApiError::bad_request(
                    "A product in your cart is no longer available.",
                ));
            }
            continue;
        };
        if line.quantity == 0 {
            if strict {
                return Err(ApiError::bad_request("Quantities must be at least 1."));
            }
            continue;
        }
        if !product.is_in_stock() {
            if strict {
                return Err(ApiError::bad_request(format!(
                    "\"{}\" is out of stock.",
                    product.name
                )));
            }
            continue;
        }

        let mut snapshot = CartProduct::from_product(product);
        if let Some(rule_id) = line.offer_rule_id {
            match state.backend.find_upsell_rule(rule_id).await? {
                Some(rule) if offer_applies(&rule, product.id) => {
                    let original = product.effective_price();
                    let discounted = offer_unit_price(
                        original,
                        rule.discount_percent.unwrap_or(0),
                    );
                    snapshot.price = original;
                    snapshot.sale_price = (discounted < original).then_some(discounted);
                }
                _ => {
                    tracing::warn!(%rule_id, product_id = %product.id, "ignoring stale upsell offer reference");
                }
            }
        }
        cart.add_item(
            snapshot,
            line.quantity,
            line.selected_options.clone(),
            line.variant_id,
        );
    }
    Ok(cart)
}

fn offer_applies(rule: &UpsellRule, product_id: Uuid) -> bool {
    rule.is_active
        && rule.discount_percent.unwrap_or(0) > 0
        && rule.target_product_ids.contains(&product_id)
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub session_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub wilaya_code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub items: Vec<CheckoutLine>,
}

/// Upserts the abandoned-cart snapshot for a shopper mid-checkout. Strictly
/// best-effort: nothing here may block the shopper, so failures are logged
/// and the response is 204 either way.
pub async fn save_draft(
    State(state): State<AppState>,
    Json(request): Json<DraftRequest>,
) -> StatusCode {
    let session_id = request.session_id.trim();
    if session_id.is_empty() {
        return StatusCode::NO_CONTENT;
    }

    let cart = match build_cart(&state, &request.items, false).await {
        Ok(cart) => cart,
        Err(_) => {
            tracing::warn!(%session_id, "draft cart rebuild failed; skipping save");
            return StatusCode::NO_CONTENT;
        }
    };

    let form = CheckoutForm {
        customer_name: request.customer_name,
        customer_phone: request.customer_phone,
        wilaya_code: request.wilaya_code,
        address: request.address,
        delivery_method: Default::default(),
        note: None,
        coupon_code: None,
    };
    if let Some(snapshot) = AbandonedCart::capture(session_id, &form, &cart) {
        use crate::checkout::CheckoutBackend;
        if let Err(err) = state.backend.upsert_abandoned_cart(&snapshot).await {
            tracing::warn!(%session_id, error = %err, "abandoned cart save failed");
        }
    }
    StatusCode::NO_CONTENT
}
