//! Upsell offer evaluation for a storefront render.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::upsell::{
    select_offer, DismissedRules, DisplayLocation, RuleKind, UpsellContext,
};

#[derive(Debug, Deserialize)]
pub struct OfferQuery {
    pub location: DisplayLocation,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub cart_total: i64,
    /// Products already in the shopper's cart.
    #[serde(default)]
    pub cart_product_ids: Vec<Uuid>,
    /// Rules the shopper dismissed this session; held client-side so a fresh
    /// session naturally re-offers.
    #[serde(default)]
    pub dismissed_rule_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub rule_id: Uuid,
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i64>,
    pub products: Vec<OfferProductDto>,
}

#[derive(Debug, Serialize)]
pub struct OfferProductDto {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub original_price: i64,
    pub offer_price: i64,
}

pub async fn evaluate_offer(
    State(state): State<AppState>,
    Json(query): Json<OfferQuery>,
) -> Result<Json<Option<OfferResponse>>, ApiError> {
    let rules = state.backend.active_upsell_rules(query.location).await?;

    let mut target_ids: Vec<Uuid> = rules
        .iter()
        .flat_map(|r| r.target_product_ids.iter().copied())
        .collect();
    target_ids.sort_unstable();
    target_ids.dedup();
    let catalog = state.backend.products_by_ids(&target_ids).await?;

    let in_cart: HashSet<Uuid> = query.cart_product_ids.iter().copied().collect();
    let dismissed = DismissedRules::from_ids(query.dismissed_rule_ids.iter().copied());
    let context = UpsellContext {
        product_id: query.product_id,
        category_id: query.category_id,
        cart_total: query.cart_total,
    };

    let offer = select_offer(
        &rules,
        query.location,
        &context,
        &catalog,
        &in_cart,
        &dismissed,
    )
    .map(|offer| OfferResponse {
        rule_id: offer.rule_id,
        kind: offer.kind,
        message: offer.message.clone(),
        discount_percent: offer.discount_percent,
        products: offer
            .products
            .iter()
            .map(|p| OfferProductDto {
                product_id: p.product.id,
                name: p.product.name.clone(),
                slug: p.product.slug.clone(),
                image_url: p.product.primary_image_url().map(str::to_owned),
                original_price: p.original_price,
                offer_price: p.offer_price,
            })
            .collect(),
    });

    Ok(Json(offer))
}
