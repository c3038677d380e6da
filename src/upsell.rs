//! Upsell rule evaluation.
//!
//! Rules are admin-owned and read-only here. Evaluation is pure: given the
//! active rules for a display location, the trigger context, the catalog
//! snapshot and the ids already in the cart, it selects at most one rule
//! whose targets survive exclusion and prices the presented offer. The
//! discounted offer price is presentational — it is fed back into the cart
//! only through the add-to-cart snapshot and never written to the product.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartProduct;
use crate::domain::aggregates::product::Product;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Upsell,
    Downsell,
    CrossSell,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsell => "upsell",
            Self::Downsell => "downsell",
            Self::CrossSell => "cross_sell",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "upsell" => Ok(Self::Upsell),
            "downsell" => Ok(Self::Downsell),
            "cross_sell" => Ok(Self::CrossSell),
            other => Err(format!("unknown rule kind \"{other}\"")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Product,
    Category,
    CartTotal,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::CartTotal => "cart_total",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "product" => Ok(Self::Product),
            "category" => Ok(Self::Category),
            "cart_total" => Ok(Self::CartTotal),
            other => Err(format!("unknown trigger kind \"{other}\"")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLocation {
    ProductPage,
    Cart,
    Checkout,
    OrderSuccess,
}

impl DisplayLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductPage => "product_page",
            Self::Cart => "cart",
            Self::Checkout => "checkout",
            Self::OrderSuccess => "order_success",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "product_page" => Ok(Self::ProductPage),
            "cart" => Ok(Self::Cart),
            "checkout" => Ok(Self::Checkout),
            "order_success" => Ok(Self::OrderSuccess),
            other => Err(format!("unknown display location \"{other}\"")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpsellRule {
    pub id: Uuid,
    pub name: String,
    pub kind: RuleKind,
    pub trigger_kind: TriggerKind,
    pub trigger_id: Option<Uuid>,
    pub trigger_min_amount: Option<i64>,
    pub target_product_ids: Vec<Uuid>,
    pub display_location: DisplayLocation,
    pub discount_percent: Option<i64>,
    pub message: Option<String>,
    pub is_active: bool,
    /// Lower values are evaluated first.
    pub priority: i32,
}

impl UpsellRule {
    fn matches(&self, ctx: &UpsellContext) -> bool {
        match self.trigger_kind {
            TriggerKind::Product => self.trigger_id.is_some() && self.trigger_id == ctx.product_id,
            TriggerKind::Category => {
                self.trigger_id.is_some() && self.trigger_id == ctx.category_id
            }
            TriggerKind::CartTotal => match self.trigger_min_amount {
                Some(min) => ctx.cart_total >= min,
                None => true,
            },
        }
    }
}

/// Where the shopper currently is: the product being viewed, its category,
/// and the running cart total.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpsellContext {
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub cart_total: i64,
}

/// Rule ids the viewer dismissed this session. UI-local state: never
/// persisted, so a fresh session re-offers everything.
#[derive(Clone, Debug, Default)]
pub struct DismissedRules(HashSet<Uuid>);

impl DismissedRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dismiss(&mut self, rule_id: Uuid) {
        self.0.insert(rule_id);
    }

    pub fn contains(&self, rule_id: Uuid) -> bool {
        self.0.contains(&rule_id)
    }

    pub fn from_ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self(ids.into_iter().collect())
    }
}

/// A target product priced for presentation.
#[derive(Clone, Debug)]
pub struct OfferProduct {
    pub product: Product,
    pub original_price: i64,
    pub offer_price: i64,
}

impl OfferProduct {
    /// Snapshot used when the shopper accepts the offer: the discounted
    /// price rides in as the sale price of the cart line, leaving the stored
    /// product untouched.
    pub fn to_cart_product(&self) -> CartProduct {
        CartProduct {
            product_id: self.product.id,
            name: self.product.name.clone(),
            image_url: self.product.primary_image_url().map(str::to_owned),
            price: self.original_price,
            sale_price: (self.offer_price < self.original_price).then_some(self.offer_price),
        }
    }
}

/// The single rule presented for a render, with its resolved products.
#[derive(Clone, Debug)]
pub struct UpsellOffer {
    pub rule_id: Uuid,
    pub kind: RuleKind,
    pub message: Option<String>,
    pub discount_percent: Option<i64>,
    pub products: Vec<OfferProduct>,
}

/// Presentation-only discounted price: `floor(effective × (1 − percent/100))`.
pub fn offer_unit_price(effective: i64, discount_percent: i64) -> i64 {
    let percent = discount_percent.clamp(0, 100);
    effective * (100 - percent) / 100
}

/// Selects the offer to show, if any.
///
/// Rules are tried in ascending priority (stable on ties); the first rule
/// whose trigger matches and that still has at least one resolvable target —
/// published, in stock, not already in the cart, not dismissed — wins. At
/// most one rule is shown per location. No match is "nothing to show", not
/// an error.
pub fn select_offer(
    rules: &[UpsellRule],
    location: DisplayLocation,
    ctx: &UpsellContext,
    catalog: &[Product],
    in_cart: &HashSet<Uuid>,
    dismissed: &DismissedRules,
) -> Option<UpsellOffer> {
    let mut candidates: Vec<&UpsellRule> = rules
        .iter()
        .filter(|r| r.is_active && r.display_location == location)
        .filter(|r| !dismissed.contains(r.id))
        .filter(|r| r.matches(ctx))
        .collect();
    candidates.sort_by_key(|r| r.priority);

    for rule in candidates {
        let products: Vec<OfferProduct> = rule
            .target_product_ids
            .iter()
            .filter_map(|id| catalog.iter().find(|p| p.id == *id))
            .filter(|p| p.is_published && p.is_in_stock() && !in_cart.contains(&p.id))
            .map(|p| {
                let original = p.effective_price();
                let offer = match rule.discount_percent {
                    Some(d) if d > 0 => offer_unit_price(original, d),
                    _ => original,
                };
                OfferProduct {
                    product: p.clone(),
                    original_price: original,
                    offer_price: offer,
                }
            })
            .collect();

        if !products.is_empty() {
            return Some(UpsellOffer {
                rule_id: rule.id,
                kind: rule.kind,
                message: rule.message.clone(),
                discount_percent: rule.discount_percent,
                products,
            });
        }
    }
    None
}
