//! Cart aggregate and its durable store.
//!
//! The cart is a shopper-held shopping list, not a server-authoritative
//! resource: it lives in memory, is written through a [`CartPersistence`]
//! adapter after every mutation, and is only reconciled into an order at
//! checkout submit time. Mutations are synchronous and never touch the
//! network.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::value_objects::CouponCode;
use crate::pricing;

/// Pricing snapshot of a product carried on a cart line. Holding a snapshot
/// (rather than a live reference) keeps historical lines stable when the
/// catalog changes underneath them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: i64,
    pub sale_price: Option<i64>,
}

impl CartProduct {
    pub fn from_product(product: &super::product::Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            image_url: product.primary_image_url().map(str::to_owned),
            price: product.price,
            sale_price: product.sale_price,
        }
    }

    pub fn effective_price(&self) -> i64 {
        pricing::effective_price(self.price, self.sale_price)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    id: Uuid,
    product: CartProduct,
    variant_id: Option<Uuid>,
    quantity: u32,
    selected_options: BTreeMap<String, String>,
}

impl CartItem {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn product(&self) -> &CartProduct {
        &self.product
    }

    pub fn variant_id(&self) -> Option<Uuid> {
        self.variant_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn selected_options(&self) -> &BTreeMap<String, String> {
        &self.selected_options
    }

    pub fn unit_price(&self) -> i64 {
        self.product.effective_price()
    }

    pub fn line_total(&self) -> i64 {
        pricing::line_total(self.unit_price(), self.quantity)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    coupon_code: Option<CouponCode>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn coupon_code(&self) -> Option<&CouponCode> {
        self.coupon_code.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Product ids currently in the cart; the upsell engine uses this to
    /// avoid offering something the shopper already has.
    pub fn product_ids(&self) -> HashSet<Uuid> {
        self.items.iter().map(|i| i.product.product_id).collect()
    }

    /// Adds `quantity` of a product. A line with the same product id and an
    /// identical selected-options map is merged by summing quantities
    /// (keeping the existing price snapshot); otherwise a new line with a
    /// fresh identity is appended. Returns the id of the affected line.
    ///
    /// Quantity must be positive; callers enforce this at the edge.
    pub fn add_item(
        &mut self,
        product: CartProduct,
        quantity: u32,
        selected_options: BTreeMap<String, String>,
        variant_id: Option<Uuid>,
    ) -> Uuid {
        if let Some(existing) = self.items.iter_mut().find(|i| {
            i.product.product_id == product.product_id && i.selected_options == selected_options
        }) {
            existing.quantity += quantity;
            return existing.id;
        }
        let id = Uuid::new_v4();
        self.items.push(CartItem {
            id,
            product,
            variant_id,
            quantity,
            selected_options,
        });
        id
    }

    /// Removes the line if present; absent lines are a no-op.
    pub fn remove_item(&mut self, item_id: Uuid) {
        self.items.retain(|i| i.id != item_id);
    }

    /// Replaces a line's quantity; zero removes the line.
    pub fn update_quantity(&mut self, item_id: Uuid, quantity: u32) {
        if quantity == 0 {
            self.remove_item(item_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.quantity = quantity;
        }
    }

    /// Stores the code only. Applicability is decided by the coupon
    /// validator at checkout time, never here.
    pub fn apply_coupon(&mut self, code: CouponCode) {
        self.coupon_code = Some(code);
    }

    pub fn remove_coupon(&mut self) {
        self.coupon_code = None;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
    }

    pub fn subtotal(&self) -> i64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total unit count, for the cart-icon badge.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Durable-storage adapter for the cart. Failures are swallowed by the
/// adapter (logged, not raised): losing a save degrades to an empty cart on
/// the next load.
pub trait CartPersistence {
    fn load(&self) -> Option<Cart>;
    fn save(&self, cart: &Cart);
    fn clear(&self);
}

/// Adapter for request-scoped carts rebuilt from a client payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPersistence;

impl CartPersistence for NoPersistence {
    fn load(&self) -> Option<Cart> {
        None
    }

    fn save(&self, _cart: &Cart) {}

    fn clear(&self) {}
}

/// JSON-file adapter mirroring the durable client-storage copy. Concurrent
/// writers are last-write-wins; the file is only re-read on construction.
#[derive(Clone, Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartPersistence for JsonFilePersistence {
    fn load(&self) -> Option<Cart> {
        let raw = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice(&raw) {
            Ok(cart) => Some(cart),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "discarding unreadable cart file");
                None
            }
        }
    }

    fn save(&self, cart: &Cart) {
        let payload = match serde_json::to_vec(cart) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(error = %err, "cart serialization failed; skipping save");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, payload) {
            tracing::warn!(path = %self.path.display(), error = %err, "cart save failed");
        }
    }

    fn clear(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "cart file removal failed");
            }
        }
    }
}

/// Explicitly constructed cart state container: loads on construction and
/// writes through after every mutation. Tests instantiate isolated stores
/// instead of sharing a process-wide singleton.
#[derive(Debug)]
pub struct CartStore<P: CartPersistence> {
    cart: Cart,
    persistence: P,
}

impl<P: CartPersistence> CartStore<P> {
    pub fn new(persistence: P) -> Self {
        let cart = persistence.load().unwrap_or_default();
        Self { cart, persistence }
    }

    /// Wraps an already-materialised cart, e.g. one rebuilt from a checkout
    /// request body.
    pub fn from_cart(cart: Cart, persistence: P) -> Self {
        Self { cart, persistence }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn add_item(
        &mut self,
        product: CartProduct,
        quantity: u32,
        selected_options: BTreeMap<String, String>,
        variant_id: Option<Uuid>,
    ) -> Uuid {
        let id = self.cart.add_item(product, quantity, selected_options, variant_id);
        self.persistence.save(&self.cart);
        id
    }

    pub fn remove_item(&mut self, item_id: Uuid) {
        self.cart.remove_item(item_id);
        self.persistence.save(&self.cart);
    }

    pub fn update_quantity(&mut self, item_id: Uuid, quantity: u32) {
        self.cart.update_quantity(item_id, quantity);
        self.persistence.save(&self.cart);
    }

    pub fn apply_coupon(&mut self, code: CouponCode) {
        self.cart.apply_coupon(code);
        self.persistence.save(&self.cart);
    }

    pub fn remove_coupon(&mut self) {
        self.cart.remove_coupon();
        self.persistence.save(&self.cart);
    }

    /// Empties items and coupon and drops the durable copy. Called only
    /// after a successful order submission.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.persistence.clear();
    }

    pub fn subtotal(&self) -> i64 {
        self.cart.subtotal()
    }

    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(price: i64, sale: Option<i64>) -> CartProduct {
        CartProduct {
            product_id: Uuid::new_v4(),
            name: "Widget".into(),
            image_url: None,
            price,
            sale_price: sale,
        }
    }

    fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn add_item_merges_same_product_and_options() {
        let mut cart = Cart::new();
        let product = widget(1000, None);
        let first = cart.add_item(product.clone(), 2, options(&[("Color", "Red")]), None);
        let second = cart.add_item(product, 3, options(&[("Color", "Red")]), None);

        assert_eq!(first, second);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity(), 5);
    }

    #[test]
    fn add_item_keeps_distinct_options_on_separate_lines() {
        let mut cart = Cart::new();
        let product = widget(1000, None);
        cart.add_item(product.clone(), 1, options(&[("Color", "Red")]), None);
        cart.add_item(product, 1, options(&[("Color", "Blue")]), None);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn subtotal_uses_sale_price_and_sums_lines() {
        // One product priced 1000 with sale price 800, quantity 3.
        let mut cart = Cart::new();
        cart.add_item(widget(1000, Some(800)), 3, BTreeMap::new(), None);
        assert_eq!(cart.subtotal(), 2400);
    }

    #[test]
    fn removing_a_line_decreases_subtotal_by_its_contribution() {
        let mut cart = Cart::new();
        cart.add_item(widget(1000, None), 1, BTreeMap::new(), None);
        let id = cart.add_item(widget(500, None), 2, BTreeMap::new(), None);
        let before = cart.subtotal();

        cart.remove_item(id);
        assert_eq!(cart.subtotal(), before - 1000);
    }

    #[test]
    fn remove_item_is_idempotent() {
        let mut cart = Cart::new();
        let id = cart.add_item(widget(1000, None), 1, BTreeMap::new(), None);
        cart.remove_item(id);
        cart.remove_item(id);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_zero_removes_the_line() {
        let mut cart = Cart::new();
        let id = cart.add_item(widget(1000, None), 2, BTreeMap::new(), None);
        cart.update_quantity(id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn item_count_sums_quantities() {
        let mut cart = Cart::new();
        cart.add_item(widget(1000, None), 2, BTreeMap::new(), None);
        cart.add_item(widget(500, None), 3, BTreeMap::new(), None);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn clear_drops_items_and_coupon() {
        let mut cart = Cart::new();
        cart.add_item(widget(1000, None), 1, BTreeMap::new(), None);
        cart.apply_coupon(CouponCode::new("SALE20").unwrap());
        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.coupon_code().is_none());
    }

    #[test]
    fn store_persists_through_file_adapter_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        let mut store = CartStore::new(JsonFilePersistence::new(&path));
        store.add_item(widget(1000, Some(800)), 3, BTreeMap::new(), None);
        store.apply_coupon(CouponCode::new("SALE20").unwrap());

        let reloaded = CartStore::new(JsonFilePersistence::new(&path));
        assert_eq!(reloaded.subtotal(), 2400);
        assert_eq!(
            reloaded.cart().coupon_code().map(|c| c.as_str().to_owned()),
            Some("SALE20".to_owned())
        );

        // clear() removes the durable copy too
        let mut store = reloaded;
        store.clear();
        let empty = CartStore::new(JsonFilePersistence::new(&path));
        assert!(empty.cart().is_empty());
    }
}
