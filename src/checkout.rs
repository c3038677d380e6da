//! Checkout orchestration.
//!
//! A [`CheckoutFlow`] drives one checkout attempt through
//! `FORM_ENTRY → VALIDATING → SUBMITTING → FAILED | SUCCEEDED`. The cart is
//! only cleared after the order has committed, so a failed submission can be
//! retried without re-entering anything. Writes are never auto-retried;
//! cheap idempotent reads are retried once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::coupon::{validate_coupon, Coupon, CouponRejection};
use crate::domain::aggregates::cart::{Cart, CartPersistence, CartStore};
use crate::domain::aggregates::order::{CustomerDetails, Order, OrderItem, OrderTotals};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{CouponCode, OrderNumber};
use crate::error::StorefrontError;
use crate::shipping::{resolve_shipping_cost, ShippingRate};
use crate::validation::{validate_checkout_form, CheckoutForm};

/// Session-scoped snapshot of an in-progress checkout, upserted while the
/// shopper types and deleted once the order commits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbandonedCart {
    pub session_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub wilaya_code: Option<String>,
    pub address: Option<String>,
    pub items: Vec<AbandonedLine>,
    pub subtotal: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbandonedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: u32,
    pub unit_price: i64,
    pub selected_options: BTreeMap<String, String>,
}

impl AbandonedCart {
    /// Captures a snapshot once the shopper has given a name and phone;
    /// before that there is nothing worth following up on.
    pub fn capture(session_id: &str, form: &CheckoutForm, cart: &Cart) -> Option<Self> {
        if form.customer_name.trim().is_empty() || form.customer_phone.trim().is_empty() {
            return None;
        }
        let none_if_empty = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_owned())
        };
        Some(Self {
            session_id: session_id.to_owned(),
            customer_name: form.customer_name.clone(),
            customer_phone: form.customer_phone.clone(),
            wilaya_code: none_if_empty(&form.wilaya_code),
            address: none_if_empty(&form.address),
            items: cart
                .items()
                .iter()
                .map(|item| AbandonedLine {
                    product_id: item.product().product_id,
                    product_name: item.product().name.clone(),
                    product_image: item.product().image_url.clone(),
                    quantity: item.quantity(),
                    unit_price: item.unit_price(),
                    selected_options: item.selected_options().clone(),
                })
                .collect(),
            subtotal: cart.subtotal(),
        })
    }
}

/// Persistence seam for the checkout flow. The production implementation is
/// Postgres-backed; tests use an in-memory fake.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    async fn active_shipping_rates(&self) -> crate::Result<Vec<ShippingRate>>;

    /// Looks up a coupon by normalised code, active or not — applicability
    /// is the validator's call.
    async fn find_coupon(&self, code: &CouponCode) -> crate::Result<Option<Coupon>>;

    /// Persists the order header, its item snapshots and the coupon-usage
    /// increment as one logical unit: either everything commits or nothing
    /// does.
    async fn place_order(&self, order: &Order, coupon_used: Option<&CouponCode>)
        -> crate::Result<()>;

    async fn upsert_abandoned_cart(&self, snapshot: &AbandonedCart) -> crate::Result<()>;

    async fn delete_abandoned_cart(&self, session_id: &str) -> crate::Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutState {
    FormEntry,
    Validating,
    Submitting,
    Failed,
    Succeeded,
}

#[derive(Clone, Debug)]
pub struct DroppedCoupon {
    pub code: CouponCode,
    pub reason: CouponRejection,
}

#[derive(Debug)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub order_number: OrderNumber,
    pub subtotal: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
    /// Set when a previously applied coupon no longer held at submit time;
    /// the discount was removed and checkout proceeded. Callers should tell
    /// the shopper the total changed.
    pub dropped_coupon: Option<DroppedCoupon>,
    pub events: Vec<DomainEvent>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,
    #[error("the form has invalid fields")]
    Invalid(BTreeMap<String, String>),
    #[error("no active shipping rate covers wilaya {wilaya_code}")]
    ShippingUnresolved { wilaya_code: String },
    #[error("a submission is already in flight")]
    SubmitInFlight,
    #[error("this checkout already succeeded")]
    AlreadyCompleted,
    /// Retryable: the cart was not cleared.
    #[error("the order could not be saved")]
    Backend(#[source] StorefrontError),
}

/// Debounced, cancellable save of the abandoned-cart snapshot. Each newer
/// edit aborts the pending timer, so only the latest field values ever
/// reach the backend. Saves are best-effort and never block the shopper.
struct DebouncedAutosave<B> {
    backend: Arc<B>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl<B: CheckoutBackend + 'static> DebouncedAutosave<B> {
    fn new(backend: Arc<B>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            pending: None,
        }
    }

    fn schedule(&mut self, snapshot: AbandonedCart) {
        self.cancel();
        let backend = Arc::clone(&self.backend);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = backend.upsert_abandoned_cart(&snapshot).await {
                tracing::warn!(session_id = %snapshot.session_id, error = %err, "abandoned cart save failed");
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<B> Drop for DebouncedAutosave<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

const AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

pub struct CheckoutFlow<B: CheckoutBackend + 'static> {
    backend: Arc<B>,
    session_id: String,
    state: CheckoutState,
    autosave: DebouncedAutosave<B>,
}

impl<B: CheckoutBackend + 'static> CheckoutFlow<B> {
    pub fn new(backend: Arc<B>, session_id: impl Into<String>) -> Self {
        Self::with_autosave_delay(backend, session_id, AUTOSAVE_DELAY)
    }

    pub fn with_autosave_delay(
        backend: Arc<B>,
        session_id: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let autosave = DebouncedAutosave::new(Arc::clone(&backend), delay);
        Self {
            backend,
            session_id: session_id.into(),
            state: CheckoutState::FormEntry,
            autosave,
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Called on every form edit. Once name and phone are both present this
    /// (re)schedules a debounced abandoned-cart upsert; the previous pending
    /// save, if any, is superseded.
    pub fn note_edit(&mut self, form: &CheckoutForm, cart: &Cart) {
        match AbandonedCart::capture(&self.session_id, form, cart) {
            Some(snapshot) => self.autosave.schedule(snapshot),
            None => self.autosave.cancel(),
        }
    }

    /// Runs the submission pipeline. On success the cart is cleared and the
    /// flow becomes terminal; on any failure the cart is left untouched.
    pub async fn submit<P: CartPersistence>(
        &mut self,
        cart: &mut CartStore<P>,
        form: &CheckoutForm,
        now: DateTime<Utc>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        match self.state {
            CheckoutState::Submitting => return Err(CheckoutError::SubmitInFlight),
            CheckoutState::Succeeded => return Err(CheckoutError::AlreadyCompleted),
            _ => {}
        }
        if cart.cart().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.state = CheckoutState::Validating;
        if let Err(fields) = validate_checkout_form(form) {
            self.state = CheckoutState::FormEntry;
            return Err(CheckoutError::Invalid(fields));
        }

        self.state = CheckoutState::Submitting;

        let rates = match self.read_rates().await {
            Ok(rates) => rates,
            Err(err) => return Err(self.fail(err)),
        };
        let Some(shipping) =
            resolve_shipping_cost(&rates, &form.wilaya_code, form.delivery_method)
        else {
            self.state = CheckoutState::Failed;
            return Err(CheckoutError::ShippingUnresolved {
                wilaya_code: form.wilaya_code.clone(),
            });
        };
        let wilaya_name = rates
            .iter()
            .find(|r| r.wilaya_code == form.wilaya_code)
            .map(|r| r.wilaya_name.clone())
            .unwrap_or_default();

        let subtotal = cart.subtotal();

        // Re-validate any applied coupon against the live subtotal and
        // clock; a coupon that no longer holds drops its discount but does
        // not block the order.
        let mut discount = 0;
        let mut applied_coupon = None;
        let mut dropped_coupon = None;
        if let Some(code) = cart.cart().coupon_code().cloned() {
            match self.read_coupon(&code).await {
                Err(err) => return Err(self.fail(err)),
                Ok(None) => {
                    dropped_coupon = Some(DroppedCoupon {
                        code,
                        reason: CouponRejection::NotFound,
                    });
                }
                Ok(Some(coupon)) => match validate_coupon(&coupon, subtotal, now) {
                    Ok(amount) => {
                        discount = amount;
                        applied_coupon = Some(code);
                    }
                    Err(reason) => {
                        tracing::info!(code = %code, ?reason, "dropping coupon at submit time");
                        dropped_coupon = Some(DroppedCoupon { code, reason });
                    }
                },
            }
        }

        let items: Vec<OrderItem> = cart
            .cart()
            .items()
            .iter()
            .map(OrderItem::from_cart_item)
            .collect();
        let customer = CustomerDetails {
            name: form.customer_name.clone(),
            phone: form.customer_phone.clone(),
            wilaya_code: form.wilaya_code.clone(),
            wilaya_name,
            address: form.address.clone(),
            delivery_method: form.delivery_method,
            note: form.note.as_deref().and_then(|n| {
                let n = n.trim();
                (!n.is_empty()).then(|| n.to_owned())
            }),
        };
        let mut order = Order::place(
            customer,
            items,
            OrderTotals {
                subtotal,
                shipping,
                discount,
            },
            applied_coupon.clone(),
            now,
        )
        .map_err(|_| CheckoutError::EmptyCart)?;

        if let Err(err) = self
            .backend
            .place_order(&order, applied_coupon.as_ref())
            .await
        {
            tracing::error!(error = %err, "order placement failed; cart preserved for retry");
            return Err(self.fail(err));
        }

        // The order is committed; everything past this point is cleanup.
        self.autosave.cancel();
        if let Err(err) = self.backend.delete_abandoned_cart(&self.session_id).await {
            tracing::warn!(session_id = %self.session_id, error = %err, "abandoned cart cleanup failed");
        }
        cart.clear();
        self.state = CheckoutState::Succeeded;

        let events = order.take_events();
        Ok(CheckoutReceipt {
            order_id: order.id(),
            order_number: order.order_number().clone(),
            subtotal: order.subtotal(),
            shipping: order.shipping(),
            discount: order.discount(),
            total: order.total(),
            dropped_coupon,
            events,
        })
    }

    fn fail(&mut self, err: StorefrontError) -> CheckoutError {
        self.state = CheckoutState::Failed;
        CheckoutError::Backend(err)
    }

    async fn read_rates(&self) -> crate::Result<Vec<ShippingRate>> {
        match self.backend.active_shipping_rates().await {
            Ok(rates) => Ok(rates),
            Err(first) => {
                tracing::debug!(error = %first, "shipping rate read failed; retrying once");
                self.backend.active_shipping_rates().await
            }
        }
    }

    async fn read_coupon(&self, code: &CouponCode) -> crate::Result<Option<Coupon>> {
        match self.backend.find_coupon(code).await {
            Ok(coupon) => Ok(coupon),
            Err(first) => {
                tracing::debug!(error = %first, "coupon read failed; retrying once");
                self.backend.find_coupon(code).await
            }
        }
    }

    #[cfg(test)]
    fn force_state(&mut self, state: CheckoutState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::CouponKind;
    use crate::domain::aggregates::cart::{CartProduct, NoPersistence};
    use crate::shipping::DeliveryMethod;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        rates: Vec<ShippingRate>,
        coupons: Vec<Coupon>,
        fail_place: AtomicBool,
        fail_rates_once: AtomicBool,
        rate_reads: AtomicU32,
        placed: Mutex<Vec<(Order, Option<CouponCode>)>>,
        saves: Mutex<Vec<AbandonedCart>>,
        deletes: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn with_rate(mut self, code: &str, office: i64, home: i64) -> Self {
            self.rates.push(ShippingRate {
                id: Uuid::new_v4(),
                wilaya_code: code.into(),
                wilaya_name: format!("Wilaya {code}"),
                office_price: office,
                home_price: home,
                is_active: true,
            });
            self
        }

        fn with_coupon(mut self, coupon: Coupon) -> Self {
            self.coupons.push(coupon);
            self
        }

        fn placed_count(&self) -> usize {
            self.placed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CheckoutBackend for FakeBackend {
        async fn active_shipping_rates(&self) -> crate::Result<Vec<ShippingRate>> {
            self.rate_reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_rates_once.swap(false, Ordering::SeqCst) {
                return Err(StorefrontError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self.rates.clone())
        }

        async fn find_coupon(&self, code: &CouponCode) -> crate::Result<Option<Coupon>> {
            Ok(self.coupons.iter().find(|c| &c.code == code).cloned())
        }

        async fn place_order(
            &self,
            order: &Order,
            coupon_used: Option<&CouponCode>,
        ) -> crate::Result<()> {
            if self.fail_place.load(Ordering::SeqCst) {
                return Err(StorefrontError::Database(sqlx::Error::PoolClosed));
            }
            self.placed
                .lock()
                .unwrap()
                .push((order.clone(), coupon_used.cloned()));
            Ok(())
        }

        async fn upsert_abandoned_cart(&self, snapshot: &AbandonedCart) -> crate::Result<()> {
            self.saves.lock().unwrap().push(snapshot.clone());
            Ok(())
        }

        async fn delete_abandoned_cart(&self, session_id: &str) -> crate::Result<()> {
            self.deletes.lock().unwrap().push(session_id.to_owned());
            Ok(())
        }
    }

    fn sale_widget() -> CartProduct {
        CartProduct {
            product_id: Uuid::new_v4(),
            name: "Widget".into(),
            image_url: None,
            price: 1000,
            sale_price: Some(800),
        }
    }

    fn cart_with_widget() -> CartStore<NoPersistence> {
        let mut cart = CartStore::new(NoPersistence);
        cart.add_item(sale_widget(), 3, BTreeMap::new(), None);
        cart
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            customer_name: "Amine Benali".into(),
            customer_phone: "0551234567".into(),
            wilaya_code: "16".into(),
            address: "12 Rue Didouche Mourad, Alger".into(),
            delivery_method: DeliveryMethod::Home,
            note: None,
            coupon_code: None,
        }
    }

    fn percent_coupon(code: &str, value: i64, min_order: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: CouponCode::new(code).unwrap(),
            kind: CouponKind::Percent,
            value,
            min_order: Some(min_order),
            max_uses: None,
            used_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn submit_places_order_with_expected_totals() {
        // subtotal 2400 (3 × 800), 20% coupon → 480, home shipping 600
        let backend = Arc::new(
            FakeBackend::default()
                .with_rate("16", 400, 600)
                .with_coupon(percent_coupon("SALE20", 20, 1000)),
        );
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();
        cart.apply_coupon(CouponCode::new("sale20").unwrap());

        let receipt = flow.submit(&mut cart, &form(), Utc::now()).await.unwrap();

        assert_eq!(receipt.subtotal, 2400);
        assert_eq!(receipt.discount, 480);
        assert_eq!(receipt.shipping, 600);
        assert_eq!(receipt.total, 2520);
        assert!(receipt.dropped_coupon.is_none());
        assert_eq!(flow.state(), CheckoutState::Succeeded);

        // cart cleared, abandoned snapshot deleted, coupon usage recorded
        assert!(cart.cart().is_empty());
        assert_eq!(backend.deletes.lock().unwrap().as_slice(), ["sess-1"]);
        let placed = backend.placed.lock().unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(
            placed[0].1.as_ref().map(|c| c.as_str().to_owned()),
            Some("SALE20".to_owned())
        );
    }

    #[tokio::test]
    async fn invalid_form_returns_field_errors_and_stays_in_form_entry() {
        let backend = Arc::new(FakeBackend::default().with_rate("16", 400, 600));
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();
        let mut bad = form();
        bad.customer_phone = "123".into();

        let err = flow.submit(&mut cart, &bad, Utc::now()).await.unwrap_err();
        match err {
            CheckoutError::Invalid(fields) => assert!(fields.contains_key("customer_phone")),
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert_eq!(flow.state(), CheckoutState::FormEntry);
        assert_eq!(backend.placed_count(), 0);
        assert!(!cart.cart().is_empty());
    }

    #[tokio::test]
    async fn unresolved_shipping_blocks_submission() {
        let backend = Arc::new(FakeBackend::default().with_rate("16", 400, 600));
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();
        let mut unknown = form();
        unknown.wilaya_code = "99".into();

        let err = flow
            .submit(&mut cart, &unknown, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::ShippingUnresolved { ref wilaya_code } if wilaya_code == "99"
        ));
        assert_eq!(backend.placed_count(), 0);
        assert!(!cart.cart().is_empty());
    }

    #[tokio::test]
    async fn stale_coupon_is_dropped_with_notice_not_a_block() {
        // min_order 5000 no longer holds against subtotal 2400
        let backend = Arc::new(
            FakeBackend::default()
                .with_rate("16", 400, 600)
                .with_coupon(percent_coupon("BIG", 20, 5000)),
        );
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();
        cart.apply_coupon(CouponCode::new("BIG").unwrap());

        let receipt = flow.submit(&mut cart, &form(), Utc::now()).await.unwrap();

        assert_eq!(receipt.discount, 0);
        assert_eq!(receipt.total, 3000);
        let dropped = receipt.dropped_coupon.unwrap();
        assert_eq!(dropped.code.as_str(), "BIG");
        assert_eq!(
            dropped.reason,
            CouponRejection::BelowMinOrder { min_order: 5000 }
        );
        // no usage increment for a dropped coupon
        assert!(backend.placed.lock().unwrap()[0].1.is_none());
    }

    #[tokio::test]
    async fn placement_failure_preserves_the_cart_for_retry() {
        let backend = Arc::new(FakeBackend::default().with_rate("16", 400, 600));
        backend.fail_place.store(true, Ordering::SeqCst);
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();

        let err = flow.submit(&mut cart, &form(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Backend(_)));
        assert_eq!(flow.state(), CheckoutState::Failed);
        assert!(!cart.cart().is_empty());
        assert!(backend.deletes.lock().unwrap().is_empty());

        // the same flow can retry once the backend recovers
        backend.fail_place.store(false, Ordering::SeqCst);
        let receipt = flow.submit(&mut cart, &form(), Utc::now()).await.unwrap();
        assert_eq!(receipt.total, 3000);
        assert!(cart.cart().is_empty());
    }

    #[tokio::test]
    async fn rate_read_is_retried_once() {
        let backend = Arc::new(FakeBackend::default().with_rate("16", 400, 600));
        backend.fail_rates_once.store(true, Ordering::SeqCst);
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();

        flow.submit(&mut cart, &form(), Utc::now()).await.unwrap();
        assert_eq!(backend.rate_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_validation() {
        let backend = Arc::new(FakeBackend::default());
        let mut flow = CheckoutFlow::new(backend, "sess-1");
        let mut cart = CartStore::new(NoPersistence);
        let err = flow.submit(&mut cart, &form(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn second_submit_after_success_is_rejected() {
        let backend = Arc::new(FakeBackend::default().with_rate("16", 400, 600));
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let mut cart = cart_with_widget();

        flow.submit(&mut cart, &form(), Utc::now()).await.unwrap();
        let mut cart2 = cart_with_widget();
        let err = flow.submit(&mut cart2, &form(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadyCompleted));
        assert_eq!(backend.placed_count(), 1);
    }

    #[tokio::test]
    async fn in_flight_submission_is_guarded() {
        let backend = Arc::new(FakeBackend::default().with_rate("16", 400, 600));
        let mut flow = CheckoutFlow::new(backend, "sess-1");
        flow.force_state(CheckoutState::Submitting);
        let mut cart = cart_with_widget();
        let err = flow.submit(&mut cart, &form(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::SubmitInFlight));
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_autosave_keeps_only_the_latest_edit() {
        let backend = Arc::new(FakeBackend::default());
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let cart = {
            let mut c = Cart::new();
            c.add_item(sale_widget(), 1, BTreeMap::new(), None);
            c
        };

        let mut draft = form();
        draft.customer_name = "First Draft".into();
        flow.note_edit(&draft, &cart);

        // A second edit lands inside the debounce window.
        tokio::time::sleep(Duration::from_secs(1)).await;
        draft.customer_name = "Second Draft".into();
        flow.note_edit(&draft, &cart);

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        let saves = backend.saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].customer_name, "Second Draft");
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_waits_for_name_and_phone() {
        let backend = Arc::new(FakeBackend::default());
        let mut flow = CheckoutFlow::new(Arc::clone(&backend), "sess-1");
        let cart = Cart::new();

        let mut draft = form();
        draft.customer_phone = String::new();
        flow.note_edit(&draft, &cart);

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(backend.saves.lock().unwrap().is_empty());
    }
}
