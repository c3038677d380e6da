//! Postgres access layer.
//!
//! One thin struct over the pool; every query narrows its rows through the
//! types in [`rows`] before anything reaches business logic.

pub mod rows;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::analytics::{ItemSale, OrderSummary};
use crate::checkout::{AbandonedCart, CheckoutBackend};
use crate::coupon::Coupon;
use crate::domain::aggregates::order::{Order, OrderStatus};
use crate::domain::aggregates::product::{Category, Product, ProductImage};
use crate::domain::value_objects::CouponCode;
use crate::images::HostedImage;
use crate::shipping::ShippingRate;
use crate::upsell::{DisplayLocation, UpsellRule};

use rows::{
    AdminProfile, CategoryRow, CouponRow, ItemSaleRow, OrderItemRow, OrderRow, OrderStatRow,
    ProductImageRow, ProductOptionRow, ProductRow, ProductVariantRow, ShippingRateRow,
    UpsellRuleRow,
};

#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---- catalog -----------------------------------------------------------

    pub async fn list_published_products(
        &self,
        page: u32,
        per_page: u32,
    ) -> crate::Result<(Vec<Product>, i64)> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE is_published = TRUE ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_published = TRUE")
                .fetch_one(&self.pool)
                .await?;

        let products = rows.into_iter().map(ProductRow::into_product).collect();
        let products = self.attach_images(products).await?;
        Ok((products, total))
    }

    pub async fn find_product_by_slug(&self, slug: &str) -> crate::Result<Option<Product>> {
        let Some(row) =
            sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };
        let mut product = row.into_product();

        let images = sqlx::query_as::<_, ProductImageRow>(
            "SELECT * FROM product_images WHERE product_id = $1 ORDER BY position",
        )
        .bind(product.id)
        .fetch_all(&self.pool)
        .await?;
        product.images = images.into_iter().map(Into::into).collect();

        let options = sqlx::query_as::<_, ProductOptionRow>(
            "SELECT * FROM product_options WHERE product_id = $1 ORDER BY position",
        )
        .bind(product.id)
        .fetch_all(&self.pool)
        .await?;
        product.options = options.into_iter().map(Into::into).collect();

        let variants = sqlx::query_as::<_, ProductVariantRow>(
            "SELECT * FROM product_variants WHERE product_id = $1",
        )
        .bind(product.id)
        .fetch_all(&self.pool)
        .await?;
        product.variants = variants
            .into_iter()
            .map(ProductVariantRow::into_variant)
            .collect::<crate::Result<_>>()?;

        Ok(Some(product))
    }

    /// Published products by id, images attached. Used to resolve upsell
    /// targets and to re-price checkout lines from the catalog.
    pub async fn products_by_ids(&self, ids: &[Uuid]) -> crate::Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE is_published = TRUE AND id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let products = rows.into_iter().map(ProductRow::into_product).collect();
        self.attach_images(products).await
    }

    pub async fn list_categories(&self) -> crate::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT * FROM categories ORDER BY position, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn attach_images(&self, mut products: Vec<Product>) -> crate::Result<Vec<Product>> {
        if products.is_empty() {
            return Ok(products);
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let image_rows = sqlx::query_as::<_, ProductImageRow>(
            "SELECT * FROM product_images WHERE product_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
        for row in image_rows {
            by_product
                .entry(row.product_id)
                .or_default()
                .push(row.into());
        }
        for product in &mut products {
            if let Some(images) = by_product.remove(&product.id) {
                product.images = images;
            }
        }
        Ok(products)
    }

    // ---- upsell ------------------------------------------------------------

    pub async fn active_upsell_rules(
        &self,
        location: DisplayLocation,
    ) -> crate::Result<Vec<UpsellRule>> {
        let rows = sqlx::query_as::<_, UpsellRuleRow>(
            "SELECT * FROM upsell_rules WHERE is_active = TRUE AND display_location = $1 ORDER BY priority",
        )
        .bind(location.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UpsellRuleRow::into_rule).collect()
    }

    pub async fn find_upsell_rule(&self, id: Uuid) -> crate::Result<Option<UpsellRule>> {
        let row = sqlx::query_as::<_, UpsellRuleRow>("SELECT * FROM upsell_rules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UpsellRuleRow::into_rule).transpose()
    }

    // ---- orders ------------------------------------------------------------

    pub async fn list_orders(
        &self,
        page: u32,
        per_page: u32,
    ) -> crate::Result<(Vec<Order>, i64)> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<_>> = HashMap::new();
        if !ids.is_empty() {
            let item_rows = sqlx::query_as::<_, OrderItemRow>(
                "SELECT * FROM order_items WHERE order_id = ANY($1)",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
            for row in item_rows {
                let order_id = row.order_id;
                items_by_order
                    .entry(order_id)
                    .or_default()
                    .push(row.into_item()?);
            }
        }

        let orders = rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok((orders, total))
    }

    pub async fn find_order(&self, id: Uuid) -> crate::Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.hydrate_order(row).await
    }

    pub async fn find_order_by_number(&self, order_number: &str) -> crate::Result<Option<Order>> {
        let row =
            sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_number = $1")
                .bind(order_number)
                .fetch_optional(&self.pool)
                .await?;
        self.hydrate_order(row).await
    }

    async fn hydrate_order(&self, row: Option<OrderRow>) -> crate::Result<Option<Order>> {
        let Some(row) = row else { return Ok(None) };
        let item_rows =
            sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await?;
        let items = item_rows
            .into_iter()
            .map(OrderItemRow::into_item)
            .collect::<crate::Result<Vec<_>>>()?;
        row.into_order(items).map(Some)
    }

    /// Writes back an admin status transition performed on the aggregate.
    /// Concurrent admin edits are last-write-wins, matching the persistence
    /// guarantees everywhere else.
    pub async fn persist_order_status(&self, order: &Order) -> crate::Result<()> {
        sqlx::query(
            "UPDATE orders SET status = $2, status_history = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order.id())
        .bind(order.status().as_str())
        .bind(serde_json::to_value(order.status_history())?)
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- analytics ---------------------------------------------------------

    pub async fn orders_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> crate::Result<Vec<OrderSummary>> {
        let rows = sqlx::query_as::<_, OrderStatRow>(
            "SELECT total, status, wilaya_code, wilaya_name, created_at FROM orders WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let status: OrderStatus =
                    row.status
                        .parse()
                        .map_err(|e: String| crate::StorefrontError::InvalidRow {
                            table: "orders",
                            id: row.created_at.to_rfc3339(),
                            reason: e,
                        })?;
                Ok(OrderSummary {
                    total: row.total,
                    status,
                    wilaya_code: row.wilaya_code,
                    wilaya_name: row.wilaya_name,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    pub async fn item_sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> crate::Result<Vec<ItemSale>> {
        let rows = sqlx::query_as::<_, ItemSaleRow>(
            "SELECT oi.product_id, oi.product_name, oi.quantity, oi.unit_price \
             FROM order_items oi JOIN orders o ON o.id = oi.order_id \
             WHERE o.created_at >= $1 AND o.created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ItemSale {
                product_id: row.product_id,
                product_name: row.product_name,
                quantity: row.quantity.max(0) as u32,
                unit_price: row.unit_price,
            })
            .collect())
    }

    // ---- admin / images ----------------------------------------------------

    pub async fn find_admin(&self, user_id: Uuid) -> crate::Result<Option<AdminProfile>> {
        let profile = sqlx::query_as::<_, AdminProfile>(
            "SELECT * FROM admin_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn product_exists(&self, id: Uuid) -> crate::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Stores an uploaded image at the next position. When `is_primary`,
    /// every other primary flag for the product is cleared first, inside the
    /// same transaction, so at most one image is ever primary.
    pub async fn insert_product_image(
        &self,
        product_id: Uuid,
        hosted: &HostedImage,
        is_primary: bool,
    ) -> crate::Result<ProductImage> {
        let mut tx = self.pool.begin().await?;
        if is_primary {
            sqlx::query("UPDATE product_images SET is_primary = FALSE WHERE product_id = $1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }
        let position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM product_images WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;
        let row = sqlx::query_as::<_, ProductImageRow>(
            "INSERT INTO product_images (id, product_id, image_url, host_image_id, position, is_primary) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(&hosted.url)
        .bind(&hosted.id)
        .bind(position)
        .bind(is_primary)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }
}

#[async_trait]
impl CheckoutBackend for PgBackend {
    async fn active_shipping_rates(&self) -> crate::Result<Vec<ShippingRate>> {
        let rows = sqlx::query_as::<_, ShippingRateRow>(
            "SELECT * FROM shipping_rates WHERE is_active = TRUE ORDER BY wilaya_code",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_coupon(&self, code: &CouponCode) -> crate::Result<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(CouponRow::into_coupon).transpose()
    }

    async fn place_order(
        &self,
        order: &Order,
        coupon_used: Option<&CouponCode>,
    ) -> crate::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, order_number, customer_name, customer_phone, wilaya_code, wilaya_name, \
             address, delivery_method, note, subtotal, shipping, discount, total, coupon_code, status, \
             status_history, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(order.id())
        .bind(order.order_number().as_str())
        .bind(&order.customer().name)
        .bind(&order.customer().phone)
        .bind(&order.customer().wilaya_code)
        .bind(&order.customer().wilaya_name)
        .bind(&order.customer().address)
        .bind(order.customer().delivery_method.as_str())
        .bind(order.customer().note.as_deref())
        .bind(order.subtotal())
        .bind(order.shipping())
        .bind(order.discount())
        .bind(order.total())
        .bind(order.coupon_code().map(|c| c.as_str()))
        .bind(order.status().as_str())
        .bind(serde_json::to_value(order.status_history())?)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        for item in order.items() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, product_image, \
                 variant_id, selected_options, quantity, unit_price, total) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(Uuid::new_v4())
            .bind(order.id())
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.product_image.as_deref())
            .bind(item.variant_id)
            .bind(serde_json::to_value(&item.selected_options)?)
            .bind(item.quantity as i32)
            .bind(item.unit_price)
            .bind(item.total)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(code) = coupon_used {
            sqlx::query("UPDATE coupons SET used_count = used_count + 1 WHERE code = $1")
                .bind(code.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_abandoned_cart(&self, snapshot: &AbandonedCart) -> crate::Result<()> {
        sqlx::query(
            "INSERT INTO abandoned_carts (session_id, customer_name, customer_phone, wilaya_code, \
             address, items, subtotal, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             ON CONFLICT (session_id) DO UPDATE SET \
             customer_name = EXCLUDED.customer_name, customer_phone = EXCLUDED.customer_phone, \
             wilaya_code = EXCLUDED.wilaya_code, address = EXCLUDED.address, \
             items = EXCLUDED.items, subtotal = EXCLUDED.subtotal, updated_at = NOW()",
        )
        .bind(&snapshot.session_id)
        .bind(&snapshot.customer_name)
        .bind(&snapshot.customer_phone)
        .bind(snapshot.wilaya_code.as_deref())
        .bind(snapshot.address.as_deref())
        .bind(serde_json::to_value(&snapshot.items)?)
        .bind(snapshot.subtotal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_abandoned_cart(&self, session_id: &str) -> crate::Result<()> {
        sqlx::query("DELETE FROM abandoned_carts WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
