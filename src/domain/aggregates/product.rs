//! Product catalog entities.
//!
//! Products are admin-owned and read-only from the storefront, so unlike the
//! cart and order aggregates they are plain serialisable records; the only
//! invariant with a mutator is the single-primary-image rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::pricing;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub sku: Option<String>,
    pub stock: u32,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    /// Identifier assigned by the image-hosting collaborator.
    pub host_image_id: String,
    pub position: i32,
    pub is_primary: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: Uuid,
    pub name: String,
    pub values: Vec<String>,
    pub position: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: Uuid,
    pub sku: Option<String>,
    pub price: Option<i64>,
    pub stock: u32,
    pub option_values: BTreeMap<String, String>,
    pub is_available: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub position: i32,
}

impl Product {
    pub fn effective_price(&self) -> i64 {
        pricing::effective_price(self.price, self.sale_price)
    }

    pub fn discount_percent(&self) -> i64 {
        pricing::discount_percent(self.price, self.effective_price())
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// URL shown on cards and carried into cart/order snapshots: the primary
    /// image when one is flagged, else the first by position.
    pub fn primary_image_url(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.iter().min_by_key(|img| img.position))
            .map(|img| img.image_url.as_str())
    }

    /// Flags `image_id` as primary. At most one image may be primary at a
    /// time, so every other flag is cleared first.
    pub fn set_primary_image(&mut self, image_id: Uuid) -> Result<(), ProductError> {
        if !self.images.iter().any(|img| img.id == image_id) {
            return Err(ProductError::ImageNotFound);
        }
        for img in &mut self.images {
            img.is_primary = img.id == image_id;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("image does not belong to this product")]
    ImageNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: Uuid, position: i32, is_primary: bool) -> ProductImage {
        ProductImage {
            id,
            product_id: Uuid::new_v4(),
            image_url: format!("https://img.example/{position}/public"),
            host_image_id: format!("host-{position}"),
            position,
            is_primary,
        }
    }

    fn product_with_images(images: Vec<ProductImage>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Widget".into(),
            slug: "widget".into(),
            description: String::new(),
            price: 1000,
            sale_price: None,
            sku: None,
            stock: 5,
            is_published: true,
            category_id: None,
            images,
            options: vec![],
            variants: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn set_primary_image_clears_previous_primary() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut product =
            product_with_images(vec![image(a, 0, true), image(b, 1, false)]);

        product.set_primary_image(b).unwrap();

        let primaries: Vec<_> = product.images.iter().filter(|i| i.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, b);
    }

    #[test]
    fn set_primary_image_rejects_foreign_image() {
        let mut product = product_with_images(vec![image(Uuid::new_v4(), 0, false)]);
        assert_eq!(
            product.set_primary_image(Uuid::new_v4()),
            Err(ProductError::ImageNotFound)
        );
    }

    #[test]
    fn primary_image_url_falls_back_to_lowest_position() {
        let product =
            product_with_images(vec![image(Uuid::new_v4(), 2, false), image(Uuid::new_v4(), 1, false)]);
        assert_eq!(
            product.primary_image_url(),
            Some("https://img.example/1/public")
        );
    }
}
