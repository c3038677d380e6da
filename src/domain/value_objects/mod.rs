//! Value objects shared across the storefront domain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coupon code value object. Codes are case-insensitive; the constructor
/// normalises to uppercase so equality and lookups never depend on what the
/// shopper typed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() {
            return Err(CouponCodeError::Empty);
        }
        if value.len() > 40 {
            return Err(CouponCodeError::TooLong);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponCodeError {
    #[error("coupon code is empty")]
    Empty,
    #[error("coupon code is too long")]
    TooLong,
}

/// Human-shareable order number, generated once when an order is placed and
/// used as the public lookup key for the confirmation view.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate() -> Self {
        Self(format!("ORD-{:08X}", rand::random::<u32>()))
    }

    /// Rehydrates a number that was previously persisted.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_code_uppercases_and_trims() {
        let code = CouponCode::new("  sale20 ").unwrap();
        assert_eq!(code.as_str(), "SALE20");
    }

    #[test]
    fn coupon_code_rejects_empty() {
        assert_eq!(CouponCode::new("   "), Err(CouponCodeError::Empty));
    }

    #[test]
    fn order_number_has_prefix_and_fixed_width() {
        let n = OrderNumber::generate();
        assert!(n.as_str().starts_with("ORD-"));
        assert_eq!(n.as_str().len(), 12);
    }
}
