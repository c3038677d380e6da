//! Wilaya shipping-rate table and cost resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Office,
    Home,
}

impl DeliveryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Home => "home",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "office" => Ok(Self::Office),
            "home" => Ok(Self::Home),
            other => Err(format!("unknown delivery method \"{other}\"")),
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per wilaya with a price for each delivery method.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: Uuid,
    pub wilaya_code: String,
    pub wilaya_name: String,
    pub office_price: i64,
    pub home_price: i64,
    pub is_active: bool,
}

impl ShippingRate {
    pub fn price_for(&self, method: DeliveryMethod) -> i64 {
        match method {
            DeliveryMethod::Office => self.office_price,
            DeliveryMethod::Home => self.home_price,
        }
    }
}

/// Looks up the shipping cost for a wilaya and delivery method. `None` means
/// no active rate covers the wilaya: callers must treat that as "cannot
/// compute a total yet" and block order submission, never as free shipping.
pub fn resolve_shipping_cost(
    rates: &[ShippingRate],
    wilaya_code: &str,
    method: DeliveryMethod,
) -> Option<i64> {
    rates
        .iter()
        .find(|r| r.is_active && r.wilaya_code == wilaya_code)
        .map(|r| r.price_for(method))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(code: &str, office: i64, home: i64, active: bool) -> ShippingRate {
        ShippingRate {
            id: Uuid::new_v4(),
            wilaya_code: code.into(),
            wilaya_name: format!("Wilaya {code}"),
            office_price: office,
            home_price: home,
            is_active: active,
        }
    }

    #[test]
    fn resolves_price_per_method() {
        let rates = vec![rate("16", 400, 600, true), rate("31", 450, 700, true)];
        assert_eq!(resolve_shipping_cost(&rates, "16", DeliveryMethod::Home), Some(600));
        assert_eq!(resolve_shipping_cost(&rates, "16", DeliveryMethod::Office), Some(400));
    }

    #[test]
    fn unknown_wilaya_is_unresolved() {
        let rates = vec![rate("16", 400, 600, true)];
        assert_eq!(resolve_shipping_cost(&rates, "99", DeliveryMethod::Home), None);
    }

    #[test]
    fn inactive_rate_is_unresolved() {
        let rates = vec![rate("16", 400, 600, false)];
        assert_eq!(resolve_shipping_cost(&rates, "16", DeliveryMethod::Home), None);
    }
}
