//! Structural validation for the checkout form.
//!
//! These rules are client-detectable and are checked before any network
//! call; failures are reported per field and never reach the backend.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

use crate::shipping::DeliveryMethod;

/// Algerian mobile numbers: 05/06/07 followed by eight digits.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[567][0-9]{8}$").expect("phone pattern is valid"));

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct CheckoutForm {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters."))]
    pub customer_name: String,

    #[validate(regex(
        path = "PHONE_RE",
        message = "Phone number must look like 0551234567."
    ))]
    pub customer_phone: String,

    #[validate(length(min = 1, message = "Please select a wilaya."))]
    pub wilaya_code: String,

    #[validate(length(
        min = 10,
        max = 500,
        message = "Address must be between 10 and 500 characters."
    ))]
    pub address: String,

    #[serde(default)]
    pub delivery_method: DeliveryMethod,

    #[validate(length(max = 500, message = "Note is too long."))]
    pub note: Option<String>,

    pub coupon_code: Option<String>,
}

/// Flattens `validator`'s nested error tree into one message per field,
/// keeping the first message for each.
pub fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (field, issues) in errors.field_errors() {
        if let Some(first) = issues.first() {
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {field}."));
            out.entry(field.to_string()).or_insert(message);
        }
    }
    out
}

pub fn validate_checkout_form(form: &CheckoutForm) -> Result<(), BTreeMap<String, String>> {
    form.validate().map_err(|e| field_errors(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> CheckoutForm {
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

    #[test]
    fn valid_form_passes() {
        assert!(validate_checkout_form(&valid_form()).is_ok());
    }

    #[test]
    fn short_name_is_reported_per_field() {
        let mut form = valid_form();
        form.customer_name = "Ab".into();
        let errors = validate_checkout_form(&form).unwrap_err();
        assert!(errors.contains_key("customer_name"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn phone_pattern_is_enforced() {
        let mut form = valid_form();
        for bad in ["0451234567", "551234567", "05512345", "06512345678", "phone"] {
            form.customer_phone = bad.into();
            assert!(
                validate_checkout_form(&form).is_err(),
                "expected rejection for {bad}"
            );
        }
        for good in ["0551234567", "0661234567", "0771234567"] {
            form.customer_phone = good.into();
            assert!(
                validate_checkout_form(&form).is_ok(),
                "expected acceptance for {good}"
            );
        }
    }

    #[test]
    fn missing_wilaya_and_short_address_both_reported() {
        let mut form = valid_form();
        form.wilaya_code = String::new();
        form.address = "short".into();
        let errors = validate_checkout_form(&form).unwrap_err();
        assert!(errors.contains_key("wilaya_code"));
        assert!(errors.contains_key("address"));
    }

    #[test]
    fn long_note_is_rejected() {
        let mut form = valid_form();
        form.note = Some("x".repeat(501));
        assert!(validate_checkout_form(&form).is_err());
    }
}
