//! Coupon records and the applicability check run at checkout time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::CouponCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    Percent,
    Fixed,
}

impl CouponKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "percent" => Ok(Self::Percent),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown coupon kind \"{other}\"")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: CouponCode,
    pub kind: CouponKind,
    pub value: i64,
    pub min_order: Option<i64>,
    pub max_uses: Option<u32>,
    pub used_count: u32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Why a coupon did not apply. These are business-rule rejections, not
/// errors: the affected action is simply not performed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CouponRejection {
    NotFound,
    Inactive,
    BelowMinOrder { min_order: i64 },
    UsageExhausted,
    NotYetStarted,
    Expired,
}

impl CouponRejection {
    /// Shopper-facing message; internal detail stays in the logs.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound => "This coupon code is not valid.".to_owned(),
            Self::Inactive => "This coupon is no longer active.".to_owned(),
            Self::BelowMinOrder { min_order } => {
                format!("This coupon requires a minimum order of {min_order} DZD.")
            }
            Self::UsageExhausted => "This coupon has reached its usage limit.".to_owned(),
            Self::NotYetStarted => "This coupon is not active yet.".to_owned(),
            Self::Expired => "This coupon has expired.".to_owned(),
        }
    }
}

/// Decides applicability against the *live* subtotal and clock and computes
/// the discount. Must be re-run at submit time even if the shopper applied
/// the code earlier in the session: time, usage count and subtotal may all
/// have moved.
///
/// The validity window is inclusive on both ends: a coupon whose `ends_at`
/// equals `now` still applies.
pub fn validate_coupon(
    coupon: &Coupon,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<i64, CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if let Some(min_order) = coupon.min_order {
        if subtotal < min_order {
            return Err(CouponRejection::BelowMinOrder { min_order });
        }
    }
    if let Some(max_uses) = coupon.max_uses {
        if coupon.used_count >= max_uses {
            return Err(CouponRejection::UsageExhausted);
        }
    }
    if let Some(starts_at) = coupon.starts_at {
        if now < starts_at {
            return Err(CouponRejection::NotYetStarted);
        }
    }
    if let Some(ends_at) = coupon.ends_at {
        if now > ends_at {
            return Err(CouponRejection::Expired);
        }
    }

    let raw = match coupon.kind {
        // Integer division floors for the non-negative amounts we deal in.
        CouponKind::Percent => subtotal * coupon.value / 100,
        CouponKind::Fixed => coupon.value,
    };
    Ok(raw.clamp(0, subtotal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: CouponKind, value: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: CouponCode::new("SALE20").unwrap(),
            kind,
            value,
            min_order: None,
            max_uses: None,
            used_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn percent_coupon_with_min_order_applies() {
        // type=percent, value=20, min_order=1000 against subtotal 2400
        let mut c = coupon(CouponKind::Percent, 20);
        c.min_order = Some(1000);
        assert_eq!(validate_coupon(&c, 2400, Utc::now()), Ok(480));
    }

    #[test]
    fn percent_coupon_below_min_order_is_rejected() {
        let mut c = coupon(CouponKind::Percent, 20);
        c.min_order = Some(1000);
        assert_eq!(
            validate_coupon(&c, 900, Utc::now()),
            Err(CouponRejection::BelowMinOrder { min_order: 1000 })
        );
    }

    #[test]
    fn percent_discount_floors() {
        let c = coupon(CouponKind::Percent, 33);
        // 999 * 33 / 100 = 329.67 → 329
        assert_eq!(validate_coupon(&c, 999, Utc::now()), Ok(329));
    }

    #[test]
    fn discount_never_exceeds_subtotal() {
        let over_percent = coupon(CouponKind::Percent, 150);
        assert_eq!(validate_coupon(&over_percent, 1000, Utc::now()), Ok(1000));

        let big_fixed = coupon(CouponKind::Fixed, 5000);
        assert_eq!(validate_coupon(&big_fixed, 1200, Utc::now()), Ok(1200));
    }

    #[test]
    fn discount_is_never_negative() {
        let c = coupon(CouponKind::Fixed, 500);
        assert_eq!(validate_coupon(&c, 0, Utc::now()), Ok(0));
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let mut c = coupon(CouponKind::Fixed, 100);
        c.is_active = false;
        assert_eq!(
            validate_coupon(&c, 1000, Utc::now()),
            Err(CouponRejection::Inactive)
        );
    }

    #[test]
    fn usage_cap_is_enforced() {
        let mut c = coupon(CouponKind::Fixed, 100);
        c.max_uses = Some(5);
        c.used_count = 5;
        assert_eq!(
            validate_coupon(&c, 1000, Utc::now()),
            Err(CouponRejection::UsageExhausted)
        );

        c.used_count = 4;
        assert_eq!(validate_coupon(&c, 1000, Utc::now()), Ok(100));
    }

    #[test]
    fn start_date_boundary_is_inclusive() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Fixed, 100);
        c.starts_at = Some(now);
        assert_eq!(validate_coupon(&c, 1000, now), Ok(100));

        c.starts_at = Some(now + Duration::seconds(1));
        assert_eq!(
            validate_coupon(&c, 1000, now),
            Err(CouponRejection::NotYetStarted)
        );
    }

    #[test]
    fn end_date_boundary_is_inclusive() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Fixed, 100);

        // ends_at == now: still applicable
        c.ends_at = Some(now);
        assert_eq!(validate_coupon(&c, 1000, now), Ok(100));

        // one tick past: expired
        c.ends_at = Some(now - Duration::seconds(1));
        assert_eq!(validate_coupon(&c, 1000, now), Err(CouponRejection::Expired));
    }
}
