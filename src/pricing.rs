//! Price arithmetic shared by the cart, coupon, upsell and checkout paths.
//!
//! All amounts are whole dinars carried as `i64`; there are no sub-unit
//! prices anywhere in the system.

/// Price a buyer actually pays per unit: the sale price when one is set and
/// strictly below the list price, otherwise the list price.
pub fn effective_price(list_price: i64, sale_price: Option<i64>) -> i64 {
    match sale_price {
        Some(sale) if sale < list_price => sale,
        _ => list_price,
    }
}

/// Rounded percentage knocked off the list price, for "-20%" badges.
/// Returns 0 when there is no discount or the list price is 0.
pub fn discount_percent(list_price: i64, effective: i64) -> i64 {
    if list_price <= 0 || effective >= list_price {
        return 0;
    }
    let diff = list_price - effective;
    (diff * 100 + list_price / 2) / list_price
}

pub fn line_total(effective: i64, quantity: u32) -> i64 {
    effective * i64::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_prefers_lower_sale_price() {
        assert_eq!(effective_price(1000, Some(800)), 800);
    }

    #[test]
    fn effective_price_ignores_sale_at_or_above_list() {
        assert_eq!(effective_price(1000, Some(1000)), 1000);
        assert_eq!(effective_price(1000, Some(1200)), 1000);
        assert_eq!(effective_price(1000, None), 1000);
    }

    #[test]
    fn discount_percent_rounds() {
        assert_eq!(discount_percent(1000, 800), 20);
        assert_eq!(discount_percent(3000, 2000), 33);
        assert_eq!(discount_percent(1000, 1000), 0);
        assert_eq!(discount_percent(0, 0), 0);
    }

    #[test]
    fn line_total_multiplies_by_quantity() {
        assert_eq!(line_total(800, 3), 2400);
    }
}
