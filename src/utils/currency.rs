/// Currency utility functions for handling minor-unit conversions
///
/// All monetary values are stored in minor units (1 unit = 100 minor units)
/// to avoid floating-point precision issues. Rates are expressed in basis
/// points (10_000 bps = 100%).

/// Largest amount accepted anywhere, in minor units (10,000,000,000.00).
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;

/// Convert a major-unit amount to minor units (multiply by 100, half-up).
/// Returns `None` for NaN, infinities and anything beyond `MAX_AMOUNT_MINOR`.
pub fn to_minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let minor = (amount * 100.0).round();
    if minor.abs() > MAX_AMOUNT_MINOR as f64 {
        return None;
    }
    Some(minor as i64)
}

/// True for a positive amount no larger than `MAX_AMOUNT_MINOR`.
pub fn is_valid_amount(minor: i64) -> bool {
    (1..=MAX_AMOUNT_MINOR).contains(&minor)
}

/// Convert minor units back to a major-unit amount
pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Format minor units as a currency string with 2 decimal places
pub fn format_minor_units(minor: i64, currency: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{} {}.{:02}", sign, currency, abs / 100, abs % 100)
}

/// Apply a basis-point rate to an amount, rounding half-up to the nearest
/// minor unit.
pub fn apply_rate_bps(amount: i64, rate_bps: i64) -> i64 {
    let product = amount as i128 * rate_bps as i128;
    let rounded = if product >= 0 {
        (product + 5_000) / 10_000
    } else {
        (product - 5_000) / 10_000
    };
    rounded as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(100.0), Some(10000));
        assert_eq!(to_minor_units(0.50), Some(50));
        assert_eq!(to_minor_units(123.45), Some(12345));
        assert_eq!(to_minor_units(0.005), Some(1));
    }

    #[test]
    fn test_to_minor_units_rejects_unrepresentable_amounts() {
        assert_eq!(to_minor_units(f64::NAN), None);
        assert_eq!(to_minor_units(f64::INFINITY), None);
        assert_eq!(to_minor_units(1e17), None);
        assert_eq!(to_minor_units(-1e17), None);
        assert_eq!(to_minor_units(10_000_000_000.0), Some(MAX_AMOUNT_MINOR));
    }

    #[test]
    fn test_is_valid_amount() {
        assert!(is_valid_amount(1));
        assert!(is_valid_amount(MAX_AMOUNT_MINOR));
        assert!(!is_valid_amount(0));
        assert!(!is_valid_amount(-5));
        assert!(!is_valid_amount(i64::MAX));
    }

    #[test]
    fn test_to_major_units() {
        assert_eq!(to_major_units(10000), 100.0);
        assert_eq!(to_major_units(50), 0.50);
        assert_eq!(to_major_units(12345), 123.45);
    }

    #[test]
    fn test_format_minor_units() {
        assert_eq!(format_minor_units(10000, "INR"), "INR 100.00");
        assert_eq!(format_minor_units(5, "INR"), "INR 0.05");
        assert_eq!(format_minor_units(-12345, "INR"), "-INR 123.45");
    }

    #[test]
    fn test_apply_rate_bps() {
        // 10% of 150.00
        assert_eq!(apply_rate_bps(15000, 1000), 1500);
        // 18% of 0.05 = 0.009 -> 0.01
        assert_eq!(apply_rate_bps(5, 1800), 1);
        // 10% of 0.05 = 0.005 -> rounds half-up to 0.01
        assert_eq!(apply_rate_bps(5, 1000), 1);
        // 10% of 0.04 = 0.004 -> 0.00
        assert_eq!(apply_rate_bps(4, 1000), 0);
    }
}
