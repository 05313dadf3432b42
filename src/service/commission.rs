// service/commission.rs
use crate::{
    models::jobmodel::Commission,
    service::error::ServiceError,
    utils::currency::{apply_rate_bps, is_valid_amount},
};

pub const DEFAULT_COMMISSION_RATE_BPS: i64 = 1_000;

/// Split a final price into the platform fee and the provider's share.
///
/// The fee is rounded half-up to the minor unit and the provider gets the
/// remainder, so the two parts always add back to `final_price`.
pub fn compute_commission(final_price: i64, rate_bps: i64) -> Result<Commission, ServiceError> {
    if !is_valid_amount(final_price) {
        return Err(ServiceError::Validation(
            "Final price is out of range".to_string(),
        ));
    }
    if !(0..=10_000).contains(&rate_bps) {
        return Err(ServiceError::Validation(format!(
            "Commission rate {} bps is out of range",
            rate_bps
        )));
    }

    let company_fee = apply_rate_bps(final_price, rate_bps);
    Ok(Commission {
        company_fee,
        provider_earnings: final_price - company_fee,
    })
}
