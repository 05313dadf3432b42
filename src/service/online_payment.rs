// service/online_payment.rs
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{
    models::jobmodel::*,
    service::{cash_payment::PaymentOutcome, error::ServiceError},
    utils::currency::is_valid_amount,
};

fn online_parts(
    payment: &mut JobPayment,
) -> Result<(&mut PaymentStatus, &mut OnlinePaymentDetails), ServiceError> {
    let JobPayment { status, details } = payment;
    match details {
        PaymentDetails::Online(online) => Ok((status, online)),
        PaymentDetails::Cash(_) => Err(ServiceError::Validation(
            "This job is paid in cash, not online".to_string(),
        )),
    }
}

/// Hex HMAC-SHA256 over `order_id|payment_id`, as issued by the gateway.
pub fn compute_signature(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let expected = compute_signature(order_id, payment_id, secret);
    let provided = signature.trim().to_ascii_lowercase();

    // Compare signatures in constant time to prevent timing attacks
    ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into()
}

/// Remember the gateway order created for this job.
pub fn record_order(
    payment: &mut JobPayment,
    order_id: &str,
    amount: i64,
) -> Result<(), ServiceError> {
    let (status, online) = online_parts(payment)?;
    if !is_valid_amount(amount) {
        return Err(ServiceError::Validation(
            "Amount is out of range".to_string(),
        ));
    }
    if *status == PaymentStatus::Paid {
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "the online payment was already verified".to_string(),
        });
    }

    online.order_id = Some(order_id.to_string());
    online.amount = Some(amount);
    Ok(())
}

/// Record that the manual payment link was handed out because the gateway
/// could not create an order.
pub fn offer_manual_fallback(
    payment: &mut JobPayment,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    let (status, online) = online_parts(payment)?;
    if !is_valid_amount(amount) {
        return Err(ServiceError::Validation(
            "Amount is out of range".to_string(),
        ));
    }
    if *status == PaymentStatus::Paid {
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "the online payment was already verified".to_string(),
        });
    }

    online.amount = Some(amount);
    online.manual_fallback_offered_at.get_or_insert(now);
    Ok(())
}

/// The customer's unverified claim of having paid through the manual link.
/// Lands in `confirmed_manually`, never in `paid`.
pub fn confirm_manual(
    payment: &mut JobPayment,
    now: DateTime<Utc>,
) -> Result<PaymentOutcome, ServiceError> {
    let (status, online) = online_parts(payment)?;

    if status.is_settled() {
        return Ok(PaymentOutcome::AlreadyApplied);
    }
    if online.manual_fallback_offered_at.is_none() {
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "no manual payment link was issued for this job".to_string(),
        });
    }

    online.manual_fallback_used = true;
    online.manual_confirmed_at = Some(now);
    *status = PaymentStatus::ConfirmedManually;
    Ok(PaymentOutcome::Applied)
}

/// The only place online money is declared received. Repeating a verification
/// that already succeeded reports `AlreadyApplied` and touches nothing.
pub fn verify(
    payment: &mut JobPayment,
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<PaymentOutcome, ServiceError> {
    let (status, online) = online_parts(payment)?;

    if order_id.trim().is_empty() || payment_id.trim().is_empty() || signature.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Order id, payment id and signature are required".to_string(),
        ));
    }

    if *status == PaymentStatus::Paid {
        let same_payment = online.order_id.as_deref() == Some(order_id)
            && online.payment_id.as_deref() == Some(payment_id)
            && online.signature.as_deref() == Some(signature);
        if same_payment {
            return Ok(PaymentOutcome::AlreadyApplied);
        }
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "the job was already paid by a different online payment".to_string(),
        });
    }

    match online.order_id.as_deref() {
        Some(expected) if expected == order_id => {}
        Some(_) => {
            return Err(ServiceError::Validation(
                "Order id does not belong to this job".to_string(),
            ))
        }
        None => {
            return Err(ServiceError::InvalidPaymentState {
                status: *status,
                reason: "no online order was created for this job".to_string(),
            })
        }
    }

    if !verify_signature(order_id, payment_id, signature, secret) {
        return Err(ServiceError::SignatureMismatch);
    }

    online.payment_id = Some(payment_id.to_string());
    online.signature = Some(signature.to_string());
    online.verified_at = Some(now);
    *status = PaymentStatus::Paid;
    Ok(PaymentOutcome::Applied)
}
