// service/cash_payment.rs
//
// Two-phase cash confirmation. The professional marks the money as received,
// then the customer either confirms or disputes. Neither side alone can move
// the payment to `paid`.
use chrono::{DateTime, Duration, Utc};

use crate::{
    models::jobmodel::*,
    service::error::ServiceError,
    utils::currency::is_valid_amount,
};

pub const EXPIRED_CONFIRMATION_REASON: &str = "confirmation window expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Applied,
    AlreadyApplied,
}

fn cash_parts(
    payment: &mut JobPayment,
) -> Result<(&mut PaymentStatus, &mut CashPaymentDetails), ServiceError> {
    let JobPayment { status, details } = payment;
    match details {
        PaymentDetails::Cash(cash) => Ok((status, cash)),
        PaymentDetails::Online(_) => Err(ServiceError::Validation(
            "This job is paid online, not in cash".to_string(),
        )),
    }
}

/// Phase 1: the professional declares the cash as received.
pub fn mark_received(
    payment: &mut JobPayment,
    amount: i64,
    collection_method: &str,
    verification_code: String,
    now: DateTime<Utc>,
) -> Result<PaymentOutcome, ServiceError> {
    let (status, cash) = cash_parts(payment)?;

    if !is_valid_amount(amount) {
        return Err(ServiceError::Validation(
            "Amount is out of range".to_string(),
        ));
    }
    if cash.professional_marked_received {
        return Ok(PaymentOutcome::AlreadyApplied);
    }
    let collection_method = collection_method.trim();
    if collection_method.is_empty() {
        return Err(ServiceError::Validation(
            "Collection method is required".to_string(),
        ));
    }

    cash.professional_marked_received = true;
    cash.amount = Some(amount);
    cash.collection_method = Some(collection_method.to_string());
    cash.verification_code = Some(verification_code);
    cash.marked_at = Some(now);
    *status = PaymentStatus::PendingVerification;

    Ok(PaymentOutcome::Applied)
}

/// Phase 2a: the customer confirms. The code is advisory; a mismatch is
/// recorded but does not block confirmation.
pub fn confirm(
    payment: &mut JobPayment,
    code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<PaymentOutcome, ServiceError> {
    let (status, cash) = cash_parts(payment)?;

    if *status == PaymentStatus::Disputed {
        return Err(ServiceError::DisputeOpen);
    }
    if !cash.professional_marked_received {
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "the professional has not marked the cash as received".to_string(),
        });
    }
    if cash.customer_confirmed {
        return Ok(PaymentOutcome::AlreadyApplied);
    }

    let code_matched = code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| cash.verification_code.as_deref() == Some(c));
    if code_matched == Some(false) {
        tracing::warn!("Cash confirmation code did not match; accepting customer confirmation anyway");
    }

    cash.code_matched = code_matched;
    cash.customer_confirmed = true;
    cash.confirmed_at = Some(now);
    *status = PaymentStatus::Paid;

    Ok(PaymentOutcome::Applied)
}

/// Phase 2b: the customer disputes the professional's claim.
pub fn raise_dispute(
    payment: &mut JobPayment,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<PaymentOutcome, ServiceError> {
    let (status, cash) = cash_parts(payment)?;

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ServiceError::Validation(
            "A dispute reason is required".to_string(),
        ));
    }
    if !cash.professional_marked_received {
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "nothing to dispute until the professional marks the cash as received".to_string(),
        });
    }
    if cash.customer_confirmed {
        return Err(ServiceError::InvalidPaymentState {
            status: *status,
            reason: "the payment was already confirmed".to_string(),
        });
    }
    if *status == PaymentStatus::Disputed {
        return Err(ServiceError::DisputeOpen);
    }

    cash.dispute_reason = Some(reason.to_string());
    cash.disputed_at = Some(now);
    *status = PaymentStatus::Disputed;

    Ok(PaymentOutcome::Applied)
}

/// Supplementary evidence; never required by either phase.
pub fn attach_receipt_photo(
    payment: &mut JobPayment,
    photo_url: &str,
) -> Result<PaymentOutcome, ServiceError> {
    let (_, cash) = cash_parts(payment)?;

    let photo_url = photo_url.trim();
    if photo_url.is_empty() {
        return Err(ServiceError::Validation(
            "Receipt photo URL is required".to_string(),
        ));
    }
    if cash.receipt_photos.iter().any(|p| p == photo_url) {
        return Ok(PaymentOutcome::AlreadyApplied);
    }

    cash.receipt_photos.push(photo_url.to_string());
    Ok(PaymentOutcome::Applied)
}

/// Escalates a marked-but-unanswered cash payment into a dispute once the
/// confirmation window has passed. Returns true when the payment changed.
pub fn expire_unconfirmed(payment: &mut JobPayment, window: Duration, now: DateTime<Utc>) -> bool {
    let Ok((status, cash)) = cash_parts(payment) else {
        return false;
    };

    let overdue = matches!(cash.marked_at, Some(marked_at) if marked_at + window <= now);
    if *status != PaymentStatus::PendingVerification
        || !cash.professional_marked_received
        || cash.customer_confirmed
        || !overdue
    {
        return false;
    }

    cash.dispute_reason = Some(EXPIRED_CONFIRMATION_REASON.to_string());
    cash.disputed_at = Some(now);
    *status = PaymentStatus::Disputed;
    true
}

/// Marks an open dispute as having been escalated to both parties. Returns
/// true the first time the dispute passes the window.
pub fn flag_stale_dispute(payment: &mut JobPayment, window: Duration, now: DateTime<Utc>) -> bool {
    let Ok((status, cash)) = cash_parts(payment) else {
        return false;
    };

    let stale = matches!(cash.disputed_at, Some(disputed_at) if disputed_at + window <= now);
    if *status != PaymentStatus::Disputed || cash.escalation_notified_at.is_some() || !stale {
        return false;
    }

    cash.escalation_notified_at = Some(now);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cash_payment() -> JobPayment {
        JobPayment::new(PaymentMethod::Cash)
    }

    fn details(payment: &JobPayment) -> &CashPaymentDetails {
        match &payment.details {
            PaymentDetails::Cash(cash) => cash,
            PaymentDetails::Online(_) => panic!("expected cash details"),
        }
    }

    #[test]
    fn mark_then_confirm_pays() {
        let mut payment = cash_payment();
        let now = Utc::now();

        mark_received(&mut payment, 10000, "cash", "123456".to_string(), now).unwrap();
        assert_eq!(payment.status, PaymentStatus::PendingVerification);

        confirm(&mut payment, Some("123456"), now).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(details(&payment).customer_confirmed);
        assert_eq!(details(&payment).code_matched, Some(true));
    }

    #[test]
    fn confirm_before_mark_is_rejected() {
        let mut payment = cash_payment();

        let err = confirm(&mut payment, None, Utc::now()).unwrap_err();

        assert!(matches!(err, ServiceError::InvalidPaymentState { status: PaymentStatus::Unpaid, .. }));
        assert!(!details(&payment).customer_confirmed);
    }

    #[test]
    fn marking_twice_is_a_no_op() {
        let mut payment = cash_payment();
        let now = Utc::now();
        mark_received(&mut payment, 10000, "cash", "111111".to_string(), now).unwrap();
        let before = payment.clone();

        let outcome = mark_received(&mut payment, 20000, "upi", "222222".to_string(), now).unwrap();

        assert_eq!(outcome, PaymentOutcome::AlreadyApplied);
        assert_eq!(payment, before);
    }

    #[test]
    fn wrong_code_is_advisory() {
        let mut payment = cash_payment();
        let now = Utc::now();
        mark_received(&mut payment, 10000, "cash", "123456".to_string(), now).unwrap();

        confirm(&mut payment, Some("000000"), now).unwrap();

        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(details(&payment).code_matched, Some(false));
    }

    #[test]
    fn dispute_locks_confirmation() {
        let mut payment = cash_payment();
        let now = Utc::now();
        mark_received(&mut payment, 10000, "cash", "123456".to_string(), now).unwrap();

        raise_dispute(&mut payment, "short amount", now).unwrap();
        assert_eq!(payment.status, PaymentStatus::Disputed);
        assert_eq!(details(&payment).dispute_reason.as_deref(), Some("short amount"));
        assert!(!details(&payment).customer_confirmed);

        assert!(matches!(confirm(&mut payment, None, now), Err(ServiceError::DisputeOpen)));
        assert!(matches!(raise_dispute(&mut payment, "again", now), Err(ServiceError::DisputeOpen)));
    }

    #[test]
    fn confirmed_payment_cannot_be_disputed() {
        let mut payment = cash_payment();
        let now = Utc::now();
        mark_received(&mut payment, 10000, "cash", "123456".to_string(), now).unwrap();
        confirm(&mut payment, None, now).unwrap();

        let err = raise_dispute(&mut payment, "changed my mind", now).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPaymentState { .. }));
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    #[test]
    fn online_jobs_reject_cash_operations() {
        let mut payment = JobPayment::new(PaymentMethod::Online);
        let err = mark_received(&mut payment, 100, "cash", "1".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn receipt_photos_are_optional_and_deduplicated() {
        let mut payment = cash_payment();
        let now = Utc::now();

        attach_receipt_photo(&mut payment, "https://cdn.example.com/r1.jpg").unwrap();
        let outcome = attach_receipt_photo(&mut payment, "https://cdn.example.com/r1.jpg").unwrap();
        assert_eq!(outcome, PaymentOutcome::AlreadyApplied);
        assert_eq!(details(&payment).receipt_photos.len(), 1);

        let mut without_photo = cash_payment();
        mark_received(&mut without_photo, 500, "cash", "1".to_string(), now).unwrap();
        confirm(&mut without_photo, None, now).unwrap();
        assert_eq!(without_photo.status, PaymentStatus::Paid);
    }

    #[test]
    fn overdue_confirmation_escalates_to_dispute() {
        let mut payment = cash_payment();
        let marked_at = Utc::now() - Duration::days(20);
        mark_received(&mut payment, 10000, "cash", "123456".to_string(), marked_at).unwrap();

        assert!(!expire_unconfirmed(&mut payment, Duration::days(30), Utc::now()));
        assert!(expire_unconfirmed(&mut payment, Duration::days(14), Utc::now()));

        assert_eq!(payment.status, PaymentStatus::Disputed);
        assert_eq!(
            details(&payment).dispute_reason.as_deref(),
            Some(EXPIRED_CONFIRMATION_REASON)
        );
        assert!(!details(&payment).customer_confirmed);
    }

    #[test]
    fn stale_dispute_is_flagged_once() {
        let mut payment = cash_payment();
        let then = Utc::now() - Duration::days(20);
        mark_received(&mut payment, 10000, "cash", "123456".to_string(), then).unwrap();
        raise_dispute(&mut payment, "short amount", then).unwrap();

        assert!(flag_stale_dispute(&mut payment, Duration::days(14), Utc::now()));
        assert!(!flag_stale_dispute(&mut payment, Duration::days(14), Utc::now()));
    }

    #[derive(Debug, Clone)]
    enum CashCall {
        Mark(i64),
        Confirm(Option<String>),
        Dispute(String),
        Receipt,
    }

    fn arb_call() -> impl Strategy<Value = CashCall> {
        prop_oneof![
            (-10i64..100_000).prop_map(CashCall::Mark),
            prop::option::of("[0-9]{6}").prop_map(CashCall::Confirm),
            "[a-z ]{0,12}".prop_map(CashCall::Dispute),
            Just(CashCall::Receipt),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn prop_confirmation_requires_prior_mark(calls in prop::collection::vec(arb_call(), 0..10)) {
            let mut payment = cash_payment();
            let now = Utc::now();

            for call in calls {
                let marked_before = details(&payment).professional_marked_received;
                let confirmed_before = details(&payment).customer_confirmed;

                let result = match &call {
                    CashCall::Mark(amount) => mark_received(&mut payment, *amount, "cash", "123456".to_string(), now),
                    CashCall::Confirm(code) => confirm(&mut payment, code.as_deref(), now),
                    CashCall::Dispute(reason) => raise_dispute(&mut payment, reason, now),
                    CashCall::Receipt => attach_receipt_photo(&mut payment, "https://cdn.example.com/r.jpg"),
                };

                if let CashCall::Confirm(_) = call {
                    if result.is_ok() {
                        prop_assert!(marked_before);
                    }
                }

                let cash = details(&payment);
                if cash.customer_confirmed {
                    prop_assert!(cash.professional_marked_received);
                    if !confirmed_before {
                        prop_assert!(marked_before);
                    }
                }
                if payment.status == PaymentStatus::Paid {
                    prop_assert!(cash.professional_marked_received && cash.customer_confirmed);
                }
                if payment.status == PaymentStatus::Disputed {
                    prop_assert!(!cash.customer_confirmed);
                }
            }
        }
    }
}
