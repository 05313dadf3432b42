// service/invoice_service.rs
use chrono::{DateTime, Datelike, Utc};

use crate::{
    models::jobmodel::*,
    service::error::ServiceError,
    utils::currency::apply_rate_bps,
};

pub const DEFAULT_TAX_RATE_BPS: i64 = 1_800;

pub fn format_invoice_number(date: DateTime<Utc>, sequence: i64) -> String {
    format!("INV-{}-{:06}", date.year(), sequence)
}

/// Once money is declared received the invoice is final and regeneration
/// hands back the stored copy.
pub fn is_finalized(job: &Job) -> bool {
    job.invoice.is_some() && job.payment.status.is_settled()
}

/// Build the billing document for a completed job. Amounts depend only on
/// the final price and the tax rate.
pub fn build_invoice(
    job: &Job,
    number: String,
    tax_rate_bps: i64,
    date: DateTime<Utc>,
) -> Result<Invoice, ServiceError> {
    if job.status != JobStatus::Completed {
        return Err(ServiceError::JobNotCompleted {
            job_id: job.id,
            status: job.status,
        });
    }
    let subtotal = job.final_price.ok_or_else(|| {
        ServiceError::Storage(format!("Completed job {} has no final price", job.id))
    })?;
    if !(0..=10_000).contains(&tax_rate_bps) {
        return Err(ServiceError::Validation(format!(
            "Tax rate {} bps is out of range",
            tax_rate_bps
        )));
    }

    let tax = apply_rate_bps(subtotal, tax_rate_bps);
    let total = subtotal.checked_add(tax).ok_or_else(|| {
        ServiceError::Validation(format!("Invoice total for job {} overflows", job.id))
    })?;
    let item = InvoiceLineItem {
        description: format!("{} service: {}", job.category.label(), job.description),
        quantity: 1,
        unit_price: subtotal,
        amount: subtotal,
    };

    Ok(Invoice {
        number,
        date,
        items: vec![item],
        subtotal,
        tax_rate_bps,
        tax,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn completed_job(final_price: i64) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            category: ServiceCategory::Painting,
            description: "Paint two bedrooms".to_string(),
            scheduled_for: now,
            budget: Budget { min: 5000, max: 20000 },
            status: JobStatus::Completed,
            status_history: Vec::new(),
            final_price: Some(final_price),
            commission: None,
            payment: JobPayment::new(PaymentMethod::Cash),
            invoice: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn invoice_totals_include_tax() {
        let job = completed_job(15000);
        let invoice = build_invoice(&job, "INV-2026-000001".to_string(), DEFAULT_TAX_RATE_BPS, Utc::now()).unwrap();

        assert_eq!(invoice.subtotal, 15000);
        assert_eq!(invoice.tax, 2700);
        assert_eq!(invoice.total, 17700);
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].description, "Painting service: Paint two bedrooms");
    }

    #[test]
    fn amounts_are_deterministic() {
        let a = build_invoice(&completed_job(12345), "A".to_string(), 1800, Utc::now()).unwrap();
        let b = build_invoice(&completed_job(12345), "B".to_string(), 1800, Utc::now()).unwrap();

        assert_eq!((a.subtotal, a.tax, a.total), (b.subtotal, b.tax, b.total));
        assert_eq!(a.tax, 2222);
    }

    #[test]
    fn only_completed_jobs_are_invoiced() {
        let mut job = completed_job(15000);
        job.status = JobStatus::InProgress;

        let err = build_invoice(&job, "X".to_string(), 1800, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::JobNotCompleted { status: JobStatus::InProgress, .. }));
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let job = completed_job(i64::MAX - 10);

        let err = build_invoice(&job, "X".to_string(), 1800, Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn invoice_numbers_are_zero_padded() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(format_invoice_number(date, 42), "INV-2026-000042");
    }
}
