use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    models::jobmodel::*,
    utils::currency::{to_major_units, to_minor_units},
};

// Request amounts are major units (e.g. 150.50); everything is stored in
// minor units.

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_budget_range"))]
pub struct CreateJobDto {
    pub professional_id: Uuid,

    pub category: ServiceCategory,

    #[validate(length(min = 5, max = 1000, message = "Description must be between 5 and 1000 characters"))]
    pub description: String,

    pub scheduled_for: DateTime<Utc>,

    #[validate(range(min = 0.01, max = 10000000000.0, message = "Minimum budget must be between 0.01 and 10000000000"))]
    pub budget_min: f64,

    #[validate(range(min = 0.01, max = 10000000000.0, message = "Maximum budget must be between 0.01 and 10000000000"))]
    pub budget_max: f64,

    pub payment_method: PaymentMethod,
}

fn validate_budget_range(dto: &CreateJobDto) -> Result<(), ValidationError> {
    if dto.budget_max < dto.budget_min {
        let mut error = ValidationError::new("invalid_budget");
        error.message = Some("Maximum budget cannot be lower than the minimum".into());
        return Err(error);
    }
    Ok(())
}

impl CreateJobDto {
    /// `None` when a budget bound has no minor-unit representation.
    pub fn into_new_job(self) -> Option<NewJob> {
        Some(NewJob {
            professional_id: self.professional_id,
            category: self.category,
            description: self.description,
            scheduled_for: self.scheduled_for,
            budget: Budget {
                min: to_minor_units(self.budget_min)?,
                max: to_minor_units(self.budget_max)?,
            },
            payment_method: self.payment_method,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteJobDto {
    #[validate(range(min = 0.01, max = 10000000000.0, message = "Final price must be between 0.01 and 10000000000"))]
    pub final_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CancelJobDto {
    #[validate(length(max = 500, message = "Reason cannot exceed 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOnlineOrderDto {
    #[validate(range(min = 0.01, max = 10000000000.0, message = "Amount must be between 0.01 and 10000000000"))]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyOnlinePaymentDto {
    #[validate(length(min = 1, message = "Order id is required"))]
    pub order_id: String,

    #[validate(length(min = 1, message = "Payment id is required"))]
    pub payment_id: String,

    #[validate(length(min = 1, message = "Signature is required"))]
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MarkCashReceivedDto {
    #[validate(range(min = 0.01, max = 10000000000.0, message = "Amount must be between 0.01 and 10000000000"))]
    pub amount: f64,

    #[validate(length(min = 1, max = 50, message = "Collection method must be between 1 and 50 characters"))]
    pub method: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ConfirmCashPaymentDto {
    #[validate(length(max = 12, message = "Verification code is too long"))]
    pub verification_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RaiseDisputeDto {
    #[validate(length(min = 3, max = 1000, message = "Reason must be between 3 and 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptPhotoDto {
    #[validate(url(message = "Invalid receipt photo URL"))]
    pub photo_url: String,
}

/// Money fields of a job in major units, for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobAmountsDto {
    pub budget_min: f64,
    pub budget_max: f64,
    pub final_price: Option<f64>,
    pub company_fee: Option<f64>,
    pub provider_earnings: Option<f64>,
    pub invoice_total: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResponseDto {
    #[serde(flatten)]
    pub job: Job,
    pub amounts: JobAmountsDto,
}

impl JobResponseDto {
    /// The cash verification code is the professional's to hand over in
    /// person, so a customer's view never carries it.
    pub fn for_viewer(mut job: Job, viewer: &Actor) -> Self {
        if viewer.role == ActorRole::Customer {
            if let PaymentDetails::Cash(cash) = &mut job.payment.details {
                cash.verification_code = None;
            }
        }

        let amounts = JobAmountsDto {
            budget_min: to_major_units(job.budget.min),
            budget_max: to_major_units(job.budget.max),
            final_price: job.final_price.map(to_major_units),
            company_fee: job.commission.map(|c| to_major_units(c.company_fee)),
            provider_earnings: job.commission.map(|c| to_major_units(c.provider_earnings)),
            invoice_total: job.invoice.as_ref().map(|i| to_major_units(i.total)),
        };

        Self { job, amounts }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }
    }
}
