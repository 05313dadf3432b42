use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Plumbing,
    Electrical,
    Carpentry,
    Painting,
    Cleaning,
    ApplianceRepair,
    PestControl,
    Gardening,
    Handyman,
    Other,
}

impl ServiceCategory {
    pub fn to_str(&self) -> &str {
        match self {
            ServiceCategory::Plumbing => "plumbing",
            ServiceCategory::Electrical => "electrical",
            ServiceCategory::Carpentry => "carpentry",
            ServiceCategory::Painting => "painting",
            ServiceCategory::Cleaning => "cleaning",
            ServiceCategory::ApplianceRepair => "appliance_repair",
            ServiceCategory::PestControl => "pest_control",
            ServiceCategory::Gardening => "gardening",
            ServiceCategory::Handyman => "handyman",
            ServiceCategory::Other => "other",
        }
    }

    /// Human readable label used on invoices.
    pub fn label(&self) -> &str {
        match self {
            ServiceCategory::Plumbing => "Plumbing",
            ServiceCategory::Electrical => "Electrical",
            ServiceCategory::Carpentry => "Carpentry",
            ServiceCategory::Painting => "Painting",
            ServiceCategory::Cleaning => "Cleaning",
            ServiceCategory::ApplianceRepair => "Appliance repair",
            ServiceCategory::PestControl => "Pest control",
            ServiceCategory::Gardening => "Gardening",
            ServiceCategory::Handyman => "Handyman",
            ServiceCategory::Other => "Home service",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn to_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Accepted => "accepted",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Professional,
}

impl ActorRole {
    pub fn to_str(&self) -> &str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Professional => "professional",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "customer" => Some(ActorRole::Customer),
            "professional" => Some(ActorRole::Professional),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// The caller of an operation, as asserted by the upstream gateway.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn customer(id: Uuid) -> Self {
        Self { id, role: ActorRole::Customer }
    }

    pub fn professional(id: Uuid) -> Self {
        Self { id, role: ActorRole::Professional }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StatusHistoryEntry {
    pub status: JobStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Uuid,
    pub changed_by_role: ActorRole,
    pub notes: Option<String>,
}

/// Budget range in minor units.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Commission {
    pub company_fee: i64,
    pub provider_earnings: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Online,
}

impl PaymentMethod {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PendingVerification,
    Disputed,
    ConfirmedManually,
    Paid,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PendingVerification => "pending_verification",
            PaymentStatus::Disputed => "disputed",
            PaymentStatus::ConfirmedManually => "confirmed_manually",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Money has been declared received, either with proof (`Paid`) or by
    /// the weaker manual confirmation.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::ConfirmedManually)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CashPaymentDetails {
    pub verification_code: Option<String>,
    pub professional_marked_received: bool,
    pub customer_confirmed: bool,
    pub amount: Option<i64>,
    pub collection_method: Option<String>,
    pub receipt_photos: Vec<String>,
    pub dispute_reason: Option<String>,
    pub code_matched: Option<bool>,
    pub marked_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub escalation_notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct OnlinePaymentDetails {
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount: Option<i64>,
    pub verified_at: Option<DateTime<Utc>>,
    pub manual_fallback_used: bool,
    pub manual_fallback_offered_at: Option<DateTime<Utc>>,
    pub manual_confirmed_at: Option<DateTime<Utc>>,
}

/// Method-specific payment evidence. A cash job can never carry online
/// fields and vice versa.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Cash(CashPaymentDetails),
    Online(OnlinePaymentDetails),
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Cash(_) => PaymentMethod::Cash,
            PaymentDetails::Online(_) => PaymentMethod::Online,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JobPayment {
    pub status: PaymentStatus,
    pub details: PaymentDetails,
}

impl JobPayment {
    pub fn new(method: PaymentMethod) -> Self {
        let details = match method {
            PaymentMethod::Cash => PaymentDetails::Cash(CashPaymentDetails::default()),
            PaymentMethod::Online => PaymentDetails::Online(OnlinePaymentDetails::default()),
        };

        Self {
            status: PaymentStatus::Unpaid,
            details,
        }
    }

    pub fn method(&self) -> PaymentMethod {
        self.details.method()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub number: String,
    pub date: DateTime<Utc>,
    pub items: Vec<InvoiceLineItem>,
    pub subtotal: i64,
    pub tax_rate_bps: i64,
    pub tax: i64,
    pub total: i64,
}

/// Everything a customer supplies when booking a professional.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub professional_id: Uuid,
    pub category: ServiceCategory,
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    pub budget: Budget,
    pub payment_method: PaymentMethod,
}

// All amounts are minor units (1/100 of the configured currency).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub professional_id: Uuid,
    pub category: ServiceCategory,
    pub description: String,
    pub scheduled_for: DateTime<Utc>,
    pub budget: Budget,
    pub status: JobStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub final_price: Option<i64>,
    pub commission: Option<Commission>,
    pub payment: JobPayment,
    pub invoice: Option<Invoice>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment.method()
    }

    pub fn is_participant(&self, actor: &Actor) -> bool {
        match actor.role {
            ActorRole::Customer => actor.id == self.customer_id,
            ActorRole::Professional => actor.id == self.professional_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_details_are_tagged_by_method() {
        let payment = JobPayment::new(PaymentMethod::Cash);
        let value = serde_json::to_value(&payment).unwrap();

        assert_eq!(value["status"], "unpaid");
        assert_eq!(value["details"]["method"], "cash");
        assert_eq!(value["details"]["professional_marked_received"], false);
        assert!(value["details"].get("order_id").is_none());

        let back: JobPayment = serde_json::from_value(value).unwrap();
        assert_eq!(back.method(), PaymentMethod::Cash);
    }

    #[test]
    fn online_details_cannot_be_read_as_cash() {
        let raw = serde_json::json!({
            "status": "unpaid",
            "details": { "method": "online", "order_id": "order_1", "payment_id": null,
                         "signature": null, "amount": null, "verified_at": null,
                         "manual_fallback_used": false, "manual_fallback_offered_at": null,
                         "manual_confirmed_at": null }
        });
        let payment: JobPayment = serde_json::from_value(raw).unwrap();

        assert_eq!(payment.method(), PaymentMethod::Online);
        assert!(matches!(payment.details, PaymentDetails::Online(ref d) if d.order_id.as_deref() == Some("order_1")));
    }

    #[test]
    fn settled_statuses() {
        assert!(PaymentStatus::Paid.is_settled());
        assert!(PaymentStatus::ConfirmedManually.is_settled());
        assert!(!PaymentStatus::Disputed.is_settled());
        assert_ne!(PaymentStatus::Paid, PaymentStatus::ConfirmedManually);
    }

    #[test]
    fn actor_role_parsing() {
        assert_eq!(ActorRole::parse("Customer"), Some(ActorRole::Customer));
        assert_eq!(ActorRole::parse(" professional "), Some(ActorRole::Professional));
        assert_eq!(ActorRole::parse("admin"), None);
    }
}
