// service/notification_service.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{db::db::DBClient, service::error::ServiceError};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JobCreated,
    JobAccepted,
    JobStarted,
    JobCompleted,
    JobCancelled,
    CashMarkedReceived,
    PaymentConfirmed,
    PaymentDisputed,
    ManualPaymentConfirmed,
    ManualPaymentLinkIssued,
    InvoiceGenerated,
    PaymentConfirmationOverdue,
    DisputeUnresolved,
}

impl NotificationKind {
    pub fn to_str(&self) -> &str {
        match self {
            NotificationKind::JobCreated => "job_created",
            NotificationKind::JobAccepted => "job_accepted",
            NotificationKind::JobStarted => "job_started",
            NotificationKind::JobCompleted => "job_completed",
            NotificationKind::JobCancelled => "job_cancelled",
            NotificationKind::CashMarkedReceived => "cash_marked_received",
            NotificationKind::PaymentConfirmed => "payment_confirmed",
            NotificationKind::PaymentDisputed => "payment_disputed",
            NotificationKind::ManualPaymentConfirmed => "manual_payment_confirmed",
            NotificationKind::ManualPaymentLinkIssued => "manual_payment_link_issued",
            NotificationKind::InvoiceGenerated => "invoice_generated",
            NotificationKind::PaymentConfirmationOverdue => "payment_confirmation_overdue",
            NotificationKind::DisputeUnresolved => "dispute_unresolved",
        }
    }

    fn message(&self) -> &str {
        match self {
            NotificationKind::JobCreated => "You have a new service request",
            NotificationKind::JobAccepted => "Your service request was accepted",
            NotificationKind::JobStarted => "Work on your job has started",
            NotificationKind::JobCompleted => "Your job was marked as completed",
            NotificationKind::JobCancelled => "A job was cancelled",
            NotificationKind::CashMarkedReceived => "Please confirm your cash payment",
            NotificationKind::PaymentConfirmed => "Payment confirmed",
            NotificationKind::PaymentDisputed => "A cash payment was disputed",
            NotificationKind::ManualPaymentConfirmed => "Customer reported a manual payment",
            NotificationKind::ManualPaymentLinkIssued => "Online payment is using the manual link",
            NotificationKind::InvoiceGenerated => "Your invoice is ready",
            NotificationKind::PaymentConfirmationOverdue => "Cash payment was not confirmed in time and is now under review",
            NotificationKind::DisputeUnresolved => "A payment dispute is still awaiting resolution",
        }
    }
}

/// Best-effort delivery to a job participant.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn notify(
        &self,
        recipient: Uuid,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Option<Arc<DBClient>>,
    // Push and email delivery are handled by a separate service reading the stored rows.
}

impl NotificationService {
    pub fn new(db_client: Option<Arc<DBClient>>) -> Self {
        Self { db_client }
    }

    async fn store_notification(
        &self,
        db_client: &DBClient,
        recipient: Uuid,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<(), ServiceError> {
        let job_id = payload["job_id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok());

        sqlx::query(
            r#"
            INSERT INTO job_notifications (id, user_id, notification_type, job_id, payload, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recipient)
        .bind(kind.to_str())
        .bind(job_id)
        .bind(&payload)
        .bind(kind.message())
        .bind(Utc::now())
        .execute(&db_client.pool)
        .await
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(
        &self,
        recipient: Uuid,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Notification {} for user {}: {}",
            kind.to_str(),
            recipient,
            kind.message()
        );

        match &self.db_client {
            Some(db_client) => self.store_notification(db_client, recipient, kind, payload).await,
            None => Ok(()),
        }
    }
}

/// Fire-and-forget: the caller never waits on delivery and failures are only
/// logged.
pub fn dispatch(
    notifier: &Arc<dyn Notifier>,
    recipient: Uuid,
    kind: NotificationKind,
    payload: serde_json::Value,
) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(recipient, kind, payload).await {
            tracing::warn!(
                "Failed to deliver {} notification to {}: {}",
                kind.to_str(),
                recipient,
                e
            );
        }
    });
}
