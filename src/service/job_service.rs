// service/job_service.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::Config,
    db::jobdb::JobStore,
    models::jobmodel::*,
    service::{
        cash_payment::{self, PaymentOutcome},
        error::ServiceError,
        invoice_service,
        job_lifecycle,
        notification_service::{dispatch, NotificationKind, Notifier},
        online_payment,
        payment_gateway::PaymentGateway,
    },
    utils::{
        currency::{format_minor_units, is_valid_amount},
        otp_generator::generate_verification_code,
    },
};

/// What the customer should do next to pay online.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OnlineOrder {
    Gateway {
        order_id: String,
        key_id: String,
        amount: i64,
        currency: String,
    },
    ManualFallback {
        payment_url: String,
        amount: i64,
        currency: String,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub escalated: usize,
    pub reminded: usize,
}

#[derive(Debug, Clone)]
pub struct JobService {
    store: Arc<dyn JobStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    config: Config,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    async fn load(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    /// Persist `updated` only if `original` is still the stored version.
    /// Unchanged jobs are not written.
    async fn commit(&self, original: &Job, mut updated: Job) -> Result<Job, ServiceError> {
        if updated == *original {
            return Ok(updated);
        }
        updated.updated_at = Utc::now();
        Ok(self.store.update_job(&updated, original.version).await?)
    }

    fn notify(&self, recipient: Uuid, kind: NotificationKind, job: &Job) {
        dispatch(
            &self.notifier,
            recipient,
            kind,
            serde_json::json!({
                "job_id": job.id.to_string(),
                "status": job.status.to_str(),
                "payment_status": job.payment.status.to_str(),
            }),
        );
    }

    fn ensure_payable(job: &Job) -> Result<(), ServiceError> {
        if job.status == JobStatus::Cancelled {
            return Err(ServiceError::JobCancelled(job.id));
        }
        Ok(())
    }

    pub async fn get_job(&self, job_id: Uuid, actor: &Actor) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_participant(&job, actor)?;
        Ok(job)
    }

    // Job lifecycle

    pub async fn create_job(&self, actor: &Actor, draft: NewJob) -> Result<Job, ServiceError> {
        let job = job_lifecycle::create(actor, draft, Utc::now())?;
        self.store.insert_job(&job).await?;

        tracing::info!(
            "Job {} created by customer {} for professional {} ({})",
            job.id,
            job.customer_id,
            job.professional_id,
            job.payment_method().to_str()
        );
        self.notify(job.professional_id, NotificationKind::JobCreated, &job);
        Ok(job)
    }

    pub async fn accept_job(&self, job_id: Uuid, actor: &Actor) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        let mut updated = job.clone();
        job_lifecycle::accept(&mut updated, actor, Utc::now())?;
        let saved = self.commit(&job, updated).await?;

        tracing::info!("Job {} accepted by {}", job_id, actor.id);
        self.notify(saved.customer_id, NotificationKind::JobAccepted, &saved);
        Ok(saved)
    }

    pub async fn start_job(&self, job_id: Uuid, actor: &Actor) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        let mut updated = job.clone();
        job_lifecycle::start(&mut updated, actor, Utc::now())?;
        let saved = self.commit(&job, updated).await?;

        tracing::info!("Job {} started by {}", job_id, actor.id);
        self.notify(saved.customer_id, NotificationKind::JobStarted, &saved);
        Ok(saved)
    }

    pub async fn complete_job(
        &self,
        job_id: Uuid,
        actor: &Actor,
        final_price: i64,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        let mut updated = job.clone();
        job_lifecycle::complete(
            &mut updated,
            actor,
            final_price,
            self.config.commission_rate_bps,
            Utc::now(),
        )?;
        let saved = self.commit(&job, updated).await?;

        tracing::info!(
            "Job {} completed at {}",
            job_id,
            format_minor_units(final_price, &self.config.payment_currency)
        );
        self.notify(saved.customer_id, NotificationKind::JobCompleted, &saved);
        Ok(saved)
    }

    pub async fn cancel_job(
        &self,
        job_id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        let mut updated = job.clone();
        job_lifecycle::cancel(&mut updated, actor, reason, Utc::now())?;
        let saved = self.commit(&job, updated).await?;

        tracing::info!("Job {} cancelled by {} {}", job_id, actor.role, actor.id);
        let counterpart = match actor.role {
            ActorRole::Customer => saved.professional_id,
            ActorRole::Professional => saved.customer_id,
        };
        self.notify(counterpart, NotificationKind::JobCancelled, &saved);
        Ok(saved)
    }

    // Online payments

    pub async fn create_online_order(
        &self,
        job_id: Uuid,
        actor: &Actor,
        amount: i64,
    ) -> Result<OnlineOrder, ServiceError> {
        if !is_valid_amount(amount) {
            return Err(ServiceError::Validation(
                "Amount is out of range".to_string(),
            ));
        }
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_role(&job, actor, ActorRole::Customer)?;
        Self::ensure_payable(&job)?;
        if job.payment_method() != PaymentMethod::Online {
            return Err(ServiceError::Validation(
                "This job is paid in cash, not online".to_string(),
            ));
        }
        if job.payment.status == PaymentStatus::Paid {
            return Err(ServiceError::InvalidPaymentState {
                status: job.payment.status,
                reason: "the online payment was already verified".to_string(),
            });
        }

        let currency = self.config.payment_currency.clone();
        let mut updated = job.clone();

        let order = match self.gateway.create_order(amount, &currency, job_id).await {
            Ok(order_id) => {
                online_payment::record_order(&mut updated.payment, &order_id, amount)?;
                OnlineOrder::Gateway {
                    order_id,
                    key_id: self.config.payment_key_id.clone(),
                    amount,
                    currency,
                }
            }
            Err(e) => {
                let degraded: ServiceError = e.into();
                tracing::warn!(
                    "Falling back to manual payment link for job {}: {}",
                    job_id,
                    degraded
                );
                online_payment::offer_manual_fallback(&mut updated.payment, amount, Utc::now())?;
                OnlineOrder::ManualFallback {
                    payment_url: self.config.manual_payment_url.clone(),
                    amount,
                    currency,
                }
            }
        };

        let saved = self.commit(&job, updated).await?;
        if let OnlineOrder::ManualFallback { .. } = order {
            self.notify(saved.professional_id, NotificationKind::ManualPaymentLinkIssued, &saved);
        }
        Ok(order)
    }

    pub async fn verify_online_payment(
        &self,
        job_id: Uuid,
        actor: &Actor,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_role(&job, actor, ActorRole::Customer)?;
        Self::ensure_payable(&job)?;

        let secret = self.config.payment_key_secret.as_str();
        let mut updated = job.clone();
        let outcome = match online_payment::verify(
            &mut updated.payment,
            order_id,
            payment_id,
            signature,
            secret,
            Utc::now(),
        ) {
            Ok(outcome) => outcome,
            Err(ServiceError::SignatureMismatch) => {
                tracing::warn!("Signature mismatch for job {} order {}", job_id, order_id);
                return Err(ServiceError::SignatureMismatch);
            }
            Err(e) => return Err(e),
        };

        if outcome == PaymentOutcome::AlreadyApplied {
            return Ok(job);
        }

        let saved = match self.commit(&job, updated).await {
            Ok(saved) => saved,
            Err(ServiceError::StateConflict(_)) => {
                // A concurrent submission may have landed the same verification.
                let current = self.load(job_id).await?;
                let mut replay = current.clone();
                return match online_payment::verify(
                    &mut replay.payment,
                    order_id,
                    payment_id,
                    signature,
                    secret,
                    Utc::now(),
                ) {
                    Ok(PaymentOutcome::AlreadyApplied) => Ok(current),
                    _ => Err(ServiceError::StateConflict(job_id)),
                };
            }
            Err(e) => return Err(e),
        };

        tracing::info!("Online payment {} verified for job {}", payment_id, job_id);
        self.notify(saved.professional_id, NotificationKind::PaymentConfirmed, &saved);
        self.notify(saved.customer_id, NotificationKind::PaymentConfirmed, &saved);
        Ok(saved)
    }

    pub async fn confirm_manual_payment(
        &self,
        job_id: Uuid,
        actor: &Actor,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_role(&job, actor, ActorRole::Customer)?;
        Self::ensure_payable(&job)?;

        let mut updated = job.clone();
        if online_payment::confirm_manual(&mut updated.payment, Utc::now())?
            == PaymentOutcome::AlreadyApplied
        {
            return Ok(job);
        }
        let saved = self.commit(&job, updated).await?;

        tracing::info!("Manual payment reported for job {} (unverified)", job_id);
        self.notify(saved.professional_id, NotificationKind::ManualPaymentConfirmed, &saved);
        Ok(saved)
    }

    // Cash payments

    pub async fn mark_cash_received(
        &self,
        job_id: Uuid,
        actor: &Actor,
        amount: i64,
        method: &str,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_role(&job, actor, ActorRole::Professional)?;
        Self::ensure_payable(&job)?;

        let mut updated = job.clone();
        let outcome = cash_payment::mark_received(
            &mut updated.payment,
            amount,
            method,
            generate_verification_code(),
            Utc::now(),
        )?;
        if outcome == PaymentOutcome::AlreadyApplied {
            return Ok(job);
        }
        let saved = self.commit(&job, updated).await?;

        tracing::info!(
            "Cash of {} marked received for job {}",
            format_minor_units(amount, &self.config.payment_currency),
            job_id
        );
        self.notify(saved.customer_id, NotificationKind::CashMarkedReceived, &saved);
        Ok(saved)
    }

    pub async fn confirm_cash_payment(
        &self,
        job_id: Uuid,
        actor: &Actor,
        code: Option<&str>,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_role(&job, actor, ActorRole::Customer)?;
        Self::ensure_payable(&job)?;

        let mut updated = job.clone();
        if cash_payment::confirm(&mut updated.payment, code, Utc::now())?
            == PaymentOutcome::AlreadyApplied
        {
            return Ok(job);
        }
        let saved = self.commit(&job, updated).await?;

        tracing::info!("Cash payment confirmed for job {}", job_id);
        self.notify(saved.professional_id, NotificationKind::PaymentConfirmed, &saved);
        Ok(saved)
    }

    pub async fn raise_dispute(
        &self,
        job_id: Uuid,
        actor: &Actor,
        reason: &str,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_role(&job, actor, ActorRole::Customer)?;
        Self::ensure_payable(&job)?;

        let mut updated = job.clone();
        cash_payment::raise_dispute(&mut updated.payment, reason, Utc::now())?;
        let saved = self.commit(&job, updated).await?;

        tracing::warn!("Cash payment disputed for job {}: {}", job_id, reason.trim());
        self.notify(saved.professional_id, NotificationKind::PaymentDisputed, &saved);
        Ok(saved)
    }

    pub async fn attach_receipt_photo(
        &self,
        job_id: Uuid,
        actor: &Actor,
        photo_url: &str,
    ) -> Result<Job, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_participant(&job, actor)?;
        Self::ensure_payable(&job)?;

        let mut updated = job.clone();
        cash_payment::attach_receipt_photo(&mut updated.payment, photo_url)?;
        self.commit(&job, updated).await
    }

    // Invoices

    pub async fn generate_invoice(&self, job_id: Uuid, actor: &Actor) -> Result<Invoice, ServiceError> {
        let job = self.load(job_id).await?;
        job_lifecycle::ensure_participant(&job, actor)?;

        if job.status != JobStatus::Completed {
            return Err(ServiceError::JobNotCompleted {
                job_id,
                status: job.status,
            });
        }
        if let (true, Some(invoice)) = (invoice_service::is_finalized(&job), &job.invoice) {
            return Ok(invoice.clone());
        }

        let now = Utc::now();
        let number = match &job.invoice {
            Some(draft) => draft.number.clone(),
            None => {
                let sequence = self.store.next_invoice_sequence().await?;
                invoice_service::format_invoice_number(now, sequence)
            }
        };
        let invoice = invoice_service::build_invoice(&job, number, self.config.tax_rate_bps, now)?;

        let mut updated = job.clone();
        updated.invoice = Some(invoice.clone());
        let saved = self.commit(&job, updated).await?;

        tracing::info!("Invoice {} generated for job {}", invoice.number, job_id);
        self.notify(saved.customer_id, NotificationKind::InvoiceGenerated, &saved);
        Ok(invoice)
    }

    // Expiry policy

    /// Escalates overdue cash confirmations and reminds both parties about
    /// disputes left open past the window.
    pub async fn sweep_stale_payments(&self, now: DateTime<Utc>) -> Result<SweepReport, ServiceError> {
        let window = self.config.payment_expiry_window();
        let mut report = SweepReport::default();

        for job in self
            .store
            .list_jobs_by_payment_status(PaymentStatus::PendingVerification)
            .await?
        {
            let mut updated = job.clone();
            if !cash_payment::expire_unconfirmed(&mut updated.payment, window, now) {
                continue;
            }
            match self.commit(&job, updated).await {
                Ok(saved) => {
                    tracing::warn!("Cash confirmation window expired for job {}", saved.id);
                    self.notify(saved.customer_id, NotificationKind::PaymentConfirmationOverdue, &saved);
                    self.notify(saved.professional_id, NotificationKind::PaymentConfirmationOverdue, &saved);
                    report.escalated += 1;
                }
                Err(ServiceError::StateConflict(id)) => {
                    tracing::debug!("Job {} changed during sweep, skipping", id);
                }
                Err(e) => return Err(e),
            }
        }

        for job in self
            .store
            .list_jobs_by_payment_status(PaymentStatus::Disputed)
            .await?
        {
            let mut updated = job.clone();
            if !cash_payment::flag_stale_dispute(&mut updated.payment, window, now) {
                continue;
            }
            match self.commit(&job, updated).await {
                Ok(saved) => {
                    self.notify(saved.customer_id, NotificationKind::DisputeUnresolved, &saved);
                    self.notify(saved.professional_id, NotificationKind::DisputeUnresolved, &saved);
                    report.reminded += 1;
                }
                Err(ServiceError::StateConflict(id)) => {
                    tracing::debug!("Job {} changed during sweep, skipping", id);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }
}
