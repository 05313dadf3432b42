// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Periodically escalates cash payments nobody confirmed and reminds both
/// parties about disputes left open past the expiry window.
pub async fn start_payment_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(app_state.env.sweep_interval_secs.max(1)));

    loop {
        interval.tick().await;

        tracing::info!("Running payment expiry job at {}", Utc::now());

        match app_state.job_service.sweep_stale_payments(Utc::now()).await {
            Ok(report) => tracing::info!(
                "Payment expiry job completed: {} escalated, {} dispute reminders",
                report.escalated,
                report.reminded
            ),
            Err(e) => tracing::error!("Payment expiry job failed: {}", e),
        }
    }
}
