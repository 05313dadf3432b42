// db/memorydb.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::jobdb::{JobStore, StoreError};
use crate::models::jobmodel::*;

/// Process-local job store with the same compare-and-set contract as the
/// Postgres store. Used when no database is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    invoice_seq: Arc<AtomicI64>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&job_id).cloned())
    }

    async fn update_job(&self, job: &Job, expected_version: i64) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let stored = jobs.get_mut(&job.id).ok_or(StoreError::NotFound(job.id))?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict(job.id));
        }

        let mut next = job.clone();
        next.version = expected_version + 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list_jobs_by_payment_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs
            .values()
            .filter(|job| job.payment.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|job| job.updated_at);
        Ok(matching)
    }

    async fn next_invoice_sequence(&self) -> Result<i64, StoreError> {
        Ok(self.invoice_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
