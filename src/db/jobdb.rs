// db/jobdb.rs
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::jobmodel::*;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job {0} was changed by another writer")]
    Conflict(Uuid),

    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence for the job aggregate.
///
/// `update_job` is a compare-and-set: the write lands only when the stored
/// version still equals `expected_version`, otherwise `StoreError::Conflict`.
/// The returned job carries the new version.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn update_job(&self, job: &Job, expected_version: i64) -> Result<Job, StoreError>;

    async fn list_jobs_by_payment_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Job>, StoreError>;

    async fn next_invoice_sequence(&self) -> Result<i64, StoreError>;
}

#[async_trait]
impl JobStore for DBClient {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let data = serde_json::to_value(job)?;

        sqlx::query(
            r#"
            INSERT INTO service_jobs
            (id, customer_id, professional_id, status, payment_status, version, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id)
        .bind(job.customer_id)
        .bind(job.professional_id)
        .bind(job.status.to_str())
        .bind(job.payment.status.to_str())
        .bind(job.version)
        .bind(data)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let row: Option<(serde_json::Value, i64)> = sqlx::query_as(
            "SELECT data, version FROM service_jobs WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((data, version)) => {
                let mut job: Job = serde_json::from_value(data)?;
                job.version = version;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn update_job(&self, job: &Job, expected_version: i64) -> Result<Job, StoreError> {
        let mut next = job.clone();
        next.version = expected_version + 1;
        let data = serde_json::to_value(&next)?;

        let result = sqlx::query(
            r#"
            UPDATE service_jobs
            SET status = $1, payment_status = $2, version = $3, data = $4, updated_at = $5
            WHERE id = $6 AND version = $7
            "#,
        )
        .bind(next.status.to_str())
        .bind(next.payment.status.to_str())
        .bind(next.version)
        .bind(data)
        .bind(next.updated_at)
        .bind(next.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM service_jobs WHERE id = $1")
                .bind(next.id)
                .fetch_optional(&self.pool)
                .await?;

            return Err(match exists {
                Some(_) => StoreError::Conflict(next.id),
                None => StoreError::NotFound(next.id),
            });
        }

        Ok(next)
    }

    async fn list_jobs_by_payment_status(
        &self,
        status: PaymentStatus,
    ) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<(serde_json::Value, i64)> = sqlx::query_as(
            "SELECT data, version FROM service_jobs WHERE payment_status = $1 ORDER BY updated_at",
        )
        .bind(status.to_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(data, version)| -> Result<Job, StoreError> {
                let mut job: Job = serde_json::from_value(data)?;
                job.version = version;
                Ok(job)
            })
            .collect()
    }

    async fn next_invoice_sequence(&self) -> Result<i64, StoreError> {
        let (seq,): (i64,) = sqlx::query_as("SELECT nextval('invoice_number_seq')")
            .fetch_one(&self.pool)
            .await?;

        Ok(seq)
    }
}
