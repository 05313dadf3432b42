// db/db.rs
use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    /// Create the tables and the invoice sequence if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS service_jobs (
                id UUID PRIMARY KEY,
                customer_id UUID NOT NULL,
                professional_id UUID NOT NULL,
                status TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                version BIGINT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_service_jobs_payment_status ON service_jobs (payment_status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE SEQUENCE IF NOT EXISTS invoice_number_seq START 1")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_notifications (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL,
                notification_type TEXT NOT NULL,
                job_id UUID,
                payload JSONB,
                message TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database schema is ready");
        Ok(())
    }
}
