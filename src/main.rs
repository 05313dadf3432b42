mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use config::Config;
use db::{db::DBClient, jobdb::JobStore, memorydb::MemoryJobStore};
use dotenv::dotenv;
use routes::create_router;
use service::{
    job_service::JobService,
    notification_service::NotificationService,
    payment_gateway::PaymentProviderService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub job_service: Arc<JobService>,
}

impl AppState {
    pub fn new(config: Config, job_service: JobService) -> Self {
        Self {
            env: config,
            job_service: Arc::new(job_service),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let (store, db_client): (Arc<dyn JobStore>, Option<Arc<DBClient>>) =
        match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(20)
                    .min_connections(5)
                    .connect(database_url)
                    .await
                    .context("failed to connect to the database")?;
                tracing::info!("Connection to the database is successful");

                let db_client = Arc::new(DBClient::new(pool));
                db_client
                    .ensure_schema()
                    .await
                    .context("failed to prepare the database schema")?;

                let store: Arc<dyn JobStore> = db_client.clone();
                (store, Some(db_client))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, jobs are kept in memory and lost on restart");
                let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
                (store, None)
            }
        };

    let gateway = PaymentProviderService::new(&config)
        .context("failed to build the payment gateway client")?;
    let notifier = NotificationService::new(db_client);

    let job_service = JobService::new(
        store,
        Arc::new(gateway),
        Arc::new(notifier),
        config.clone(),
    );
    let app_state = Arc::new(AppState::new(config.clone(), job_service));

    let allowed_origins = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(middleware::ACTOR_ID_HEADER),
            HeaderName::from_static(middleware::ACTOR_ROLE_HEADER),
        ])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let app = create_router(app_state.clone()).layer(cors);

    tokio::spawn(service::background_jobs::start_payment_expiry_job(app_state.clone()));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    tracing::info!("Server is running on http://localhost:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
