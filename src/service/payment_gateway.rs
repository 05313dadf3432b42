// service/payment_gateway.rs
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment gateway rejected the order (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Payment gateway returned an unexpected response: {0}")]
    Malformed(String),
}

/// Creates payment orders. Signatures are verified locally, never delegated.
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        job_id: Uuid,
    ) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct PaymentProviderService {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        // A single bounded attempt; callers fall back to the manual link
        // instead of retrying.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.payment_gateway_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.payment_gateway_url.trim_end_matches('/').to_string(),
            key_id: config.payment_key_id.clone(),
            key_secret: config.payment_key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for PaymentProviderService {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        job_id: Uuid,
    ) -> Result<String, GatewayError> {
        let payload = serde_json::json!({
            "amount": amount,
            "currency": currency,
            "receipt": job_id.to_string(),
            "notes": {
                "job_id": job_id.to_string(),
            }
        });

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let response_body: serde_json::Value =
            serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: response_body["error"]["description"]
                    .as_str()
                    .unwrap_or("Order creation failed")
                    .to_string(),
            });
        }

        response_body["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Malformed("missing order id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_gateway_is_a_transport_error() {
        let config = Config {
            payment_gateway_url: "http://127.0.0.1:9".to_string(),
            payment_gateway_timeout_secs: 1,
            ..Config::default()
        };
        let gateway = PaymentProviderService::new(&config).unwrap();

        let err = gateway.create_order(15000, "INR", Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[test]
    fn base_url_is_normalised() {
        let config = Config {
            payment_gateway_url: "https://api.example.com/v1/".to_string(),
            ..Config::default()
        };
        let gateway = PaymentProviderService::new(&config).unwrap();
        assert_eq!(gateway.base_url, "https://api.example.com/v1");
    }
}
