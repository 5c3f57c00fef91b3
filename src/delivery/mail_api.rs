//! Delivery through an HTTP mail API.
//!
//! Posts the message as JSON (`from`, `to`, `subject`, `text`) with a
//! bearer API key, the shape accepted by transactional mail services.

use super::{DeliverySink, OutboundMessage};
use crate::error::{DigestError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Sends messages to a mail API endpoint.
pub struct MailApiSink {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl MailApiSink {
    /// Create a sink for `endpoint` authenticated with `api_key`.
    pub fn new(endpoint: &str, api_key: String, timeout_seconds: u64) -> Result<Self> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(DigestError::Config(format!(
                "Mail endpoint must start with 'http://' or 'https://': {}",
                endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }

    fn build_request(&self, message: &OutboundMessage) -> reqwest::RequestBuilder {
        self.http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(message)
    }
}

#[async_trait]
impl DeliverySink for MailApiSink {
    fn name(&self) -> &str {
        "mail-api"
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        debug!("POST {} ({} recipient(s))", self.endpoint, message.to.len());

        let response = self
            .build_request(message)
            .send()
            .await
            .map_err(|e| DigestError::Delivery(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::Delivery(format!(
                "Mail API returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        info!("Digest sent to {}", message.to.join(", "));
        Ok(())
    }
}
