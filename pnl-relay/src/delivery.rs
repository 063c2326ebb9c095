//! Outbound delivery of parsed statements.
//!
//! One attempt per batch. Failures are reported to the caller and logged,
//! never retried here.

use anyhow::{Context, Result, bail};
use futures_util::future::BoxFuture;
use log::{error, info};
use pnl_core::RelayPayload;
use std::time::Duration;

/// Where parsed statements go.
pub trait ReportSink: Send + Sync {
    /// Deliver one payload, returning the HTTP status on success.
    fn deliver<'a>(&'a self, payload: &'a RelayPayload) -> BoxFuture<'a, Result<u16>>;
}

/// Bearer-authenticated JSON POST to the downstream webhook.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl WebhookSink {
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build webhook client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            token: token.to_string(),
        })
    }

    async fn post(&self, payload: &RelayPayload) -> Result<u16> {
        if self.url.is_empty() || self.token.is_empty() {
            bail!("webhook URL or token not configured");
        }

        info!("Sending batch {} to {}", payload.batch_id, self.url);
        info!(
            "Payload: {} categories, {} data points",
            payload.categories.len(),
            payload.monthly_data.len()
        );

        let resp = match self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                error!("Timeout sending batch {}", payload.batch_id);
                return Err(e).context("webhook request timed out");
            }
            Err(e) => return Err(e).context("webhook request failed"),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(500).collect();
            error!("Webhook responded {status}: {snippet}");
            bail!("webhook responded {status}");
        }

        info!("Delivered batch {} (status: {status})", payload.batch_id);
        Ok(status.as_u16())
    }
}

impl ReportSink for WebhookSink {
    fn deliver<'a>(&'a self, payload: &'a RelayPayload) -> BoxFuture<'a, Result<u16>> {
        Box::pin(self.post(payload))
    }
}
