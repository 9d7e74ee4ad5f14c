//! Outbound payment-status notifications.
//!
//! Delivery is fire-and-forget: the gateway is invoked strictly after the
//! billing transaction commits and returns a plain `bool`. A failed or
//! unconfigured delivery is logged, never propagated.

use crate::domain::BillStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Payload delivered to the notification gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub phone: String,
    pub status: BillStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Gateway for payment-status messages.
#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    /// Deliver a notification, reporting success as a plain flag.
    async fn payment_status_changed(&self, notification: &PaymentNotification) -> bool;
}

/// Posts notifications to a configured webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PaymentNotifier for WebhookNotifier {
    async fn payment_status_changed(&self, notification: &PaymentNotification) -> bool {
        let result = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => {
                tracing::debug!(phone = %notification.phone, status = %notification.status, "payment notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to deliver payment notification");
                false
            }
        }
    }
}

/// Used when no webhook URL is configured.
pub struct NoopNotifier;

#[async_trait]
impl PaymentNotifier for NoopNotifier {
    async fn payment_status_changed(&self, _notification: &PaymentNotification) -> bool {
        tracing::warn!("notification webhook not configured; dropping payment notification");
        false
    }
}
