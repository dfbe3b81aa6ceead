//! Delivery of notifications through an Apprise API server.
//!
//! [`AppriseClient`] posts a JSON payload to the server's `/notify/` endpoint,
//! which forwards it to every configured provider URL.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::policy::NotificationPolicy;
use super::{Notifier, NotifyKind};

/// HTTP request timeout for a single delivery
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Apprise server answered with a non-2xx status code
    #[error("Apprise returned HTTP {0}")]
    HttpStatus(u16),
}

/// Where and to whom notifications are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppriseSettings {
    /// Base URL of the Apprise API server
    pub url: String,
    /// Provider URLs Apprise fans out to
    pub providers: String,
}

impl AppriseSettings {
    /// Reads `APPRISE_URL` and `APPRISE_PROVIDERS`; `None` unless both are set
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("APPRISE_URL").unwrap_or_default();
        let providers = std::env::var("APPRISE_PROVIDERS").unwrap_or_default();
        Self::new(url, providers)
    }

    /// Builds settings from raw values; `None` if either is blank
    pub fn new(url: impl AsRef<str>, providers: impl AsRef<str>) -> Option<Self> {
        let url = url.as_ref().trim();
        let providers = providers.as_ref().trim();
        if url.is_empty() || providers.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            providers: providers.to_string(),
        })
    }

    /// The `/notify/` endpoint derived from the base URL
    pub fn notify_endpoint(&self) -> String {
        let mut endpoint = self.url.trim_end_matches('/').to_string();
        if !endpoint.ends_with("/notify") {
            endpoint.push_str("/notify");
        }
        endpoint.push('/');
        endpoint
    }
}

#[derive(Debug, Serialize)]
struct ApprisePayload<'a> {
    title: &'a str,
    body: &'a str,
    urls: &'a str,
    #[serde(rename = "type")]
    kind: NotifyKind,
}

/// HTTP client for one Apprise server
#[derive(Debug, Clone)]
pub struct AppriseClient {
    client: reqwest::Client,
    settings: AppriseSettings,
}

impl AppriseClient {
    pub fn new(settings: AppriseSettings) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &AppriseSettings {
        &self.settings
    }

    /// Posts one notification and checks the response status
    pub async fn send(&self, title: &str, body: &str, kind: NotifyKind) -> Result<(), NotifyError> {
        let payload = ApprisePayload {
            title,
            body,
            urls: &self.settings.providers,
            kind,
        };

        let response = self
            .client
            .post(self.settings.notify_endpoint())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        debug!(title = %title, "Notification delivered");
        Ok(())
    }
}

/// Fire-and-forget notifier backed by Apprise
pub struct AppriseNotifier {
    client: Arc<AppriseClient>,
    policy: NotificationPolicy,
}

impl AppriseNotifier {
    pub fn new(client: AppriseClient, policy: NotificationPolicy) -> Self {
        Self {
            client: Arc::new(client),
            policy,
        }
    }
}

impl Notifier for AppriseNotifier {
    fn notify(&self, widget_type: &str, title: &str, body: &str, kind: NotifyKind) {
        if !self.policy.enabled_for_widget(widget_type) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(widget_type = %widget_type, "No async runtime, dropping notification");
            return;
        };

        let client = Arc::clone(&self.client);
        let title = title.to_string();
        let body = body.to_string();
        runtime.spawn(async move {
            if let Err(e) = client.send(&title, &body, kind).await {
                warn!(error = %e, title = %title, "Failed to send notification");
            }
        });
    }
}
