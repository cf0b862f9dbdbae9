use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::Lead;

/// Upper bound for the whole webhook exchange, body included.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("leads-system/", env!("CARGO_PKG_VERSION"));

/// Body sent to the webhook. Only name and email leave the system.
#[derive(Debug, Serialize)]
struct LeadCreatedPayload<'a> {
    name: &'a str,
    email: &'a str,
}

/// How a single notification attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 200 with a JSON body whose `ok` field is truthy.
    Acknowledged,
    /// 200 with any other body.
    Unacknowledged,
    /// Any status other than 200.
    Rejected(u16),
    /// Timeout, connection or DNS failure.
    Failed(String),
}

/// Failure of a notification attempt. Always converted into a
/// [`DispatchOutcome`] before leaving this module.
#[derive(Debug)]
pub enum NotificationError {
    Status(u16),
    Transport(String),
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::Status(code) => write!(f, "webhook returned status {}", code),
            NotificationError::Transport(msg) => write!(f, "webhook request failed: {}", msg),
        }
    }
}

impl From<NotificationError> for DispatchOutcome {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Status(code) => DispatchOutcome::Rejected(code),
            NotificationError::Transport(msg) => DispatchOutcome::Failed(msg),
        }
    }
}

/// Client for the lead-created workflow webhook.
///
/// Makes at most one attempt per lead; there is no retry or queue.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl WebhookClient {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::with_timeout(
            config.webhook_url.clone(),
            config.webhook_user.clone(),
            config.webhook_password.clone(),
            WEBHOOK_TIMEOUT,
        )
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(
        url: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create webhook client: {}", e))
            })?;

        Ok(Self {
            client,
            url,
            username,
            password,
            timeout,
        })
    }

    /// Notifies the webhook that `lead` was created. Never fails: every
    /// error is folded into the returned outcome.
    pub async fn notify_lead_created(&self, lead: &Lead) -> DispatchOutcome {
        tracing::info!("Dispatching lead {} to webhook", lead.id);

        let payload = LeadCreatedPayload {
            name: &lead.name,
            email: &lead.email,
        };

        let outcome = match self.send(&payload).await {
            Ok(true) => DispatchOutcome::Acknowledged,
            Ok(false) => DispatchOutcome::Unacknowledged,
            Err(e) => {
                tracing::warn!("Webhook dispatch for lead {} failed: {}", lead.id, e);
                e.into()
            }
        };

        match &outcome {
            DispatchOutcome::Acknowledged => {
                tracing::info!("✓ Webhook acknowledged lead {}", lead.id)
            }
            DispatchOutcome::Unacknowledged => tracing::warn!(
                "Webhook answered 200 for lead {} without a truthy 'ok' field",
                lead.id
            ),
            _ => {}
        }

        outcome
    }

    /// Returns whether the webhook acknowledged the payload.
    async fn send(&self, payload: &LeadCreatedPayload<'_>) -> Result<bool, NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(self.describe(&e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Webhook returned {}: {}", status, error_text);
            return Err(NotificationError::Status(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => Ok(is_acknowledged(&body)),
            Err(e) => {
                tracing::warn!(
                    "Failed to read webhook response body: {}",
                    self.describe(&e)
                );
                Ok(false)
            }
        }
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("tempo limite de {}s excedido", self.timeout.as_secs())
        } else if err.is_connect() {
            format!("falha de conexão ({})", err)
        } else {
            err.to_string()
        }
    }
}

/// True when `body` is a JSON object whose `ok` field is truthy.
pub fn is_acknowledged(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("ok").map(is_truthy))
        .unwrap_or(false)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
