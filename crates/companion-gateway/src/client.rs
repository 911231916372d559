// Gateway HTTP client.
//
// One POST per chat message to `<gateway>/api/chat` and an authenticated GET
// to `<gateway>/api/health`. Both carry the stored bearer token.

use std::time::Duration;

use async_trait::async_trait;
use companion_core::config::GatewayConfig;
use companion_core::credentials::Credentials;
use companion_core::message::{now_millis, Message, Twin};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::protocol::{ChatTransport, FailureReason, GatewayError, SendOutcome};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CHAT_PATH: &str = "/api/chat";
pub const HEALTH_PATH: &str = "/api/health";

/// Longest slice of an undecodable body kept in a `MalformedBody` reason.
const BODY_EXCERPT_LEN: usize = 120;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

// ---------------------------------------------------------------------------
// GatewayClient
// ---------------------------------------------------------------------------

/// Low-level client bound to one set of credentials.
pub struct GatewayClient {
    http: reqwest::Client,
    credentials: Credentials,
}

impl GatewayClient {
    /// Build a client. `timeout` of `None` leaves requests unbounded.
    pub fn new(credentials: Credentials, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GatewayError::ClientBuild)?;
        Ok(Self { http, credentials })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// POST `content` to the chat endpoint and decode the assistant's reply.
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome, GatewayError> {
        if content.trim().is_empty() {
            return Err(GatewayError::EmptyMessage);
        }

        let url = self.credentials.endpoint(CHAT_PATH);
        debug!(%url, len = content.len(), "sending chat message");

        let response = match self
            .http
            .post(&url)
            .bearer_auth(&self.credentials.token)
            .json(&ChatRequest { message: content })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("chat request failed: {e}");
                return Ok(SendOutcome::Failed(FailureReason::Network(e.to_string())));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("gateway error: {status}");
            return Ok(SendOutcome::Failed(FailureReason::Status(status.as_u16())));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to read chat response body: {e}");
                return Ok(SendOutcome::Failed(FailureReason::Network(e.to_string())));
            }
        };

        match parse_reply(&body, now_millis()) {
            Ok(message) => {
                info!(id = %message.id, twin = ?message.twin, "reply received");
                Ok(SendOutcome::Delivered(message))
            }
            Err(reason) => {
                warn!("undecodable chat response: {reason}");
                Ok(SendOutcome::Failed(FailureReason::MalformedBody(reason)))
            }
        }
    }

    /// GET the health endpoint; true only on a 2xx status.
    pub async fn test_connection(&self) -> bool {
        let url = self.credentials.endpoint(HEALTH_PATH);
        match self
            .http
            .get(&url)
            .bearer_auth(&self.credentials.token)
            .send()
            .await
        {
            Ok(response) => {
                let healthy = response.status().is_success();
                debug!(status = %response.status(), healthy, "health check");
                healthy
            }
            Err(e) => {
                debug!("health check failed: {e}");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either bound to credentials or unconfigured.
pub enum Gateway {
    /// Credentials are stored and the client is ready.
    Active(GatewayClient),
    /// No complete credentials; sends fail with `NotConfigured`.
    Unconfigured,
}

impl Gateway {
    /// Build a gateway from the credential store's current state.
    pub fn connect(
        credentials: Option<Credentials>,
        config: &GatewayConfig,
    ) -> Result<Self, GatewayError> {
        match credentials {
            Some(credentials) => {
                let timeout = config.request_timeout_secs.map(Duration::from_secs);
                Ok(Gateway::Active(GatewayClient::new(credentials, timeout)?))
            }
            None => Ok(Gateway::Unconfigured),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Gateway::Active(_))
    }

    pub async fn send_message(&self, content: &str) -> Result<SendOutcome, GatewayError> {
        match self {
            Gateway::Active(client) => client.send_message(content).await,
            Gateway::Unconfigured => Err(GatewayError::NotConfigured),
        }
    }

    pub async fn test_connection(&self) -> bool {
        match self {
            Gateway::Active(client) => client.test_connection().await,
            Gateway::Unconfigured => false,
        }
    }
}

#[async_trait]
impl ChatTransport for Gateway {
    async fn send_message(&self, content: &str) -> Result<SendOutcome, GatewayError> {
        Gateway::send_message(self, content).await
    }

    async fn test_connection(&self) -> bool {
        Gateway::test_connection(self).await
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Decode a chat response body into an assistant message.
///
/// Expected shape: `{ "id"?: string|number, "content"|"message": string,
/// "twin"?: "case"|"tars" }`. The first non-empty of `content` and `message`
/// wins. A missing id falls back to the receive time; the timestamp is always
/// the receive time.
pub(crate) fn parse_reply(body: &str, received_at: i64) -> Result<Message, String> {
    let v: Value = serde_json::from_str(body).map_err(|e| {
        format!("invalid JSON ({e}): {}", excerpt(body))
    })?;
    let obj = v
        .as_object()
        .ok_or_else(|| format!("expected a JSON object: {}", excerpt(body)))?;

    let content = ["content", "message"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .ok_or_else(|| "response has neither `content` nor `message`".to_string())?;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => received_at.to_string(),
    };

    let twin = match obj.get("twin") {
        Some(Value::String(name)) => {
            let twin = Twin::parse(name);
            if twin.is_none() {
                warn!(twin = %name, "ignoring unknown twin in response");
            }
            twin
        }
        _ => None,
    };

    Ok(Message::assistant(id, content, received_at, twin))
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
