// Result types and the transport seam between chat state and the gateway.

use async_trait::async_trait;
use companion_core::message::Message;
use thiserror::Error;

/// What happened to a single chat request.
///
/// Every network, status, or decoding problem is a `Failed` value rather than
/// an error: the caller keeps the message and queues it locally.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The gateway answered; the reply is ready to append to the log.
    Delivered(Message),
    /// The message could not be delivered right now.
    Failed(FailureReason),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("network error: {0}")]
    Network(String),

    #[error("gateway returned status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    MalformedBody(String),
}

/// Conditions the caller must fix before a request can be attempted.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("OpenClaw not configured")]
    NotConfigured,

    #[error("message content is empty")]
    EmptyMessage,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Anything that can carry chat messages to an assistant.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver `content` and wait for the reply.
    async fn send_message(&self, content: &str) -> Result<SendOutcome, GatewayError>;

    /// Cheap authenticated reachability check. Never fails; problems are
    /// reported as `false`.
    async fn test_connection(&self) -> bool;
}
