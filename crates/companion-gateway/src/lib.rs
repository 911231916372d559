// HTTP client for the user's OpenClaw gateway.

pub mod client;
pub mod protocol;

pub use client::{Gateway, GatewayClient, CHAT_PATH, HEALTH_PATH};
pub use protocol::{ChatTransport, FailureReason, GatewayError, SendOutcome};
