// Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use companion_core::message::{Message, Twin};
use companion_gateway::{ChatTransport, FailureReason, GatewayError, SendOutcome};

use crate::auth::{AuthPrompt, Authenticator};

pub fn delivered(id: &str, content: &str, twin: Option<Twin>) -> Result<SendOutcome, GatewayError> {
    Ok(SendOutcome::Delivered(Message::assistant(
        id, content, 1_000, twin,
    )))
}

pub fn failed(reason: FailureReason) -> Result<SendOutcome, GatewayError> {
    Ok(SendOutcome::Failed(reason))
}

/// Transport that answers from a fixed script, optionally after a delay per
/// call, and records what it was asked to send.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<(Duration, Result<SendOutcome, GatewayError>)>>,
    sent: Mutex<Vec<String>>,
    healthy: bool,
    configured: bool,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<SendOutcome, GatewayError>>) -> Self {
        Self::with_delays(script.into_iter().map(|r| (Duration::ZERO, r)).collect())
    }

    pub fn with_delays(script: Vec<(Duration, Result<SendOutcome, GatewayError>)>) -> Self {
        ScriptedTransport {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
            healthy: true,
            configured: true,
        }
    }

    pub fn unconfigured() -> Self {
        ScriptedTransport {
            configured: false,
            healthy: false,
            ..Self::new(vec![])
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_message(&self, content: &str) -> Result<SendOutcome, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        self.sent.lock().unwrap().push(content.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(SendOutcome::Failed(FailureReason::Network(
                "script exhausted".into(),
            ))),
        }
    }

    async fn test_connection(&self) -> bool {
        self.healthy
    }
}

/// Authenticator with fixed answers that counts how often it prompted.
pub struct FakeAuthenticator {
    pub hardware: bool,
    pub enrolled: bool,
    pub accepts: String,
    pub broken: bool,
    pub enrollment_unreadable: bool,
    prompts: AtomicUsize,
}

impl FakeAuthenticator {
    pub fn new(hardware: bool, enrolled: bool, accepts: &str) -> Self {
        FakeAuthenticator {
            hardware,
            enrolled,
            accepts: accepts.to_string(),
            broken: false,
            enrollment_unreadable: false,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn broken() -> Self {
        FakeAuthenticator {
            broken: true,
            ..Self::new(true, true, "")
        }
    }

    /// `is_enrolled` errors, as when the passcode cannot be read back.
    pub fn unreadable_enrollment(hardware: bool) -> Self {
        FakeAuthenticator {
            enrollment_unreadable: true,
            ..Self::new(hardware, true, "")
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn has_hardware(&self) -> anyhow::Result<bool> {
        Ok(self.hardware)
    }

    async fn is_enrolled(&self) -> anyhow::Result<bool> {
        if self.enrollment_unreadable {
            anyhow::bail!("passcode unreadable");
        }
        Ok(self.enrolled)
    }

    async fn authenticate(&self, _prompt: &AuthPrompt, response: &str) -> anyhow::Result<bool> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            anyhow::bail!("sensor unavailable");
        }
        Ok(response == self.accepts)
    }
}
