// Local unlock check.
//
// The lock screen asks an `Authenticator` whether the user may open the chat.
// The terminal build uses a device passcode kept in the secure store.

use std::sync::Arc;

use async_trait::async_trait;
use companion_core::store::{SecureStore, StoreError};
use tracing::{debug, info};

/// Secure-store key holding the unlock passcode.
pub const PASSCODE_KEY: &str = "openclaw_unlock_passcode";

/// Texts shown when asking the user to unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPrompt {
    pub message: String,
    pub cancel_label: String,
    /// Whether a device credential may stand in for the primary check.
    pub allow_device_fallback: bool,
}

impl Default for AuthPrompt {
    fn default() -> Self {
        AuthPrompt {
            message: "Unlock OpenClaw Companion".to_string(),
            cancel_label: "Cancel".to_string(),
            allow_device_fallback: true,
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Whether this device can perform the check at all.
    async fn has_hardware(&self) -> anyhow::Result<bool>;

    /// Whether the user has set up a credential to check against.
    async fn is_enrolled(&self) -> anyhow::Result<bool>;

    /// Run the check. `response` is whatever the user entered at the prompt.
    async fn authenticate(&self, prompt: &AuthPrompt, response: &str) -> anyhow::Result<bool>;
}

// ---------------------------------------------------------------------------
// Passcode authenticator
// ---------------------------------------------------------------------------

pub struct PasscodeAuthenticator {
    enabled: bool,
    store: Arc<dyn SecureStore>,
}

impl PasscodeAuthenticator {
    /// `enabled` stands in for hardware presence; it comes from `auth.enabled`
    /// in the config file.
    pub fn new(enabled: bool, store: Arc<dyn SecureStore>) -> Self {
        PasscodeAuthenticator { enabled, store }
    }
}

#[async_trait]
impl Authenticator for PasscodeAuthenticator {
    async fn has_hardware(&self) -> anyhow::Result<bool> {
        Ok(self.enabled)
    }

    async fn is_enrolled(&self) -> anyhow::Result<bool> {
        let stored = self.store.get(PASSCODE_KEY)?;
        Ok(stored.is_some_and(|p| !p.is_empty()))
    }

    async fn authenticate(&self, prompt: &AuthPrompt, response: &str) -> anyhow::Result<bool> {
        debug!(prompt = %prompt.message, "checking unlock passcode");
        let Some(expected) = self.store.get(PASSCODE_KEY)? else {
            return Ok(false);
        };
        Ok(!expected.is_empty() && expected == response)
    }
}

/// Save `passcode` as the unlock credential. A blank passcode removes any
/// existing one, which turns the lock screen off.
pub fn enroll_passcode(store: &dyn SecureStore, passcode: &str) -> Result<(), StoreError> {
    if passcode.is_empty() {
        info!("no unlock passcode set");
        return store.delete(PASSCODE_KEY);
    }
    info!("unlock passcode enrolled");
    store.set(PASSCODE_KEY, passcode)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
