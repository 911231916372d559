// App lifecycle: loading -> (locked | setup) -> ready.

use companion_core::credentials::CredentialStore;
use companion_core::store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{AuthPrompt, Authenticator};

pub const AUTH_FAILED: &str = "Authentication failed";
pub const AUTH_ERROR: &str = "Authentication error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppPhase {
    Loading,
    Locked,
    Setup,
    Ready,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot {operation} while {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: AppPhase,
    },

    #[error("gateway URL and token are both required")]
    MissingCredentials,

    #[error("failed to save configuration: {0}")]
    Store(#[from] StoreError),
}

/// Where the app is in its startup sequence, plus the error text the current
/// screen should show.
#[derive(Debug)]
pub struct Lifecycle {
    phase: AppPhase,
    error: Option<String>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            phase: AppPhase::Loading,
            error: None,
        }
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load credentials and pick the first screen. Unreadable storage counts
    /// as unconfigured.
    pub fn initialize(&mut self, credentials: &mut CredentialStore) -> Result<AppPhase, LifecycleError> {
        self.expect_phase("initialize", AppPhase::Loading)?;

        self.phase = if credentials.initialize() {
            AppPhase::Locked
        } else {
            AppPhase::Setup
        };
        info!(phase = ?self.phase, "app initialized");
        Ok(self.phase)
    }

    /// Whether the lock screen has anything to ask for. When this is false a
    /// call to [`Lifecycle::authenticate`] unlocks without prompting.
    pub async fn needs_prompt(&self, authenticator: &dyn Authenticator) -> bool {
        match gate_available(authenticator).await {
            Ok(available) => available,
            Err(e) => {
                warn!("authenticator probe failed: {e:#}");
                true
            }
        }
    }

    /// Run the unlock check. Success moves to `Ready`; anything else stays
    /// `Locked` with an error message for the lock screen.
    pub async fn authenticate(
        &mut self,
        authenticator: &dyn Authenticator,
        response: &str,
    ) -> Result<AppPhase, LifecycleError> {
        self.expect_phase("authenticate", AppPhase::Locked)?;

        match check(authenticator, response).await {
            Ok(true) => {
                info!("unlocked");
                self.phase = AppPhase::Ready;
                self.error = None;
            }
            Ok(false) => {
                info!("unlock rejected");
                self.error = Some(AUTH_FAILED.to_string());
            }
            Err(e) => {
                warn!("authenticator error: {e:#}");
                self.error = Some(AUTH_ERROR.to_string());
            }
        }
        Ok(self.phase)
    }

    /// Persist the gateway credentials entered on the setup screen and move
    /// to the lock screen.
    pub fn complete_setup(
        &mut self,
        credentials: &mut CredentialStore,
        gateway_url: &str,
        token: &str,
    ) -> Result<AppPhase, LifecycleError> {
        self.expect_phase("complete setup", AppPhase::Setup)?;

        if gateway_url.trim().is_empty() || token.trim().is_empty() {
            let err = LifecycleError::MissingCredentials;
            self.error = Some(err.to_string());
            return Err(err);
        }

        if let Err(e) = credentials.configure(gateway_url, token) {
            let err = LifecycleError::from(e);
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.phase = AppPhase::Locked;
        self.error = None;
        Ok(self.phase)
    }

    fn expect_phase(&self, operation: &'static str, expected: AppPhase) -> Result<(), LifecycleError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }
}

async fn gate_available(authenticator: &dyn Authenticator) -> anyhow::Result<bool> {
    if !authenticator.has_hardware().await? {
        return Ok(false);
    }
    authenticator.is_enrolled().await
}

async fn check(authenticator: &dyn Authenticator, response: &str) -> anyhow::Result<bool> {
    if !gate_available(authenticator).await? {
        info!("no unlock credential available, skipping the check");
        return Ok(true);
    }
    authenticator
        .authenticate(&AuthPrompt::default(), response)
        .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
