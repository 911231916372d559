// Gateway credentials: URL and bearer token cached in memory and persisted as
// two secure-store entries, always written together.

use std::sync::Arc;

use tracing::{info, warn};

use crate::store::{SecureStore, StoreError};

pub const TOKEN_KEY: &str = "openclaw_gateway_token";
pub const GATEWAY_URL_KEY: &str = "openclaw_gateway_url";

/// A complete set of gateway credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub gateway_url: String,
    pub token: String,
}

impl Credentials {
    /// Join an API path (e.g. `/api/chat`) onto the gateway URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.gateway_url, path)
    }
}

/// In-memory view of the stored credentials.
///
/// Both values must be present and non-empty for the store to count as
/// configured; a half-written pair is treated as unconfigured.
pub struct CredentialStore {
    store: Arc<dyn SecureStore>,
    gateway_url: Option<String>,
    token: Option<String>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self {
            store,
            gateway_url: None,
            token: None,
        }
    }

    /// Load persisted credentials into memory. Returns whether both values
    /// are present.
    ///
    /// Storage failures are logged and reported as "not configured".
    pub fn initialize(&mut self) -> bool {
        match self.load() {
            Ok(()) => {
                let configured = self.is_configured();
                info!("credential store initialized (configured={configured})");
                configured
            }
            Err(e) => {
                warn!("failed to load credentials, treating as unconfigured: {e}");
                self.gateway_url = None;
                self.token = None;
                false
            }
        }
    }

    fn load(&mut self) -> Result<(), StoreError> {
        let token = self.store.get(TOKEN_KEY)?;
        let gateway_url = self.store.get(GATEWAY_URL_KEY)?;
        self.token = token;
        self.gateway_url = gateway_url;
        Ok(())
    }

    /// Persist both values and update the cache. Reachability is not checked.
    ///
    /// Surrounding whitespace is dropped from both values and trailing `/`
    /// from the URL, so `endpoint` joins paths cleanly.
    pub fn configure(&mut self, gateway_url: &str, token: &str) -> Result<(), StoreError> {
        let gateway_url = normalize_url(gateway_url);
        let token = token.trim().to_string();

        self.store
            .set_many(&[(GATEWAY_URL_KEY, gateway_url.as_str()), (TOKEN_KEY, token.as_str())])?;

        info!("gateway configured: {gateway_url}");
        self.gateway_url = Some(gateway_url);
        self.token = Some(token);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    /// The cached credentials, only when both halves are present.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.gateway_url, &self.token) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some(Credentials {
                gateway_url: url.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }

    /// Delete both persisted entries and empty the cache.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.delete(GATEWAY_URL_KEY)?;
        self.store.delete(TOKEN_KEY)?;
        self.gateway_url = None;
        self.token = None;
        Ok(())
    }

    /// The backing store, shared with other components that keep secrets.
    pub fn secure_store(&self) -> Arc<dyn SecureStore> {
        Arc::clone(&self.store)
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
