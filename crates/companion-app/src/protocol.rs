// Messages exchanged between the event loop, the UI, and gateway tasks.

use companion_core::message::Message;
use companion_gateway::SendOutcome;

use crate::lifecycle::AppPhase;

// ---------------------------------------------------------------------------
// UI -> App
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Attempt to unlock with whatever the user typed on the lock screen.
    Unlock { response: String },
    /// Save gateway credentials, and optionally an unlock passcode.
    SubmitSetup {
        gateway_url: String,
        token: String,
        passcode: Option<String>,
    },
    /// Send a chat message.
    Send(String),
    /// Resend queued messages.
    RetryPending,
    /// Probe the gateway's health endpoint.
    TestConnection,
    Quit,
}

// ---------------------------------------------------------------------------
// App -> UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Full state for the current screen.
    Snapshot(Box<AppSnapshot>),
    /// Short status line text.
    Notice(String),
}

/// Everything the UI needs to draw a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub phase: AppPhase,
    /// Error text for the lock or setup screen.
    pub error: Option<String>,
    /// Whether the lock screen should collect a passcode.
    pub needs_passcode: bool,
    pub messages: Vec<Message>,
    pub pending_count: usize,
    /// Number of sends still waiting on the gateway.
    pub in_flight: usize,
    pub flushing: bool,
    /// Result of the last health probe, if any.
    pub gateway_healthy: Option<bool>,
    pub gateway_url: Option<String>,
}

impl Default for AppSnapshot {
    fn default() -> Self {
        AppSnapshot {
            phase: AppPhase::Loading,
            error: None,
            needs_passcode: false,
            messages: Vec::new(),
            pending_count: 0,
            in_flight: 0,
            flushing: false,
            gateway_healthy: None,
            gateway_url: None,
        }
    }
}

impl AppSnapshot {
    /// True while the UI should show the "Thinking..." indicator.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0 || self.flushing
    }
}

// ---------------------------------------------------------------------------
// Gateway tasks -> App
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum GatewayEvent {
    /// A send for user message `user_id` finished. `Err` carries the text of a
    /// `GatewayError`.
    Reply {
        user_id: String,
        result: Result<SendOutcome, String>,
    },
    /// A pending-queue flush finished.
    Flushed(Vec<(String, SendOutcome)>),
    /// A health probe finished.
    Health(bool),
}
