// Chat message model.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role / Twin
// ---------------------------------------------------------------------------

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// The assistant persona that answered a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Twin {
    Case,
    Tars,
}

impl Twin {
    /// Parse the wire name (`"case"` / `"tars"`). Anything else is `None`.
    pub fn parse(name: &str) -> Option<Twin> {
        match name {
            "case" => Some(Twin::Case),
            "tars" => Some(Twin::Tars),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Twin::Case => "case",
            Twin::Tars => "tars",
        }
    }

    /// Capitalized persona name for display.
    pub fn display_name(self) -> &'static str {
        match self {
            Twin::Case => "Case",
            Twin::Tars => "Tars",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Twin::Case => "🕯️",
            Twin::Tars => "🔭",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single entry in the chat log.
///
/// Everything except `pending` is fixed at creation. `pending` marks a user
/// message that was shown locally but never confirmed delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twin: Option<Twin>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Message {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            timestamp,
            twin: None,
            pending: false,
        }
    }

    pub fn assistant(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
        twin: Option<Twin>,
    ) -> Self {
        Message {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            twin,
            pending: false,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Id generation
// ---------------------------------------------------------------------------

/// Generates ids for locally created messages.
///
/// Ids are `"<millis>-<seq>"`; the sequence keeps ids distinct when several
/// messages share a millisecond.
#[derive(Debug, Default)]
pub struct MessageIds {
    seq: u64,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, timestamp: i64) -> String {
        self.seq += 1;
        format!("{timestamp}-{}", self.seq)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
