//! Wire types exchanged between the webview and its host
//!
//! Every message is a JSON object `{"command": "<name>", "data": {...}}`.
//! Commands without a payload omit `data`. Replies carry no request id;
//! they are told apart by command name only.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};

/// A command sent from the webview to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum WebviewCommand {
    /// Request a new session for the given agent
    #[serde(rename_all = "camelCase")]
    StartSession { agent_id: String },

    /// Request termination of the active session
    EndSession,

    /// Request a named configuration value
    GetConfiguration { section: String },
}

impl WebviewCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSession { .. } => "startSession",
            Self::EndSession => "endSession",
            Self::GetConfiguration { .. } => "getConfiguration",
        }
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A message pushed from the host to the webview
///
/// Parsing goes through [`RawHostMessage`]: lifecycle messages ignore any
/// `data` they carry, and `error` tolerates a missing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "command",
    content = "data",
    rename_all = "camelCase",
    try_from = "RawHostMessage"
)]
pub enum HostMessage {
    /// A configuration value; `value` is opaque JSON
    Configuration {
        section: String,
        value: serde_json::Value,
    },

    /// Host-driven agent selection (forces a fresh session)
    #[serde(rename_all = "camelCase")]
    SelectAgent { agent_id: String },

    /// A restart is about to happen
    SessionStarting,

    /// A session is live
    SessionStarted,

    /// The session is fully torn down
    SessionEnded,

    /// Host-side session failure
    Error { message: String },
}

/// Untyped `{command, data}` envelope as the host sends it
#[derive(Debug, Clone, Deserialize)]
pub struct RawHostMessage {
    pub command: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RawHostMessage {
    fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.get(name)
    }

    fn required_str(&self, name: &str) -> std::result::Result<String, String> {
        self.field(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| format!("'{}' requires a string field '{}'", self.command, name))
    }
}

impl TryFrom<RawHostMessage> for HostMessage {
    type Error = String;

    fn try_from(raw: RawHostMessage) -> std::result::Result<Self, String> {
        let message = match raw.command.as_str() {
            "configuration" => Self::Configuration {
                section: raw.required_str("section")?,
                value: raw.field("value").cloned().unwrap_or_default(),
            },
            "selectAgent" => Self::SelectAgent {
                agent_id: raw.required_str("agentId")?,
            },
            "sessionStarting" => Self::SessionStarting,
            "sessionStarted" => Self::SessionStarted,
            "sessionEnded" => Self::SessionEnded,
            "error" => Self::Error {
                message: raw
                    .field("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            },
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(message)
    }
}

impl HostMessage {
    /// Parse a message from its JSON wire form
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| SessionError::Protocol(format!("{}: {}", e, raw)))
    }

    /// Wire name of the message
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::SelectAgent { .. } => "selectAgent",
            Self::SessionStarting => "sessionStarting",
            Self::SessionStarted => "sessionStarted",
            Self::SessionEnded => "sessionEnded",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this is one of the session lifecycle notifications
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::SessionStarting | Self::SessionStarted | Self::SessionEnded | Self::Error { .. }
        )
    }
}
