//! Outbound Messages
//!
//! Everything the bridge sends back is a `response` object:
//!
//! ```text
//! {"type":"response","command":"set_expression","status":"success","message":"Expression Joy set to 0.80"}
//! {"type":"response","status":"connected","message":"Connected to avatar bridge"}
//! ```

use serde::{Deserialize, Serialize};

use super::commands::CommandKind;

/// Message category (only responses exist today)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Reply to a command or connection notice
    #[default]
    Response,
}

/// Outcome reported in a response
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Command applied
    Success,
    /// Command rejected or failed
    Error,
    /// Unsolicited notice sent right after accept
    Connected,
}

/// One outbound line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Always `response`
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Command literal this answers (absent for connection notices)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Outcome
    pub status: ResponseStatus,

    /// Human-readable detail
    pub message: String,
}

impl BridgeMessage {
    /// Successful reply to a command
    #[must_use]
    pub fn success(command: CommandKind, message: impl Into<String>) -> Self {
        Self::reply(command, ResponseStatus::Success, message)
    }

    /// Error reply to a command
    #[must_use]
    pub fn error(command: CommandKind, message: impl Into<String>) -> Self {
        Self::reply(command, ResponseStatus::Error, message)
    }

    /// Connection notice
    #[must_use]
    pub fn connected() -> Self {
        Self {
            kind: MessageType::Response,
            command: None,
            status: ResponseStatus::Connected,
            message: "Connected to avatar bridge".to_string(),
        }
    }

    fn reply(command: CommandKind, status: ResponseStatus, message: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Response,
            command: Some(command.literal().to_string()),
            status,
            message: message.into(),
        }
    }

    /// Whether this reports success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Where responses go
///
/// Implemented by the TCP connection handle; tests use an in-memory sink.
/// Sending is best-effort and must not block the caller.
pub trait ResponseSink: Send + Sync {
    /// Deliver one message (dropped if nobody is listening)
    fn send(&self, message: BridgeMessage);
}

/// Sink that drops everything (no transport attached)
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ResponseSink for NullSink {
    fn send(&self, message: BridgeMessage) {
        tracing::debug!(status = ?message.status, "No transport attached, dropping response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_wire_format() {
        let msg = BridgeMessage::success(CommandKind::SetExpression, "Expression Joy set to 0.80");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"response","command":"set_expression","status":"success","message":"Expression Joy set to 0.80"}"#
        );
    }

    #[test]
    fn test_connected_omits_command() {
        let json = serde_json::to_string(&BridgeMessage::connected()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"response","status":"connected","message":"Connected to avatar bridge"}"#
        );
    }

    #[test]
    fn test_roundtrip_error() {
        let msg = BridgeMessage::error(CommandKind::SetBlendshape, "not implemented");
        let parsed: BridgeMessage =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(parsed, msg);
        assert!(!parsed.is_success());
    }
}
