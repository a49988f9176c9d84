//! Hot Reload Message Protocol
//!
//! One JSON object per message:
//!
//! ```json
//! {"type": "update", "sessionId": "...", "timestamp": 1700000000000,
//!  "protocolVersion": "1.0.0", "payload": {"kind": "full", ...}}
//! ```
//!
//! # Message Types
//!
//! - `connect`/`connected`: session handshake
//! - `update`: full schema or incremental delta for one component
//! - `reload`: ask the client to rebuild from scratch
//! - `error`: protocol, checksum or sync failure
//! - `ping`/`pong`: keep-alive
//! - `ack`: client confirms (or rejects) an update

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::delta::SchemaDelta;
use super::validate::validate_message_value;
use crate::core::{ValidationError, Version};
use crate::freshness::ContentHash;
use crate::ir::IrDocument;

/// Wire protocol version spoken by this server.
pub const PROTOCOL_VERSION: Version = Version::new(1, 0, 0);

fn default_protocol_version() -> Version {
    PROTOCOL_VERSION
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub session_id: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: Version,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Payload {
    Connect(ConnectPayload),
    Connected(ConnectedPayload),
    Update(UpdatePayload),
    Reload(ReloadPayload),
    Error(ErrorPayload),
    Ping(PingPayload),
    Pong(PongPayload),
    Ack(AckPayload),
}

impl Payload {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Connected(_) => "connected",
            Self::Update(_) => "update",
            Self::Reload(_) => "reload",
            Self::Error(_) => "error",
            Self::Ping(_) => "ping",
            Self::Pong(_) => "pong",
            Self::Ack(_) => "ack",
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPayload {
    pub device_id: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Logical component the client is showing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_schema: Option<IrDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum UpdatePayload {
    Full {
        schema: IrDocument,
        sequence_number: u64,
        preserve_state: bool,
        checksum: ContentHash,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component: Option<String>,
    },
    Incremental {
        delta: SchemaDelta,
        sequence_number: u64,
        preserve_state: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum: Option<ContentHash>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component: Option<String>,
    },
}

impl UpdatePayload {
    pub fn sequence_number(&self) -> u64 {
        match self {
            Self::Full {
                sequence_number, ..
            }
            | Self::Incremental {
                sequence_number, ..
            } => *sequence_number,
        }
    }

    pub fn component(&self) -> Option<&str> {
        match self {
            Self::Full { component, .. } | Self::Incremental { component, .. } => {
                component.as_deref()
            }
        }
    }

    pub fn is_incremental(&self) -> bool {
        matches!(self, Self::Incremental { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadPayload {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ProtocolVersionMismatch,
    InvalidMessage,
    ChecksumMismatch,
    ConversionFailed,
    Conflict,
    SyncFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongPayload {
    pub server_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub sequence_number: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_time_ms: Option<u64>,
}

// =============================================================================
// Construction
// =============================================================================

impl Message {
    pub fn new(session_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: crate::utils::time::now_ms(),
            protocol_version: PROTOCOL_VERSION,
            payload,
        }
    }

    pub fn connected(
        session_id: impl Into<String>,
        connection_id: impl Into<String>,
        initial_schema: Option<IrDocument>,
    ) -> Self {
        Self::new(
            session_id,
            Payload::Connected(ConnectedPayload {
                connection_id: connection_id.into(),
                initial_schema,
            }),
        )
    }

    /// Full update carrying the whole document.
    pub fn full_update(
        session_id: impl Into<String>,
        schema: IrDocument,
        sequence_number: u64,
        component: Option<String>,
    ) -> Self {
        let checksum = crate::ir::checksum(&schema);
        Self::new(
            session_id,
            Payload::Update(UpdatePayload::Full {
                schema,
                sequence_number,
                preserve_state: true,
                checksum,
                component,
            }),
        )
    }

    /// Incremental update; `checksum` is of the resulting document.
    pub fn incremental_update(
        session_id: impl Into<String>,
        delta: SchemaDelta,
        sequence_number: u64,
        checksum: Option<ContentHash>,
        component: Option<String>,
    ) -> Self {
        Self::new(
            session_id,
            Payload::Update(UpdatePayload::Incremental {
                delta,
                sequence_number,
                preserve_state: true,
                checksum,
                component,
            }),
        )
    }

    pub fn reload(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            session_id,
            Payload::Reload(ReloadPayload {
                reason: reason.into(),
                error: None,
            }),
        )
    }

    pub fn error(
        session_id: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        severity: Severity,
        recoverable: bool,
    ) -> Self {
        Self::new(
            session_id,
            Payload::Error(ErrorPayload {
                code,
                message: message.into(),
                severity,
                recoverable,
                stack: None,
            }),
        )
    }

    pub fn ping(session_id: impl Into<String>) -> Self {
        Self::new(session_id, Payload::Ping(PingPayload::default()))
    }

    pub fn pong(session_id: impl Into<String>) -> Self {
        Self::new(
            session_id,
            Payload::Pong(PongPayload {
                server_time: crate::utils::time::now_ms(),
            }),
        )
    }

    pub fn ack(session_id: impl Into<String>, sequence_number: u64, success: bool) -> Self {
        Self::new(
            session_id,
            Payload::Ack(AckPayload {
                sequence_number,
                success,
                error: None,
                apply_time_ms: None,
            }),
        )
    }

    /// Same message addressed to another session.
    pub fn for_session(&self, session_id: &str) -> Self {
        Self {
            session_id: session_id.to_owned(),
            ..self.clone()
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    pub fn as_update(&self) -> Option<&UpdatePayload> {
        match &self.payload {
            Payload::Update(update) => Some(update),
            _ => None,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.protocol_version.is_compatible_with(&PROTOCOL_VERSION)
    }

    // =========================================================================
    // JSON
    // =========================================================================

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }

    /// Parse and validate one message.
    ///
    /// Envelope problems (missing `type`, bad `sessionId`, missing payload)
    /// are reported before payload shape errors.
    pub fn from_json(s: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| ValidationError::message(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let type_name = validate_message_value(&value)?;
        serde_json::from_value(value)
            .map_err(|e| ValidationError::message(format!("invalid {type_name} payload: {e}")))
    }
}
