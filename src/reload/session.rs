//! Per-client protocol state.
//!
//! A session starts with a `connect` message and then tracks which update
//! sequence numbers are still waiting for an acknowledgement. Transport is
//! not involved: inbound messages go in, the actions to take come out.

use std::collections::BTreeMap;

use super::message::{
    AckPayload, ConnectPayload, ErrorCode, Message, PROTOCOL_VERSION, Payload, Severity,
};

/// What the transport should do after an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Send this message back to the client
    Reply(Message),
    /// Send a full update of `component` to this client, after `notice`
    Resync {
        component: Option<String>,
        notice: Option<Message>,
    },
    /// Nothing to do
    None,
}

/// Result of feeding one `ack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    Accepted,
    /// Unknown or already acknowledged sequence number
    Ignored,
    NeedsResync { component: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ClientSession {
    pub connection_id: String,
    /// Session id chosen by the client, echoed on every outbound message
    pub session_id: String,
    pub device_id: String,
    pub platform: String,
    pub device_name: Option<String>,
    /// Component the client currently shows, `None` for all
    pub component: Option<String>,
    /// Sent update sequence numbers awaiting ack, with their component
    outstanding: BTreeMap<u64, Option<String>>,
}

impl ClientSession {
    /// Run the handshake for the first message of a connection.
    ///
    /// On failure the returned message is the `error` to send before
    /// closing the connection.
    pub fn handshake(connection_id: &str, first: &Message) -> Result<Self, Message> {
        if !first.is_compatible() {
            return Err(Message::error(
                first.session_id.clone(),
                ErrorCode::ProtocolVersionMismatch,
                format!(
                    "client protocol {} is not compatible with server protocol {}",
                    first.protocol_version, PROTOCOL_VERSION
                ),
                Severity::Fatal,
                false,
            ));
        }

        let Payload::Connect(connect) = &first.payload else {
            return Err(Message::error(
                first.session_id.clone(),
                ErrorCode::InvalidMessage,
                format!("expected connect, got {}", first.type_name()),
                Severity::Error,
                false,
            ));
        };

        Ok(Self::from_connect(connection_id, &first.session_id, connect))
    }

    fn from_connect(connection_id: &str, session_id: &str, connect: &ConnectPayload) -> Self {
        Self {
            connection_id: connection_id.to_owned(),
            session_id: session_id.to_owned(),
            device_id: connect.device_id.clone(),
            platform: connect.platform.clone(),
            device_name: connect.device_name.clone(),
            component: connect.component.clone(),
            outstanding: BTreeMap::new(),
        }
    }

    /// Whether an update for `component` should reach this client.
    ///
    /// Untargeted messages and clients without a component receive all.
    pub fn wants(&self, component: Option<&str>) -> bool {
        match (&self.component, component) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        }
    }

    /// Remember an update sent to this client.
    pub fn record_sent(&mut self, message: &Message) {
        if let Some(update) = message.as_update() {
            self.outstanding.insert(
                update.sequence_number(),
                update.component().map(str::to_owned),
            );
        }
    }

    pub fn outstanding(&self) -> impl Iterator<Item = u64> + '_ {
        self.outstanding.keys().copied()
    }

    pub fn handle_ack(&mut self, ack: &AckPayload) -> AckOutcome {
        let Some(component) = self.outstanding.remove(&ack.sequence_number) else {
            return AckOutcome::Ignored;
        };
        if ack.success {
            AckOutcome::Accepted
        } else {
            AckOutcome::NeedsResync {
                component: component.or_else(|| self.component.clone()),
            }
        }
    }

    /// Dispatch one inbound message after the handshake.
    pub fn handle(&mut self, message: Message) -> SessionAction {
        match message.payload {
            Payload::Ping(_) => SessionAction::Reply(Message::pong(&self.session_id)),
            Payload::Ack(ack) => match self.handle_ack(&ack) {
                AckOutcome::Accepted => SessionAction::None,
                AckOutcome::Ignored => {
                    crate::debug!("ws"; "ignored ack {} from {}", ack.sequence_number, self.connection_id);
                    SessionAction::None
                }
                AckOutcome::NeedsResync { component } => {
                    let reason = ack.error.unwrap_or_else(|| "update rejected".to_string());
                    let code = if reason.to_ascii_lowercase().contains("checksum") {
                        ErrorCode::ChecksumMismatch
                    } else {
                        ErrorCode::SyncFailed
                    };
                    let notice = Message::error(
                        &self.session_id,
                        code,
                        format!(
                            "update {} failed on client: {}; sending full resync",
                            ack.sequence_number, reason
                        ),
                        Severity::Warning,
                        true,
                    );
                    SessionAction::Resync {
                        component,
                        notice: Some(notice),
                    }
                }
            },
            // Re-sent connect switches the viewed component
            Payload::Connect(connect) => {
                self.component = connect.component;
                SessionAction::Resync {
                    component: self.component.clone(),
                    notice: None,
                }
            }
            Payload::Pong(_) => SessionAction::None,
            other => SessionAction::Reply(Message::error(
                &self.session_id,
                ErrorCode::InvalidMessage,
                format!("unexpected {} from client", other.type_name()),
                Severity::Warning,
                true,
            )),
        }
    }

    /// Error reply for an inbound frame that failed validation.
    pub fn invalid(&self, error: &crate::core::ValidationError) -> Message {
        Message::error(
            &self.session_id,
            ErrorCode::InvalidMessage,
            error.to_string(),
            Severity::Warning,
            true,
        )
    }
}
