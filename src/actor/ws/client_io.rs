use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::{Clients, RegisteredClient, WsActor, frame};
use crate::actor::messages::SyncMsg;
use crate::reload::{ActiveComponents, ClientSession, ErrorCode, Message, SessionAction, Severity};

/// Poll interval of the reader thread
const READ_INTERVAL: Duration = Duration::from_millis(100);

/// What one inbound text frame asks the transport to do.
#[derive(Debug, Default)]
pub(super) struct Step {
    pub(super) replies: Vec<Message>,
    pub(super) sync: Option<SyncMsg>,
    pub(super) close: bool,
}

/// Feed one inbound frame to a client's protocol state.
///
/// The first valid frame must be `connect`; anything else, or an
/// incompatible protocol version, answers with an `error` and closes.
pub(super) fn process_text(
    connection_id: &str,
    session: &mut Option<ClientSession>,
    text: &str,
    active: &ActiveComponents,
    server_session: &str,
) -> Step {
    let mut step = Step::default();

    let message = match Message::from_json(text) {
        Ok(message) => message,
        Err(e) => {
            crate::debug!("ws"; "invalid frame from {}: {}", connection_id, e);
            match session {
                Some(session) => step.replies.push(session.invalid(&e)),
                None => {
                    step.replies.push(Message::error(
                        server_session,
                        ErrorCode::InvalidMessage,
                        e.to_string(),
                        Severity::Error,
                        false,
                    ));
                    step.close = true;
                }
            }
            return step;
        }
    };

    let Some(current) = session.as_mut() else {
        match ClientSession::handshake(connection_id, &message) {
            Ok(opened) => {
                if let Some(component) = &opened.component {
                    active.add(component);
                }
                crate::debug!("ws"; "session {} on {} ({:?})", opened.session_id, connection_id, opened.component);
                step.sync = Some(SyncMsg::ClientConnected {
                    connection_id: connection_id.to_owned(),
                    component: opened.component.clone(),
                });
                *session = Some(opened);
            }
            Err(reply) => {
                crate::log!("ws"; "handshake rejected for {}", connection_id);
                step.replies.push(reply);
                step.close = true;
            }
        }
        return step;
    };

    let before = current.component.clone();
    match current.handle(message) {
        SessionAction::Reply(reply) => step.replies.push(reply),
        SessionAction::Resync { component, notice } => {
            if before != current.component {
                active.switch(before.as_deref(), current.component.as_deref());
            }
            step.replies.extend(notice);
            step.sync = Some(SyncMsg::Resync {
                connection_id: connection_id.to_owned(),
                component,
            });
        }
        SessionAction::None => {}
    }
    step
}

impl WsActor {
    /// Accept a new connection.
    ///
    /// Returns the connection id and component once the `connect` message
    /// arrived in time; otherwise the reader thread finishes the handshake.
    pub(super) fn add_client(&self, stream: TcpStream) -> Option<(String, Option<String>)> {
        if self.clients.lock().len() >= self.max_clients {
            crate::log!("ws"; "client limit ({}) reached, refusing connection", self.max_clients);
            return None;
        }

        // Keep blocking mode during handshake, switch to non-blocking after
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return None;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        let connection_id = uuid::Uuid::new_v4().to_string();
        let mut session = None;
        let mut connected = None;

        if let Some(text) = try_read_initial_text(&mut ws) {
            let step = process_text(
                &connection_id,
                &mut session,
                &text,
                &self.active,
                &self.server_session,
            );
            for reply in &step.replies {
                let _ = ws.send(frame(reply));
            }
            if step.close {
                let _ = ws.close(None);
                return None;
            }
            if let Some(SyncMsg::ClientConnected { component, .. }) = step.sync {
                connected = Some((connection_id.clone(), component));
            }
        }

        let mut clients = self.clients.lock();
        crate::debug!("ws"; "client {} registered (total: {})", connection_id, clients.len() + 1);
        clients.push(RegisteredClient {
            ws,
            connection_id,
            session,
            welcomed: false,
        });
        connected
    }
}

/// Try to read the client's first frame right after accepting.
///
/// Clients send `connect` from their open callback; catching it here
/// avoids a round of reader polling before the welcome.
fn try_read_initial_text(ws: &mut WebSocket<TcpStream>) -> Option<String> {
    for _ in 0..5 {
        match ws.read() {
            Ok(tungstenite::Message::Text(text)) => return Some(text.as_str().to_owned()),
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(5));
            }
            _ => break,
        }
    }
    None
}

/// Background thread polling every client for inbound frames.
pub(super) struct Reader {
    pub(super) clients: Clients,
    pub(super) sync_tx: mpsc::Sender<SyncMsg>,
    pub(super) active: Arc<ActiveComponents>,
    pub(super) server_session: String,
}

impl Reader {
    pub(super) fn run(self) {
        while !crate::core::is_shutdown() {
            std::thread::sleep(READ_INTERVAL);

            let outbound = self.poll();

            // Lock released: the sync actor may be pushing right now
            for msg in outbound {
                if self.sync_tx.blocking_send(msg).is_err() {
                    return;
                }
            }
        }
    }

    pub(super) fn poll(&self) -> Vec<SyncMsg> {
        let mut clients = self.clients.lock();
        let mut outbound = Vec::new();

        clients.retain_mut(|client| {
            let keep = loop {
                match client.ws.read() {
                    Ok(tungstenite::Message::Text(text)) => {
                        let step = process_text(
                            &client.connection_id,
                            &mut client.session,
                            text.as_str(),
                            &self.active,
                            &self.server_session,
                        );
                        for reply in &step.replies {
                            let _ = client.ws.send(frame(reply));
                        }
                        outbound.extend(step.sync);
                        if step.close {
                            let _ = client.ws.close(None);
                            break false;
                        }
                    }
                    Ok(tungstenite::Message::Close(_)) => break false,
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(ref e))
                        if e.kind() == std::io::ErrorKind::WouldBlock =>
                    {
                        break true;
                    }
                    Err(_) => break false,
                }
            };
            if !keep {
                crate::debug!("ws"; "client {} disconnected", client.connection_id);
                if let Some(component) = client.component() {
                    self.active.remove(component);
                }
            }
            keep
        });

        if clients.is_empty() {
            self.active.clear();
        }
        outbound
    }
}
