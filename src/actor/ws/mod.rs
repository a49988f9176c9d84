//! WebSocket Actor - Bidirectional Communication
//!
//! This actor is responsible for:
//! - Running the protocol handshake for new connections
//! - Pushing updates to the clients that show the updated component
//! - Reading acks, pings and component switches from clients
//!
//! # Architecture
//!
//! ```text
//! SyncActor --[Push/SendTo/Welcome]--> WsActor --[targeted]--> Clients
//!     ^                                                           |
//!     +-----------[ClientConnected/Resync]----------- ack/connect +
//! ```

mod client_io;
mod delivery;

#[cfg(test)]
mod tests;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::{SyncMsg, WsMsg};
use crate::reload::{ActiveComponents, ClientSession, Message};

/// A registered WebSocket client
struct RegisteredClient {
    ws: WebSocket<TcpStream>,
    connection_id: String,
    /// `None` until the client's `connect` message arrives
    session: Option<ClientSession>,
    /// Set once `connected` went out; updates wait until then
    welcomed: bool,
}

impl RegisteredClient {
    fn component(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.component.as_deref())
    }

    /// Same predicate the session uses, false before the handshake.
    fn wants(&self, component: Option<&str>) -> bool {
        self.welcomed && self.session.as_ref().is_some_and(|s| s.wants(component))
    }
}

type Clients = Arc<Mutex<Vec<RegisteredClient>>>;

/// WebSocket Actor - manages client sessions and pushes
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    sync_tx: mpsc::Sender<SyncMsg>,
    clients: Clients,
    active: Arc<ActiveComponents>,
    /// Used on messages to clients without a session yet
    server_session: String,
    max_clients: usize,
}

impl WsActor {
    pub fn new(
        rx: mpsc::Receiver<WsMsg>,
        sync_tx: mpsc::Sender<SyncMsg>,
        active: Arc<ActiveComponents>,
        server_session: impl Into<String>,
        max_clients: usize,
    ) -> Self {
        Self {
            rx,
            sync_tx,
            clients: Arc::new(Mutex::new(Vec::new())),
            active,
            server_session: server_session.into(),
            max_clients,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let reader = self.reader();
        std::thread::Builder::new()
            .name("ws-reader".into())
            .spawn(move || reader.run())
            .map_err(|e| crate::log!("ws"; "reader thread failed: {}", e))
            .ok();

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::AddClient(stream) => {
                    if let Some((connection_id, component)) = self.add_client(stream)
                        && self
                            .sync_tx
                            .send(SyncMsg::ClientConnected {
                                connection_id,
                                component,
                            })
                            .await
                            .is_err()
                    {
                        break;
                    }
                }

                WsMsg::Welcome {
                    connection_id,
                    initial_schema,
                } => self.welcome(&connection_id, initial_schema),

                WsMsg::Push { component, message } => {
                    self.send_to_component(component.as_deref(), &message);
                }

                WsMsg::SendTo {
                    connection_id,
                    message,
                } => self.send_to(&connection_id, &message),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    let mut clients = self.clients.lock();
                    for mut client in clients.drain(..) {
                        let _ = client.ws.close(None);
                    }
                    self.active.clear();
                    break;
                }
            }
        }
    }

    fn reader(&self) -> client_io::Reader {
        client_io::Reader {
            clients: Arc::clone(&self.clients),
            sync_tx: self.sync_tx.clone(),
            active: Arc::clone(&self.active),
            server_session: self.server_session.clone(),
        }
    }
}

/// Serialize a protocol message into a text frame.
fn frame(message: &Message) -> tungstenite::Message {
    tungstenite::Message::Text(message.to_json().into())
}
