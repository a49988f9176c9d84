use super::{RegisteredClient, WsActor, frame};
use crate::ir::IrDocument;
use crate::reload::Message;

impl WsActor {
    /// Answer a completed handshake with `connected`.
    pub(super) fn welcome(&self, connection_id: &str, initial_schema: Option<IrDocument>) {
        let mut clients = self.clients.lock();
        let Some(client) = clients.iter_mut().find(|c| c.connection_id == connection_id) else {
            crate::debug!("ws"; "client {} left before welcome", connection_id);
            return;
        };
        let Some(session) = client.session.as_ref() else {
            return;
        };

        let message = Message::connected(&session.session_id, connection_id, initial_schema);
        match client.ws.send(frame(&message)) {
            Ok(_) => client.welcomed = true,
            Err(e) => crate::debug!("ws"; "welcome to {} failed: {}", connection_id, e),
        }
    }

    /// Send a message to clients showing `component` (`None` = all)
    pub(super) fn send_to_component(&self, component: Option<&str>, message: &Message) {
        let mut clients = self.clients.lock();
        let mut sent = 0;

        clients.retain_mut(|client| {
            if !client.wants(component) {
                return true;
            }
            match deliver(client, message) {
                Ok(()) => {
                    sent += 1;
                    true
                }
                Err(e) => {
                    crate::debug!("ws"; "client {} disconnected: {}", client.connection_id, e);
                    self.forget_component(client);
                    false
                }
            }
        });

        if sent > 0 {
            crate::debug!("ws"; "{} sent to {} clients", message.type_name(), sent);
        }
    }

    /// Send a message to one client
    pub(super) fn send_to(&self, connection_id: &str, message: &Message) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|client| {
            if client.connection_id != connection_id {
                return true;
            }
            match deliver(client, message) {
                Ok(()) => true,
                Err(e) => {
                    crate::debug!("ws"; "client {} disconnected: {}", connection_id, e);
                    self.forget_component(client);
                    false
                }
            }
        });
    }

    fn forget_component(&self, client: &RegisteredClient) {
        if let Some(component) = client.component() {
            self.active.remove(component);
        }
    }
}

/// Address `message` to the client's session and track updates for acks.
fn deliver(client: &mut RegisteredClient, message: &Message) -> tungstenite::Result<()> {
    let Some(session) = client.session.as_mut() else {
        return Ok(());
    };
    let addressed = message.for_session(&session.session_id);
    client.ws.send(frame(&addressed))?;
    session.record_sent(&addressed);
    Ok(())
}
