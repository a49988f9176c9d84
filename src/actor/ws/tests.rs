use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::WsActor;
use super::client_io::process_text;
use crate::actor::messages::SyncMsg;
use crate::core::Representation;
use crate::ir::IrDocument;
use crate::reload::{ActiveComponents, Message};

const DEVICE_SESSION: &str = "device-session-1";
const SERVER_SESSION: &str = "engine-test-session";

fn envelope(kind: &str, payload: Value) -> String {
    json!({
        "type": kind,
        "sessionId": DEVICE_SESSION,
        "timestamp": 1,
        "protocolVersion": "1.0.0",
        "payload": payload,
    })
    .to_string()
}

fn connect_text(component: Option<&str>) -> String {
    let mut payload = json!({"deviceId": "d1", "platform": "ios"});
    if let Some(component) = component {
        payload["component"] = json!(component);
    }
    envelope("connect", payload)
}

fn update(seq: u64, component: &str) -> Message {
    let doc = IrDocument::new(Representation::B, "b/home.tsx", vec![]);
    Message::full_update(SERVER_SESSION, doc, seq, Some(component.into()))
}

fn reply_type(message: &Message) -> &'static str {
    message.type_name()
}

#[test]
fn test_first_frame_opens_session() {
    let active = ActiveComponents::new();
    let mut session = None;

    let step = process_text("c1", &mut session, &connect_text(Some("home")), &active, SERVER_SESSION);

    assert!(!step.close);
    assert!(step.replies.is_empty());
    assert!(matches!(
        step.sync,
        Some(SyncMsg::ClientConnected { ref component, .. }) if component.as_deref() == Some("home")
    ));
    assert_eq!(session.as_ref().map(|s| s.session_id.as_str()), Some(DEVICE_SESSION));
    assert!(active.is_active("home"));
}

#[test]
fn test_first_frame_must_be_connect() {
    let active = ActiveComponents::new();
    let mut session = None;

    let step = process_text("c1", &mut session, &envelope("ping", json!({})), &active, SERVER_SESSION);

    assert!(step.close);
    assert_eq!(reply_type(&step.replies[0]), "error");
    assert!(session.is_none());
}

#[test]
fn test_version_mismatch_closes() {
    let active = ActiveComponents::new();
    let mut session = None;
    let text = connect_text(None).replace("1.0.0", "2.0.0");

    let step = process_text("c1", &mut session, &text, &active, SERVER_SESSION);

    assert!(step.close);
    assert!(step.replies[0].to_json().contains("PROTOCOL_VERSION_MISMATCH"));
}

#[test]
fn test_invalid_json_before_handshake_closes() {
    let active = ActiveComponents::new();
    let mut session = None;

    let step = process_text("c1", &mut session, "{not json", &active, SERVER_SESSION);

    assert!(step.close);
    assert_eq!(step.replies[0].session_id, SERVER_SESSION);
}

#[test]
fn test_invalid_frame_after_handshake_keeps_client() {
    let active = ActiveComponents::new();
    let mut session = None;
    process_text("c1", &mut session, &connect_text(None), &active, SERVER_SESSION);

    let step = process_text("c1", &mut session, r#"{"type":"ack"}"#, &active, SERVER_SESSION);

    assert!(!step.close);
    assert_eq!(step.replies[0].session_id, DEVICE_SESSION);
    assert!(step.replies[0].to_json().contains("INVALID_MESSAGE"));
}

#[test]
fn test_ping_gets_pong() {
    let active = ActiveComponents::new();
    let mut session = None;
    process_text("c1", &mut session, &connect_text(None), &active, SERVER_SESSION);

    let step = process_text("c1", &mut session, &envelope("ping", json!({})), &active, SERVER_SESSION);

    assert_eq!(reply_type(&step.replies[0]), "pong");
    assert!(step.sync.is_none());
}

#[test]
fn test_failed_ack_requests_resync() {
    let active = ActiveComponents::new();
    let mut session = None;
    process_text("c1", &mut session, &connect_text(Some("home")), &active, SERVER_SESSION);
    if let Some(s) = session.as_mut() {
        s.record_sent(&update(7, "home"));
    }

    let ack = envelope(
        "ack",
        json!({"sequenceNumber": 7, "success": false, "error": "checksum mismatch"}),
    );
    let step = process_text("c1", &mut session, &ack, &active, SERVER_SESSION);

    assert_eq!(reply_type(&step.replies[0]), "error");
    assert!(matches!(
        step.sync,
        Some(SyncMsg::Resync { ref connection_id, ref component })
            if connection_id == "c1" && component.as_deref() == Some("home")
    ));
}

#[test]
fn test_component_switch_updates_active_set() {
    let active = ActiveComponents::new();
    let mut session = None;
    process_text("c1", &mut session, &connect_text(Some("home")), &active, SERVER_SESSION);

    let step = process_text(
        "c1",
        &mut session,
        &connect_text(Some("settings")),
        &active,
        SERVER_SESSION,
    );

    assert!(matches!(step.sync, Some(SyncMsg::Resync { .. })));
    assert!(!active.is_active("home"));
    assert!(active.is_active("settings"));
}

#[test]
fn test_client_receives_welcome_and_targeted_update() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let client = std::thread::spawn(move || {
        let (mut ws, _) = tungstenite::connect(format!("ws://{addr}")).unwrap();
        ws.send(tungstenite::Message::Text(connect_text(Some("home")).into()))
            .unwrap();
        let mut received = Vec::new();
        while received.len() < 2 {
            if let tungstenite::Message::Text(text) = ws.read().unwrap() {
                received.push(serde_json::from_str::<Value>(text.as_str()).unwrap());
            }
        }
        received
    });

    let (stream, _) = listener.accept().unwrap();
    let (_ws_tx, ws_rx) = mpsc::channel(4);
    let (sync_tx, _sync_rx) = mpsc::channel(4);
    let active = Arc::new(ActiveComponents::new());
    let actor = WsActor::new(ws_rx, sync_tx, Arc::clone(&active), SERVER_SESSION, 4);

    let connected = actor.add_client(stream).or_else(|| {
        // connect arrived after the initial read window
        let reader = actor.reader();
        for _ in 0..200 {
            for msg in reader.poll() {
                if let SyncMsg::ClientConnected {
                    connection_id,
                    component,
                } = msg
                {
                    return Some((connection_id, component));
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    });
    let (connection_id, component) = connected.unwrap();
    assert_eq!(component.as_deref(), Some("home"));

    // Not welcomed yet: nothing is pushed
    actor.send_to_component(Some("home"), &update(1, "home"));
    actor.welcome(&connection_id, None);
    actor.send_to_component(Some("settings"), &update(2, "settings"));
    actor.send_to_component(Some("home"), &update(3, "home"));

    let received = client.join().unwrap();
    assert_eq!(received[0]["type"], "connected");
    assert_eq!(received[0]["payload"]["connectionId"], connection_id.as_str());
    assert_eq!(received[1]["type"], "update");
    assert_eq!(received[1]["sessionId"], DEVICE_SESSION);
    assert_eq!(received[1]["payload"]["sequenceNumber"], 3);
}

#[test]
fn test_client_limit() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let _client = std::net::TcpStream::connect(addr).unwrap();
    let (stream, _) = listener.accept().unwrap();

    let (_ws_tx, ws_rx) = mpsc::channel(4);
    let (sync_tx, _sync_rx) = mpsc::channel(4);
    let actor = WsActor::new(ws_rx, sync_tx, Arc::new(ActiveComponents::new()), SERVER_SESSION, 0);

    assert!(actor.add_client(stream).is_none());
    assert!(actor.clients.lock().is_empty());
}
