//! WebSocket listener for live clients.
//!
//! Accepted TCP streams are handed to the WsActor, which runs the
//! WebSocket and protocol handshakes.

use std::net::{IpAddr, SocketAddr, TcpListener};

use anyhow::{Result, anyhow};

use crate::actor::messages::WsMsg;

/// Ports tried after the configured one is busy
const MAX_PORT_RETRIES: u16 = 10;

/// Bind `interface:port` (or one of the next ports) and forward clients to `ws_tx`.
///
/// Returns the bound address.
pub fn start_ws_server(
    interface: IpAddr,
    base_port: u16,
    ws_tx: tokio::sync::mpsc::Sender<WsMsg>,
) -> Result<SocketAddr> {
    let listener = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    std::thread::Builder::new()
        .name("ws-accept".into())
        .spawn(move || accept_loop(listener, ws_tx))?;

    Ok(addr)
}

fn accept_loop(listener: TcpListener, ws_tx: tokio::sync::mpsc::Sender<WsMsg>) {
    while !crate::core::is_shutdown() {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("serve"; "client connected: {}", addr);

                // Handshake runs in blocking mode
                let _ = stream.set_nonblocking(false);

                if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                    crate::debug!("serve"; "websocket actor gone, stop accepting");
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            Err(e) => {
                crate::log!("serve"; "accept error: {}", e);
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        }
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<TcpListener> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                if offset > 0 {
                    crate::debug!("serve"; "port {} busy, using {}", base_port, port);
                }
                return Ok(listener);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind {}:{} after {} attempts: {}",
        interface,
        base_port,
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_try_bind_port_skips_busy_port() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let taken = TcpListener::bind(SocketAddr::new(localhost, 0)).unwrap();
        let busy = taken.local_addr().unwrap().port();

        match try_bind_port(localhost, busy, 5) {
            Ok(listener) => assert_ne!(listener.local_addr().unwrap().port(), busy),
            // Every following port may be taken on a busy machine
            Err(e) => assert!(e.to_string().contains("after 5 attempts")),
        }
    }

    #[test]
    fn test_try_bind_port_zero_retries() {
        let err = try_bind_port(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, 0).unwrap_err();
        assert!(err.to_string().contains("after 0 attempts"));
    }
}
