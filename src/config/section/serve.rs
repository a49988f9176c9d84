//! `[serve]` section configuration.
//!
//! Live-reload server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 35729                # WebSocket port, next free port is tried when busy
//! watch = true                # Sync on file changes
//! max_clients = 64            # Concurrent live clients
//! ```
//!
//! Use `interface = "0.0.0.0"` so devices on the LAN can connect.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,

    /// WebSocket port number.
    pub port: u16,

    /// Enable file watcher.
    pub watch: bool,

    /// Connections beyond this are refused.
    pub max_clients: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 35729,
            watch: true,
            max_clients: 64,
        }
    }
}

impl ServeConfig {
    pub const PORT: FieldPath = FieldPath::new("serve.port");
    pub const MAX_CLIENTS: FieldPath = FieldPath::new("serve.max_clients");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error(Self::PORT, "port must be non-zero");
        }
        if self.max_clients == 0 {
            diag.error(Self::MAX_CLIENTS, "must allow at least one client");
        }
    }
}
