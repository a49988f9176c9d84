//! Actor Message Definitions
//!
//! Message types for inter-actor communication.
//!
//! ```text
//! Console --Resolve/Status--+
//!                            v
//! FsActor --Changes--> SyncActor --Push/SendTo/Welcome--> WsActor
//!                          ^                                 |
//!                          +---ClientConnected/Resync--------+
//! ```

use std::net::TcpStream;

use crate::conflict::ResolutionStrategy;
use crate::ir::IrDocument;
use crate::queue::QueuedChange;
use crate::reload::Message;

// =============================================================================
// SyncActor Messages
// =============================================================================

/// Messages to Sync Actor
#[derive(Debug)]
pub enum SyncMsg {
    /// A drained batch from the change queue
    Changes(Vec<QueuedChange>),
    /// Handshake done, the client waits for `connected`
    ClientConnected {
        connection_id: String,
        component: Option<String>,
    },
    /// Client needs full updates (failed ack or switched component)
    Resync {
        connection_id: String,
        component: Option<String>,
    },
    /// Operator resolution typed into the serve console
    Resolve {
        logical_id: String,
        strategy: ResolutionStrategy,
    },
    /// Print components, conflicts and cache statistics
    Status,
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Accepted TCP stream, handshake pending
    AddClient(TcpStream),
    /// Answer a completed handshake
    Welcome {
        connection_id: String,
        initial_schema: Option<IrDocument>,
    },
    /// Send to every client showing `component`
    /// (`None` = every client)
    Push {
        component: Option<String>,
        message: Message,
    },
    /// Send to one client
    SendTo {
        connection_id: String,
        message: Message,
    },
    Shutdown,
}
