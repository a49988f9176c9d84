//! Reload Module
//!
//! Hot-reload protocol between the sync engine and live clients.
//!
//! # Architecture
//!
//! ```text
//! FsActor -> SyncActor -> WsActor -> Client
//!  (watch)    (engine)   (sessions)
//! ```
//!
//! # Modules
//!
//! - `active` - Components shown by connected clients
//! - `message` - Wire message types and JSON codec
//! - `validate` - Structural validation of inbound messages
//! - `delta` - Schema delta and the incremental/full decision
//! - `session` - Per-client handshake and acknowledgement state
//! - `server` - WebSocket listener for client connections

pub mod active;
pub mod delta;
pub mod message;
pub mod server;
pub mod session;
pub mod validate;

pub use active::ActiveComponents;
pub use delta::{calculate_schema_delta, should_use_incremental_update};
pub use message::{ErrorCode, Message, Payload, Severity, UpdatePayload};
pub use session::{ClientSession, SessionAction};
