//! Actor System for Serve Mode
//!
//! Message-passing concurrency for watch mode:
//!
//! ```text
//! FsActor --> SyncActor --> WsActor
//! (watch)     (engine)     (sessions)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - Watcher feeding the debounced change queue
//! - `sync` - Sole owner of the sync engine
//! - `ws` - WebSocket sessions and targeted push
//! - `console` - Operator commands read from stdin
//! - `coordinator` - Wires up and runs actors

pub mod console;
pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod sync;
pub mod ws;

pub use coordinator::Coordinator;
