//! Actor Coordinator - Wires up the Sync Actor System
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Wires up actors
//! - Runs them concurrently

mod runtime;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::{SyncMsg, WsMsg};
use super::sync::SyncActor;
use super::ws::WsActor;
use crate::config::SyncConfig;
use crate::engine::{PathPairing, SyncEngine};
use crate::reload::ActiveComponents;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<SyncConfig>,
    shutdown_rx: Option<Receiver<()>>,
    console: bool,
}

impl Coordinator {
    pub fn with_config(config: Arc<SyncConfig>) -> Self {
        Self {
            config,
            shutdown_rx: None,
            console: false,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Read operator commands from stdin while running.
    pub fn with_console(mut self) -> Self {
        self.console = true;
        self
    }

    /// Run the actor system until shutdown.
    pub async fn run(mut self) -> Result<()> {
        let (sync_tx, sync_rx) = mpsc::channel::<SyncMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
        let active = Arc::new(ActiveComponents::new());
        let serve = &self.config.serve;

        let addr = crate::reload::server::start_ws_server(serve.interface, serve.port, ws_tx.clone())
            .context("websocket server failed")?;
        log_listening(addr);

        // Watch before the initial sync so edits made meanwhile are queued
        let fs_actor = if serve.watch {
            let pairing = PathPairing::from_config(&self.config.sync);
            let actor = FsActor::new(
                pairing,
                self.config.sync.debounce(),
                Arc::clone(&active),
                sync_tx.clone(),
            )
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
            Some(actor)
        } else {
            crate::log!("watch"; "disabled, serving stored components only");
            None
        };

        let engine = SyncEngine::open(&self.config)?;
        let initial = engine.initial_changes();
        let ws_actor = WsActor::new(
            ws_rx,
            sync_tx.clone(),
            Arc::clone(&active),
            engine.session_id(),
            serve.max_clients,
        );
        let sync_actor = SyncActor::new(engine, sync_rx, ws_tx.clone());

        if !initial.is_empty() {
            crate::debug!("actor"; "initial sync of {} files", initial.len());
            sync_tx
                .send(SyncMsg::Changes(initial))
                .await
                .map_err(|_| anyhow::anyhow!("sync actor stopped before the initial sync"))?;
        }

        if self.console
            && let Err(e) = super::console::spawn(sync_tx.clone())
        {
            crate::log!("error"; "console unavailable: {}", e);
        }

        crate::debug!("actor"; "start");
        let shutdown_rx = self.shutdown_rx.take();
        runtime::run_actors(fs_actor, sync_actor, ws_actor, sync_tx, ws_tx, shutdown_rx).await?;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}

fn log_listening(addr: SocketAddr) {
    crate::log!("serve"; "clients connect to ws://{}", addr);
}
