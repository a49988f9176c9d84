//! `twinsync serve`: watch, sync and push to live clients.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actor::Coordinator;
use crate::config::SyncConfig;

/// Tokio workers for the actor system; conversions run on the rayon pool
const RUNTIME_WORKERS: usize = 2;

/// Run the actor system until Ctrl+C.
pub fn serve(config: SyncConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(1);
    crate::core::register_shutdown(shutdown_tx);

    crate::log!(
        "serve";
        "syncing {} <-> {}",
        config.root_relative(&config.sync.a_root).display(),
        config.root_relative(&config.sync.b_root).display()
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(RUNTIME_WORKERS)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let coordinator = Coordinator::with_config(Arc::new(config))
        .with_shutdown_signal(shutdown_rx)
        .with_console();
    rt.block_on(coordinator.run())
}
