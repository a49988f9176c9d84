use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::FsActor;
use crate::actor::messages::{SyncMsg, WsMsg};
use crate::actor::sync::SyncActor;
use crate::actor::ws::WsActor;

/// Grace period for the SyncActor to finish its current batch
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Run all actors concurrently.
pub(super) async fn run_actors(
    fs: Option<FsActor>,
    sync: SyncActor,
    ws: WsActor,
    sync_tx: mpsc::Sender<SyncMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) -> Result<()> {
    let sync_handle = tokio::spawn(async move { sync.run().await });
    let ws_handle = tokio::spawn(async move { ws.run().await });
    let fs_handle = fs.map(|fs| tokio::spawn(async move { fs.run().await }));

    if let Some(rx) = shutdown_rx {
        loop {
            if rx.try_recv().is_ok() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    } else {
        let _ = ws_handle.await;
        return Ok(());
    }

    crate::debug!("actor"; "sending shutdown");
    let _ = sync_tx.send(SyncMsg::Shutdown).await;
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, sync_handle).await;

    let _ = ws_tx.send(WsMsg::Shutdown).await;
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, ws_handle).await;

    // FsActor notices the shutdown flag on its next tick
    if let Some(handle) = fs_handle {
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
    Ok(())
}
