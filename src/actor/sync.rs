//! Sync Actor
//!
//! Single owner of the [`SyncEngine`]: every store, cache and conflict
//! detector mutation happens here, one batch at a time. Batches run on the
//! blocking pool so the runtime keeps serving clients meanwhile.

use tokio::sync::mpsc;

use super::messages::{SyncMsg, WsMsg};
use crate::conflict::ResolutionStrategy;
use crate::engine::{SyncEngine, SyncResult, SyncStatus};
use crate::logger::WatchStatus;
use crate::queue::QueuedChange;

pub struct SyncActor {
    rx: mpsc::Receiver<SyncMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    engine: Option<SyncEngine>,
    status: WatchStatus,
}

impl SyncActor {
    pub fn new(engine: SyncEngine, rx: mpsc::Receiver<SyncMsg>, ws_tx: mpsc::Sender<WsMsg>) -> Self {
        Self {
            rx,
            ws_tx,
            engine: Some(engine),
            status: WatchStatus::new(),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let keep_going = match msg {
                SyncMsg::Changes(batch) => self.handle_changes(batch).await,
                SyncMsg::ClientConnected {
                    connection_id,
                    component,
                } => self.handle_connected(connection_id, component).await,
                SyncMsg::Resync {
                    connection_id,
                    component,
                } => self.handle_resync(connection_id, component).await,
                SyncMsg::Resolve {
                    logical_id,
                    strategy,
                } => self.handle_resolve(logical_id, strategy).await,
                SyncMsg::Status => {
                    if let Some(engine) = self.engine.as_ref() {
                        crate::cli::status::print_status(engine);
                    }
                    true
                }
                SyncMsg::Shutdown => false,
            };
            if !keep_going {
                break;
            }
        }
        crate::debug!("sync"; "stopped");
    }

    async fn handle_changes(&mut self, batch: Vec<QueuedChange>) -> bool {
        let Some(mut engine) = self.engine.take() else {
            return false;
        };

        let joined = tokio::task::spawn_blocking(move || {
            let results = engine.process_changes(&batch);
            (engine, results)
        })
        .await;

        let results = match joined {
            Ok((engine, results)) => {
                self.engine = Some(engine);
                results
            }
            Err(e) => {
                crate::log!("error"; "sync batch panicked: {}", e);
                return false;
            }
        };

        for result in results {
            self.report(&result);
            if let Some(message) = result.update
                && self
                    .ws_tx
                    .send(WsMsg::Push {
                        component: result.ir_id,
                        message,
                    })
                    .await
                    .is_err()
            {
                return false;
            }
        }
        true
    }

    async fn handle_connected(&mut self, connection_id: String, component: Option<String>) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };
        let initial_schema = engine.initial_schema(component.as_deref());
        self.ws_tx
            .send(WsMsg::Welcome {
                connection_id,
                initial_schema,
            })
            .await
            .is_ok()
    }

    async fn handle_resync(&mut self, connection_id: String, component: Option<String>) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        let updates = engine.full_updates_for(component.as_deref());
        crate::debug!("sync"; "resync {} with {} full updates", connection_id, updates.len());
        for message in updates {
            let msg = WsMsg::SendTo {
                connection_id: connection_id.clone(),
                message,
            };
            if self.ws_tx.send(msg).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn handle_resolve(&mut self, logical_id: String, strategy: ResolutionStrategy) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        let (resolution, update) = engine.resolve_component(&logical_id, strategy);
        if resolution.success {
            self.status
                .success(&format!("resolved: {} ({})", logical_id, strategy.label()));
        } else {
            let detail = resolution.error.as_deref().unwrap_or_default();
            self.status
                .error(&format!("resolve failed: {logical_id}"), detail);
            self.status.keep();
        }

        match update {
            Some(message) => self
                .ws_tx
                .send(WsMsg::Push {
                    component: Some(logical_id),
                    message,
                })
                .await
                .is_ok(),
            None => true,
        }
    }

    fn report(&mut self, result: &SyncResult) {
        let name = result
            .ir_id
            .clone()
            .unwrap_or_else(|| result.source_file.display().to_string());
        let version = result.version.map(|v| format!(" (v{v})")).unwrap_or_default();

        match result.status {
            SyncStatus::Synced | SyncStatus::Resolved => {
                self.status
                    .success(&format!("{}: {}{}", result.status.label(), name, version));
            }
            SyncStatus::Deleted => self.status.success(&format!("deleted: {name}")),
            SyncStatus::Converted => self.status.success(&format!("converted: {name}")),
            SyncStatus::Superseded => {
                crate::debug!("sync"; "superseded: {}", name);
            }
            SyncStatus::Unchanged => self.status.unchanged(&format!("unchanged: {name}")),
            SyncStatus::Conflict => {
                let detail = result
                    .conflict
                    .as_ref()
                    .map(|c| format!("type: resolve {} <use-a|use-b|manual-merge|skip>", c.logical_id))
                    .unwrap_or_default();
                self.status.warning(&format!("conflict: {name}"), &detail);
                self.status.keep();
            }
            SyncStatus::Failed => {
                let detail = result.error.as_deref().unwrap_or_default();
                self.status.error(&format!("failed: {name}"), detail);
                self.status.keep();
            }
            SyncStatus::Disabled => {
                crate::debug!("sync"; "disabled: {}", name);
            }
            SyncStatus::Ignored => {}
        }
    }
}
