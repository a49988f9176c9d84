//! FileSystem Actor
//!
//! Watches both source roots and feeds the change queue. The queue is
//! drained on a timer once entries have been quiet for the debounce window,
//! and each drained batch goes to the SyncActor.
//!
//! Architecture:
//! ```text
//! Watcher → Classifier (pairing, priority) → ChangeQueue (debounce) → SyncMsg
//! ```

use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::SyncMsg;
use crate::core::Representation;
use crate::engine::PathPairing;
use crate::queue::ChangeQueue;
use crate::reload::ActiveComponents;

// Raw notify event -> FileEvent.
mod classifier;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

use classifier::EventClassifier;
use watch_roots::WatchRoots;

/// Idle wake-up interval when the queue is empty
const IDLE_TICK: Duration = Duration::from_secs(1);

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    sync_tx: mpsc::Sender<SyncMsg>,
    classifier: EventClassifier,
    queue: ChangeQueue,
    debounce: Duration,
}

impl FsActor {
    /// Create the actor and start watching right away.
    ///
    /// Events buffer in the notify channel while the caller runs the
    /// initial sync, so nothing written in between is lost.
    pub fn new(
        pairing: PathPairing,
        debounce: Duration,
        active: Arc<ActiveComponents>,
        sync_tx: mpsc::Sender<SyncMsg>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let roots = vec![
            pairing.root(Representation::A).to_path_buf(),
            pairing.root(Representation::B).to_path_buf(),
        ];
        let mut watch_roots = WatchRoots::new(roots);
        watch_roots.attach_existing(&mut watcher)?;
        crate::debug!("watch"; "{} roots attached", watch_roots.attached_count());

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            sync_tx,
            classifier: EventClassifier::new(pairing, active),
            queue: ChangeQueue::new(),
            debounce,
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            sync_tx,
            classifier,
            mut queue,
            debounce,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify is sync: poll it on a thread and forward
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            let sleep = queue.next_ready_in(debounce).unwrap_or(IDLE_TICK);
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => {
                    let now = crate::utils::time::now_ms();
                    for (event, priority) in classifier.classify(&event, now) {
                        queue.enqueue(event, priority);
                    }
                }
                _ = tokio::time::sleep(sleep) => {
                    if crate::core::is_shutdown() {
                        break;
                    }
                    watch_roots.maintain(&mut watcher);
                    if dispatch(&mut queue, debounce, &sync_tx).await.is_err() {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "stopped");
    }
}

/// Send every quiet entry as one batch.
///
/// Returns `Err(())` if the SyncActor shut down
async fn dispatch(
    queue: &mut ChangeQueue,
    debounce: Duration,
    sync_tx: &mpsc::Sender<SyncMsg>,
) -> Result<(), ()> {
    let batch = queue.drain(debounce);
    if batch.is_empty() {
        return Ok(());
    }
    crate::debug!("watch"; "dispatch {} changes ({} still pending)", batch.len(), queue.len());
    sync_tx.send(SyncMsg::Changes(batch)).await.map_err(|_| ())
}
