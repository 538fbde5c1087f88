use futures::future::join_all;
use std::sync::Arc;

use crate::error::{GalleryError, GalleryResult};
use crate::status::SaveTracker;
use crate::store::{AssetStore, GalleryStore};

/// One remote write produced by a gallery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Position { image_id: String, position: u32 },
    DeleteRow { image_id: String },
    DeleteAsset { image_id: String, locator: String },
}

impl Write {
    pub fn image_id(&self) -> &str {
        match self {
            Write::Position { image_id, .. }
            | Write::DeleteRow { image_id }
            | Write::DeleteAsset { image_id, .. } => image_id,
        }
    }
}

/// Writes derived from the local list at the moment an operation was accepted.
///
/// Nothing reaches the store until `persist` is awaited. A batch dropped
/// without persisting leaves its position writes pending, so the next batch
/// re-sends them.
#[must_use = "a batch does nothing until persisted"]
pub struct PersistBatch<S, A> {
    project_id: String,
    seq: u64,
    writes: Vec<Write>,
    store: Arc<S>,
    assets: Arc<A>,
    tracker: Arc<SaveTracker>,
}

impl<S: GalleryStore, A: AssetStore> PersistBatch<S, A> {
    pub(crate) fn new(
        project_id: &str,
        writes: Vec<Write>,
        store: Arc<S>,
        assets: Arc<A>,
        tracker: Arc<SaveTracker>,
    ) -> Self {
        let seq = tracker.stamp(writes.iter().filter_map(|w| match w {
            Write::Position { image_id, .. } => Some(image_id.as_str()),
            _ => None,
        }));

        Self {
            project_id: project_id.to_string(),
            seq,
            writes,
            store,
            assets,
            tracker,
        }
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Fan every write out, wait for all of them, then settle the save status.
    /// An empty batch returns immediately and leaves the status untouched.
    pub async fn persist(mut self) -> GalleryResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        // Writes stay on the batch until dispatch is ours, so a drop while
        // waiting leaves them pending
        let _dispatch = self.tracker.dispatch.lock().await;
        let writes = std::mem::take(&mut self.writes);

        // A newer batch owns these positions now and may already have written them
        let (live, superseded): (Vec<_>, Vec<_>) = writes.into_iter().partition(|w| match w {
            Write::Position { image_id, .. } => !self.tracker.is_superseded(image_id, self.seq),
            _ => true,
        });
        if !superseded.is_empty() {
            tracing::info!(
                "Skipping {} superseded position writes: project_id={}, seq={}",
                superseded.len(),
                self.project_id,
                self.seq
            );
        }

        let in_flight = InFlight::begin(&self.tracker, self.seq, &live);
        let results = join_all(live.iter().map(|write| self.send(write))).await;

        let mut positions = Vec::new();
        let mut failed_ids: Vec<String> = Vec::new();
        for (write, result) in live.iter().zip(results) {
            let ok = match result {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        "Gallery write failed: project_id={}, write={:?}, error={}",
                        self.project_id,
                        write,
                        e
                    );
                    if !failed_ids.iter().any(|id| id == write.image_id()) {
                        failed_ids.push(write.image_id().to_string());
                    }
                    false
                }
            };
            if let Write::Position { image_id, .. } = write {
                positions.push((image_id.clone(), ok));
            }
        }

        in_flight.settle(&positions, &failed_ids);

        if failed_ids.is_empty() {
            tracing::info!(
                "Gallery batch persisted: project_id={}, writes={}",
                self.project_id,
                live.len()
            );
            Ok(())
        } else {
            Err(GalleryError::PersistenceFailed { failed_ids })
        }
    }

    async fn send(&self, write: &Write) -> Result<(), String> {
        match write {
            Write::Position { image_id, position } => {
                self.store.update_position(&self.project_id, image_id, *position).await
            }
            Write::DeleteRow { image_id } => self.store.delete_item(&self.project_id, image_id).await,
            Write::DeleteAsset { locator, .. } => self.assets.delete_asset(locator).await,
        }
    }
}

impl<S, A> Drop for PersistBatch<S, A> {
    fn drop(&mut self) {
        let unsent: Vec<&str> = self
            .writes
            .iter()
            .filter_map(|w| match w {
                Write::Position { image_id, .. } if !self.tracker.is_superseded(image_id, self.seq) => {
                    Some(image_id.as_str())
                }
                _ => None,
            })
            .collect();
        if !unsent.is_empty() {
            self.tracker.mark_pending(unsent);
        }
    }
}

/// A dispatched batch whose results are not in yet. Dropping it unsettled
/// (the `persist` future was cancelled) still brings the status back out of
/// `Saving` and queues its positions for the next batch.
struct InFlight {
    tracker: Arc<SaveTracker>,
    seq: u64,
    positions: Vec<String>,
    ids: Vec<String>,
    settled: bool,
}

impl InFlight {
    fn begin(tracker: &Arc<SaveTracker>, seq: u64, writes: &[Write]) -> Self {
        tracker.begin();

        let mut ids: Vec<String> = Vec::new();
        let mut positions = Vec::new();
        for write in writes {
            if let Write::Position { image_id, .. } = write {
                positions.push(image_id.clone());
            }
            if !ids.iter().any(|id| id == write.image_id()) {
                ids.push(write.image_id().to_string());
            }
        }

        Self {
            tracker: Arc::clone(tracker),
            seq,
            positions,
            ids,
            settled: false,
        }
    }

    fn settle(mut self, positions: &[(String, bool)], failed: &[String]) {
        self.settled = true;
        self.tracker.finish(self.seq, positions, failed);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!(
            "Gallery batch dropped mid-dispatch: seq={}, unconfirmed={:?}",
            self.seq,
            self.ids
        );
        self.tracker.abandon(self.seq, &self.positions, &self.ids);
    }
}
