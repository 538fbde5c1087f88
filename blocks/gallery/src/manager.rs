use folio_atoms::media::{self, GalleryItem};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::batch::{PersistBatch, Write};
use crate::error::{GalleryError, GalleryResult};
use crate::reorder::{move_to, renumber};
use crate::status::{SaveStatus, SaveTracker};
use crate::store::{AssetStore, GalleryStore};

/// Ordered gallery of one project.
///
/// Mutations take `&mut self`, so position assignment for one operation is
/// always computed from the result of the previous one. Persistence is
/// handed back as a [`PersistBatch`] that may be awaited later, alongside
/// or after batches from later operations.
pub struct GalleryManager<S, A> {
    project_id: String,
    items: Vec<GalleryItem>,
    store: Arc<S>,
    assets: Arc<A>,
    tracker: Arc<SaveTracker>,
}

impl<S: GalleryStore, A: AssetStore> GalleryManager<S, A> {
    /// Empty gallery for a project that has no images yet
    pub fn new(
        project_id: &str,
        store: Arc<S>,
        assets: Arc<A>,
        saved_display: Duration,
    ) -> GalleryResult<Self> {
        if project_id.trim().is_empty() {
            return Err(GalleryError::MissingOwner);
        }

        Ok(Self {
            project_id: project_id.to_string(),
            items: Vec::new(),
            store,
            assets,
            tracker: SaveTracker::new(saved_display),
        })
    }

    /// Load the stored gallery. Positions are normalized to `0..n-1` locally;
    /// rows whose stored position disagreed are re-sent by the next batch.
    pub async fn load(
        project_id: &str,
        store: Arc<S>,
        assets: Arc<A>,
        saved_display: Duration,
    ) -> GalleryResult<Self> {
        let mut manager = Self::new(project_id, store, assets, saved_display)?;

        let mut items = manager
            .store
            .list_items(project_id)
            .await
            .map_err(GalleryError::UpstreamUnavailable)?;
        media::sort_by_position(&mut items);

        let stale = renumber(&mut items);
        if !stale.is_empty() {
            tracing::warn!(
                "Gallery positions out of line on load: project_id={}, stale={:?}",
                project_id,
                stale
            );
            manager.tracker.mark_pending(stale.iter().map(String::as_str));
        }

        manager.items = items;
        Ok(manager)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn status(&self) -> SaveStatus {
        self.tracker.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.tracker.subscribe()
    }

    /// Ids whose remote position is known to lag the local order
    pub fn pending_ids(&self) -> Vec<String> {
        self.tracker.pending()
    }

    pub fn public_url(&self, locator: &str) -> String {
        self.assets.public_url(locator)
    }

    pub fn index_of(&self, image_id: &str) -> GalleryResult<usize> {
        self.items
            .iter()
            .position(|item| item.image_id == image_id)
            .ok_or_else(|| GalleryError::NotFound(image_id.to_string()))
    }

    /// Attach a stored asset at the end of the gallery.
    ///
    /// The item is in the local list while its create write runs and is taken
    /// back out if that write fails.
    pub async fn append(&mut self, locator: String, label: Option<String>) -> GalleryResult<GalleryItem> {
        let item = GalleryItem::new(
            &self.project_id,
            locator,
            label.unwrap_or_default(),
            self.items.len() as u32,
        );
        self.items.push(item.clone());

        if let Err(e) = self.store.create_item(&item).await {
            tracing::error!(
                "Gallery append failed: project_id={}, image_id={}, error={}",
                self.project_id,
                item.image_id,
                e
            );
            self.items.retain(|i| i.image_id != item.image_id);
            return Err(GalleryError::PersistenceFailed {
                failed_ids: vec![item.image_id],
            });
        }

        tracing::info!(
            "Gallery item appended: project_id={}, image_id={}, position={}",
            self.project_id,
            item.image_id,
            item.position
        );

        // Piggyback repairs left over from earlier failed writes
        let repair = self.position_batch(Vec::new());
        if !repair.is_empty() {
            if let Err(e) = repair.persist().await {
                tracing::warn!("Gallery repair after append failed: project_id={}, error={}", self.project_id, e);
            }
        }

        Ok(item)
    }

    /// Remove an item and close the gap it leaves
    pub fn remove(&mut self, image_id: &str) -> GalleryResult<PersistBatch<S, A>> {
        let index = self.index_of(image_id)?;
        let removed = self.items.remove(index);
        self.tracker.forget(&removed.image_id);

        let changed = renumber(&mut self.items);
        tracing::info!(
            "Gallery item removed: project_id={}, image_id={}, renumbered={}",
            self.project_id,
            removed.image_id,
            changed.len()
        );

        let mut writes = vec![
            Write::DeleteRow {
                image_id: removed.image_id.clone(),
            },
            Write::DeleteAsset {
                image_id: removed.image_id,
                locator: removed.locator,
            },
        ];
        writes.extend(self.position_writes(changed));
        Ok(self.batch(writes))
    }

    /// Move an item to `new_index`, shifting everything in between by one
    pub fn reorder(&mut self, image_id: &str, new_index: usize) -> GalleryResult<PersistBatch<S, A>> {
        let from = self.index_of(image_id)?;
        if new_index >= self.items.len() {
            return Err(GalleryError::InvalidIndex {
                index: new_index,
                len: self.items.len(),
            });
        }
        if from == new_index {
            return Ok(self.batch(Vec::new()));
        }

        move_to(&mut self.items, from, new_index);
        let changed = renumber(&mut self.items);
        tracing::info!(
            "Gallery reordered: project_id={}, image_id={}, from={}, to={}",
            self.project_id,
            image_id,
            from,
            new_index
        );

        Ok(self.position_batch(changed))
    }

    /// Swap with the previous item. No-op at the top.
    pub fn move_up(&mut self, image_id: &str) -> GalleryResult<PersistBatch<S, A>> {
        let index = self.index_of(image_id)?;
        self.reorder(image_id, index.saturating_sub(1))
    }

    /// Swap with the next item. No-op at the bottom.
    pub fn move_down(&mut self, image_id: &str) -> GalleryResult<PersistBatch<S, A>> {
        let index = self.index_of(image_id)?;
        let last = self.items.len().saturating_sub(1);
        self.reorder(image_id, (index + 1).min(last))
    }

    /// Re-send the position of every item in the current order
    pub fn retry(&self) -> PersistBatch<S, A> {
        let all = self.items.iter().map(|item| item.image_id.clone()).collect();
        self.position_batch(all)
    }

    /// Put the list back into `order`, the order a client kept after a failed
    /// save, then re-send every position. `order` must name each stored item
    /// exactly once; otherwise nothing changes and the caller must reload.
    pub fn restore_order(&mut self, order: &[String]) -> GalleryResult<PersistBatch<S, A>> {
        let stale = || {
            GalleryError::Conflict(format!(
                "order does not match the stored gallery of project {}",
                self.project_id
            ))
        };

        let mut seen = HashSet::new();
        let mut picks = Vec::with_capacity(order.len());
        for image_id in order {
            let index = self.index_of(image_id).map_err(|_| stale())?;
            if !seen.insert(index) {
                return Err(stale());
            }
            picks.push(index);
        }
        if picks.len() != self.items.len() {
            return Err(stale());
        }

        let mut slots: Vec<Option<GalleryItem>> = std::mem::take(&mut self.items).into_iter().map(Some).collect();
        self.items = picks.into_iter().filter_map(|index| slots[index].take()).collect();
        let changed = renumber(&mut self.items);
        tracing::info!(
            "Gallery order restored: project_id={}, moved={}",
            self.project_id,
            changed.len()
        );

        Ok(self.retry())
    }

    /// Change alt text. Independent of ordering; does not touch the save status.
    pub async fn update_label(&mut self, image_id: &str, label: &str) -> GalleryResult<()> {
        let index = self.index_of(image_id)?;
        self.items[index].label = label.to_string();

        self.store
            .update_label(&self.project_id, image_id, label)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Gallery label update failed: project_id={}, image_id={}, error={}",
                    self.project_id,
                    image_id,
                    e
                );
                GalleryError::PersistenceFailed {
                    failed_ids: vec![image_id.to_string()],
                }
            })
    }

    fn position_batch(&self, changed: Vec<String>) -> PersistBatch<S, A> {
        let writes = self.position_writes(changed);
        self.batch(writes)
    }

    /// Position writes for `changed` plus anything still pending, in list order
    fn position_writes(&self, changed: Vec<String>) -> Vec<Write> {
        let mut wanted: HashSet<String> = changed.into_iter().collect();
        wanted.extend(self.tracker.pending());

        self.items
            .iter()
            .filter(|item| wanted.contains(&item.image_id))
            .map(|item| Write::Position {
                image_id: item.image_id.clone(),
                position: item.position,
            })
            .collect()
    }

    fn batch(&self, writes: Vec<Write>) -> PersistBatch<S, A> {
        PersistBatch::new(
            &self.project_id,
            writes,
            Arc::clone(&self.store),
            Arc::clone(&self.assets),
            Arc::clone(&self.tracker),
        )
    }
}
