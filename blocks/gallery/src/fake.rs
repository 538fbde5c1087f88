//! In-memory stores with failure injection for tests.

use async_trait::async_trait;
use folio_atoms::media::GalleryItem;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::store::{AssetStore, GalleryStore};

#[derive(Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<BTreeMap<String, GalleryItem>>,
    log: Mutex<Vec<String>>,
    fail_ids: Mutex<HashSet<String>>,
    fail_create: AtomicBool,
    fail_list: AtomicBool,
    stall_writes: AtomicBool,
    yield_on_list: AtomicBool,
    lease: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Rows `ids[i]` at position `i`
    pub(crate) fn seeded(project_id: &str, ids: &[&str]) -> Arc<Self> {
        let store = Self::default();
        {
            let mut rows = store.rows.lock().unwrap();
            for (i, id) in ids.iter().enumerate() {
                rows.insert(id.to_string(), row(project_id, id, i as u32));
            }
        }
        Arc::new(store)
    }

    pub(crate) fn with_rows(items: Vec<GalleryItem>) -> Arc<Self> {
        let store = Self::default();
        store
            .rows
            .lock()
            .unwrap()
            .extend(items.into_iter().map(|i| (i.image_id.clone(), i)));
        Arc::new(store)
    }

    pub(crate) fn fail_writes_for(&self, image_id: &str) {
        self.fail_ids.lock().unwrap().insert(image_id.to_string());
    }

    pub(crate) fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_lists(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Position writes never complete while set
    pub(crate) fn stall_writes(&self, stall: bool) {
        self.stall_writes.store(stall, Ordering::SeqCst);
    }

    /// Hand control back to the runtime in the middle of every list
    pub(crate) fn yield_on_list(&self, yield_now: bool) {
        self.yield_on_list.store(yield_now, Ordering::SeqCst);
    }

    pub(crate) fn is_leased(&self) -> bool {
        self.lease.lock().unwrap().is_some()
    }

    pub(crate) fn heal(&self) {
        self.fail_ids.lock().unwrap().clear();
        self.fail_creates(false);
        self.fail_lists(false);
        self.stall_writes(false);
    }

    /// Every write attempted since the last call, e.g. `position:c=0`
    pub(crate) fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    /// Stored (id, position) pairs sorted by position
    pub(crate) fn remote_order(&self) -> Vec<(String, u32)> {
        let mut order: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .map(|i| (i.image_id.clone(), i.position))
            .collect();
        order.sort_by_key(|(_, position)| *position);
        order
    }

    pub(crate) fn label_of(&self, image_id: &str) -> Option<String> {
        self.rows.lock().unwrap().get(image_id).map(|i| i.label.clone())
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn check(&self, image_id: &str) -> Result<(), String> {
        if self.fail_ids.lock().unwrap().contains(image_id) {
            Err(format!("injected failure for {}", image_id))
        } else {
            Ok(())
        }
    }
}

pub(crate) fn row(project_id: &str, image_id: &str, position: u32) -> GalleryItem {
    GalleryItem {
        image_id: image_id.to_string(),
        project_id: project_id.to_string(),
        locator: format!("projects/{}/{}.jpg", project_id, image_id),
        label: format!("{} alt", image_id),
        position,
        uploaded_at: format!("2024-01-01T00:00:{:02}Z", position),
    }
}

#[async_trait]
impl GalleryStore for MemoryStore {
    async fn list_items(&self, project_id: &str) -> Result<Vec<GalleryItem>, String> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err("connection refused".to_string());
        }
        if self.yield_on_list.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_item(&self, item: &GalleryItem) -> Result<(), String> {
        self.record(format!("create:{}={}", item.image_id, item.position));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err("injected create failure".to_string());
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&item.image_id) {
            return Err("ConditionalCheckFailed".to_string());
        }
        rows.insert(item.image_id.clone(), item.clone());
        Ok(())
    }

    async fn update_position(&self, _project_id: &str, image_id: &str, position: u32) -> Result<(), String> {
        self.record(format!("position:{}={}", image_id, position));
        if self.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check(image_id)?;
        match self.rows.lock().unwrap().get_mut(image_id) {
            Some(row) => {
                row.position = position;
                Ok(())
            }
            None => Err("ConditionalCheckFailed".to_string()),
        }
    }

    async fn update_label(&self, _project_id: &str, image_id: &str, label: &str) -> Result<(), String> {
        self.record(format!("label:{}", image_id));
        self.check(image_id)?;
        match self.rows.lock().unwrap().get_mut(image_id) {
            Some(row) => {
                row.label = label.to_string();
                Ok(())
            }
            None => Err("ConditionalCheckFailed".to_string()),
        }
    }

    async fn delete_item(&self, _project_id: &str, image_id: &str) -> Result<(), String> {
        self.record(format!("delete:{}", image_id));
        self.check(image_id)?;
        self.rows.lock().unwrap().remove(image_id);
        Ok(())
    }

    async fn acquire_lease(&self, _project_id: &str, holder: &str, _ttl: Duration) -> Result<bool, String> {
        let mut lease = self.lease.lock().unwrap();
        match lease.as_deref() {
            Some(current) if current != holder => Ok(false),
            _ => {
                *lease = Some(holder.to_string());
                Ok(true)
            }
        }
    }

    async fn release_lease(&self, _project_id: &str, holder: &str) -> Result<(), String> {
        let mut lease = self.lease.lock().unwrap();
        if lease.as_deref() == Some(holder) {
            *lease = None;
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryAssets {
    objects: Mutex<HashSet<String>>,
    fail_put: AtomicBool,
}

impl MemoryAssets {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_puts(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn contains(&self, locator: &str) -> bool {
        self.objects.lock().unwrap().contains(locator)
    }

    pub(crate) fn insert(&self, locator: &str) {
        self.objects.lock().unwrap().insert(locator.to_string());
    }
}

#[async_trait]
impl AssetStore for MemoryAssets {
    async fn put_asset(
        &self,
        project_id: &str,
        file_name: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, String> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err("injected put failure".to_string());
        }
        let locator = format!("projects/{}/{}", project_id, file_name);
        self.insert(&locator);
        Ok(locator)
    }

    async fn delete_asset(&self, locator: &str) -> Result<(), String> {
        self.objects.lock().unwrap().remove(locator);
        Ok(())
    }

    fn public_url(&self, locator: &str) -> String {
        format!("https://cdn.test/{}", locator)
    }
}
