use std::time::Duration;

use crate::error::{GalleryError, GalleryResult};
use crate::store::GalleryStore;

/// How long a writer may hold a gallery before others may take it over
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(30);

/// Exclusive write access to one project's gallery.
///
/// Writers that load, mutate and persist under a lease never compute
/// positions from a snapshot another writer is about to change.
#[must_use = "a lease should be released once the writes settle"]
pub struct GalleryLease {
    project_id: String,
    holder: String,
}

impl GalleryLease {
    pub async fn acquire<S: GalleryStore + ?Sized>(
        store: &S,
        project_id: &str,
        ttl: Duration,
    ) -> GalleryResult<Self> {
        if project_id.trim().is_empty() {
            return Err(GalleryError::MissingOwner);
        }

        let holder = uuid::Uuid::new_v4().to_string();
        match store.acquire_lease(project_id, &holder, ttl).await {
            Ok(true) => Ok(Self {
                project_id: project_id.to_string(),
                holder,
            }),
            Ok(false) => {
                tracing::info!("Gallery busy, rejecting writer: project_id={}", project_id);
                Err(GalleryError::Conflict(format!(
                    "gallery {} is being edited, retry shortly",
                    project_id
                )))
            }
            Err(e) => Err(GalleryError::UpstreamUnavailable(e)),
        }
    }

    /// A failed release is only logged; the lease lapses after its ttl
    pub async fn release<S: GalleryStore + ?Sized>(self, store: &S) {
        if let Err(e) = store.release_lease(&self.project_id, &self.holder).await {
            tracing::warn!(
                "Gallery lease not released: project_id={}, error={}",
                self.project_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::MemoryStore;

    #[tokio::test]
    async fn second_writer_is_turned_away_until_release() {
        let store = MemoryStore::seeded("p1", &["a"]);

        let first = GalleryLease::acquire(store.as_ref(), "p1", DEFAULT_LEASE_TTL).await.unwrap();
        let second = GalleryLease::acquire(store.as_ref(), "p1", DEFAULT_LEASE_TTL).await;
        assert!(matches!(second, Err(GalleryError::Conflict(_))));

        first.release(store.as_ref()).await;
        assert!(!store.is_leased());
        let third = GalleryLease::acquire(store.as_ref(), "p1", DEFAULT_LEASE_TTL).await.unwrap();
        third.release(store.as_ref()).await;
    }

    #[tokio::test]
    async fn blank_project_is_rejected_before_any_io() {
        let store = MemoryStore::seeded("p1", &[]);
        let result = GalleryLease::acquire(store.as_ref(), "", DEFAULT_LEASE_TTL).await;
        assert!(matches!(result, Err(GalleryError::MissingOwner)));
        assert!(!store.is_leased());
    }
}
