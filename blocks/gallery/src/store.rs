use async_trait::async_trait;
use folio_atoms::media::GalleryItem;
use std::time::Duration;

/// Row store for gallery items, keyed by project and image id.
///
/// Errors are upstream messages; the manager decides whether they mean an
/// outage or a failed write.
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// All rows for a project, in stored position order.
    async fn list_items(&self, project_id: &str) -> Result<Vec<GalleryItem>, String>;

    async fn create_item(&self, item: &GalleryItem) -> Result<(), String>;

    /// Overwrite the absolute position of one row. Repeating the call is harmless.
    async fn update_position(&self, project_id: &str, image_id: &str, position: u32) -> Result<(), String>;

    async fn update_label(&self, project_id: &str, image_id: &str, label: &str) -> Result<(), String>;

    async fn delete_item(&self, project_id: &str, image_id: &str) -> Result<(), String>;

    /// Claim exclusive write access to a project's gallery for `ttl`.
    /// `Ok(false)` when another holder has an unexpired lease.
    async fn acquire_lease(&self, project_id: &str, holder: &str, ttl: Duration) -> Result<bool, String>;

    /// Give the lease back early. A lease held by someone else is left alone.
    async fn release_lease(&self, project_id: &str, holder: &str) -> Result<(), String>;
}

/// Binary asset store. A locator is whatever `put_asset` hands back.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn put_asset(
        &self,
        project_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, String>;

    async fn delete_asset(&self, locator: &str) -> Result<(), String>;

    /// Displayable URL for a locator. Must not perform I/O.
    fn public_url(&self, locator: &str) -> String;
}
