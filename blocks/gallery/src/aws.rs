use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use folio_atoms::media::{self, GalleryItem};
use folio_atoms::storage;
use std::time::Duration;

use crate::store::{AssetStore, GalleryStore};

/// Gallery rows in the single DynamoDB table
#[derive(Clone)]
pub struct DynamoGalleryStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoGalleryStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl GalleryStore for DynamoGalleryStore {
    async fn list_items(&self, project_id: &str) -> Result<Vec<GalleryItem>, String> {
        media::load_items_for_project(&self.client, &self.table_name, project_id).await
    }

    async fn create_item(&self, item: &GalleryItem) -> Result<(), String> {
        media::create_item(&self.client, &self.table_name, item).await
    }

    async fn update_position(&self, project_id: &str, image_id: &str, position: u32) -> Result<(), String> {
        media::update_position(&self.client, &self.table_name, project_id, image_id, position).await
    }

    async fn update_label(&self, project_id: &str, image_id: &str, label: &str) -> Result<(), String> {
        media::update_label(&self.client, &self.table_name, project_id, image_id, label).await
    }

    async fn delete_item(&self, project_id: &str, image_id: &str) -> Result<(), String> {
        media::delete_item(&self.client, &self.table_name, project_id, image_id).await
    }

    async fn acquire_lease(&self, project_id: &str, holder: &str, ttl: Duration) -> Result<bool, String> {
        media::acquire_gallery_lease(&self.client, &self.table_name, project_id, holder, ttl).await
    }

    async fn release_lease(&self, project_id: &str, holder: &str) -> Result<(), String> {
        media::release_gallery_lease(&self.client, &self.table_name, project_id, holder).await
    }
}

/// Image binaries in S3, served from `base_url`
#[derive(Clone)]
pub struct S3AssetStore {
    client: S3Client,
    bucket_name: String,
    base_url: String,
}

impl S3AssetStore {
    pub fn new(client: S3Client, bucket_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn put_asset(
        &self,
        project_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, String> {
        storage::put_asset(&self.client, &self.bucket_name, project_id, file_name, content_type, bytes).await
    }

    async fn delete_asset(&self, locator: &str) -> Result<(), String> {
        storage::delete_asset(&self.client, &self.bucket_name, locator).await
    }

    fn public_url(&self, locator: &str) -> String {
        storage::public_url(&self.base_url, locator)
    }
}
