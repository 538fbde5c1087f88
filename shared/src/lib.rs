pub mod config;

use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use gallery_block::{DynamoGalleryStore, GalleryContext, S3AssetStore};

pub use config::Config;

/// Clients and settings built once per Lambda cold start
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub config: Config,
    pub gallery: GalleryContext<DynamoGalleryStore, S3AssetStore>,
}

impl AppState {
    pub async fn from_env() -> Result<Self, String> {
        let config = Config::load()?;
        let aws_config = aws_config::load_from_env().await;
        let dynamo_client = DynamoClient::new(&aws_config);
        let s3_client = S3Client::new(&aws_config);

        let gallery = GalleryContext {
            store: Arc::new(DynamoGalleryStore::new(dynamo_client.clone(), config.table_name.clone())),
            assets: Arc::new(S3AssetStore::new(
                s3_client,
                config.bucket_name.clone(),
                config.asset_base_url.clone(),
            )),
            saved_display: config.saved_display,
            lease_ttl: config.lease_ttl,
        };

        tracing::info!(
            "AppState ready: table={}, bucket={}",
            config.table_name,
            config.bucket_name
        );

        Ok(Self {
            dynamo_client,
            config,
            gallery,
        })
    }
}
