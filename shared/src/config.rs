use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub table_name: String,
    pub bucket_name: String,
    /// Public origin assets are served from, e.g. a CloudFront distribution
    pub asset_base_url: String,
    pub saved_display: Duration,
    /// How long one request may hold a project's gallery for writing
    pub lease_ttl: Duration,
    /// Value of Access-Control-Allow-Origin for the admin panel
    pub allowed_origin: String,
}

impl Config {
    pub fn load() -> Result<Self, String> {
        let bucket_name: String = try_load("S3_BUCKET_NAME", "folio-assets")?;
        let default_base = format!("https://{}.s3.amazonaws.com", bucket_name);

        Ok(Self {
            table_name: try_load("TABLE_NAME", "folio")?,
            asset_base_url: try_load("ASSET_BASE_URL", &default_base)?,
            bucket_name,
            saved_display: Duration::from_millis(try_load("SAVED_DISPLAY_MS", "1500")?),
            lease_ttl: Duration::from_millis(try_load("GALLERY_LEASE_MS", "30000")?),
            allowed_origin: try_load("ALLOWED_ORIGIN", "*")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            format!("Environment misconfigured: {key}: {e}")
        })
}
