use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;

/// Object key for a new upload: projects/{project_id}/{uuid}.{ext}
pub fn asset_key(project_id: &str, file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    let id = uuid::Uuid::new_v4();
    match ext {
        Some(ext) => format!("projects/{}/{}.{}", project_id, id, ext),
        None => format!("projects/{}/{}", project_id, id),
    }
}

/// Public URL of a stored asset. Pure string derivation, no request is made.
pub fn public_url(base_url: &str, locator: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        locator.trim_start_matches('/')
    )
}

/// Upload an asset under the project prefix and return its locator
pub async fn put_asset(
    s3_client: &S3Client,
    bucket_name: &str,
    project_id: &str,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<String, String> {
    let key = asset_key(project_id, file_name);

    s3_client
        .put_object()
        .bucket(bucket_name)
        .key(&key)
        .content_type(content_type)
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("S3 put_object failed for key {}: {}", key, e);
            format!("S3 put_object error: {}", e)
        })?;

    Ok(key)
}

/// Delete an asset by locator. Deleting a missing key succeeds.
pub async fn delete_asset(
    s3_client: &S3Client,
    bucket_name: &str,
    locator: &str,
) -> Result<(), String> {
    s3_client
        .delete_object()
        .bucket(bucket_name)
        .key(locator)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("S3 delete_object failed for key {}: {}", locator, e);
            format!("S3 delete_object error: {}", e)
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_key_keeps_lowercased_extension() {
        let key = asset_key("p1", "Hero Shot.JPG");
        assert!(key.starts_with("projects/p1/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn asset_key_drops_odd_extensions() {
        let key = asset_key("p1", "archive.tar/../x");
        assert!(!key.contains(".."));
        let key = asset_key("p1", "noext");
        assert_eq!(key.matches('.').count(), 0);
    }

    #[test]
    fn public_url_joins_with_single_slash() {
        assert_eq!(
            public_url("https://cdn.example.com/", "/projects/p1/a.png"),
            "https://cdn.example.com/projects/p1/a.png"
        );
        assert_eq!(
            public_url("https://cdn.example.com", "projects/p1/a.png"),
            "https://cdn.example.com/projects/p1/a.png"
        );
    }
}
