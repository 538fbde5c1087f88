use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{Body, Error as LambdaError, Response, http::StatusCode};
use super::model::GalleryItem;
use super::service::get_item;
use crate::storage::public_url;

/// Item as the admin panel renders it: the stored row plus its public URL
pub fn item_body(item: &GalleryItem, asset_base_url: &str) -> Result<serde_json::Value, serde_json::Error> {
    let mut body = serde_json::to_value(item)?;
    body["url"] = serde_json::json!(public_url(asset_base_url, &item.locator));
    Ok(body)
}

fn respond(status: StatusCode, body: serde_json::Value) -> Result<Response<Body>, LambdaError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

/// HTTP Handler: GET /projects/{pid}/images/{id}
pub async fn get_gallery_item_handler(
    client: &DynamoClient,
    table_name: &str,
    asset_base_url: &str,
    project_id: &str,
    image_id: &str,
) -> Result<Response<Body>, LambdaError> {
    match get_item(client, table_name, project_id, image_id).await {
        Ok(item) => respond(StatusCode::OK, item_body(&item, asset_base_url)?),
        Err(e) if e == "Image not found" => respond(StatusCode::NOT_FOUND, serde_json::json!({"error": e})),
        Err(e) => {
            tracing::error!(
                "get_gallery_item_handler failed: project_id={}, image_id={}, error={}",
                project_id,
                image_id,
                e
            );
            respond(StatusCode::SERVICE_UNAVAILABLE, serde_json::json!({"error": e}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_body_carries_public_url() {
        let item = GalleryItem {
            image_id: "i1".to_string(),
            project_id: "p1".to_string(),
            locator: "projects/p1/i1.png".to_string(),
            label: "Hero".to_string(),
            position: 2,
            uploaded_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let body = item_body(&item, "https://cdn.example.com/").unwrap();
        assert_eq!(body["url"], "https://cdn.example.com/projects/p1/i1.png");
        assert_eq!(body["position"], 2);
        assert_eq!(body["image_id"], "i1");
    }
}
