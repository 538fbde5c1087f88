use folio_atoms as atoms;
use folio_shared::AppState;
use gallery_block::http as gallery;
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use std::sync::Arc;

use lambda_http::http::header::{HeaderValue, VARY};

/// Gallery endpoints under /projects/{pid}/images
#[derive(Debug, PartialEq, Eq)]
enum GalleryRoute<'a> {
    List(&'a str),
    Upload(&'a str),
    Reorder(&'a str),
    Renumber(&'a str),
    Get(&'a str, &'a str),
    Update(&'a str, &'a str),
    Delete(&'a str, &'a str),
}

fn gallery_route<'a>(method: &Method, path: &'a str) -> Option<GalleryRoute<'a>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // GET /projects/{pid}/images - list gallery in order
        (&Method::GET, ["projects", pid, "images"]) => Some(GalleryRoute::List(pid)),
        // POST /projects/{pid}/images - upload and append
        (&Method::POST, ["projects", pid, "images"]) => Some(GalleryRoute::Upload(pid)),
        // POST /projects/{pid}/images/reorder - drag-and-drop or up/down
        (&Method::POST, ["projects", pid, "images", "reorder"]) => Some(GalleryRoute::Reorder(pid)),
        // POST /projects/{pid}/images/renumber - rewrite every position
        (&Method::POST, ["projects", pid, "images", "renumber"]) => Some(GalleryRoute::Renumber(pid)),
        // GET /projects/{pid}/images/{iid} - get image row
        (&Method::GET, ["projects", pid, "images", iid]) => Some(GalleryRoute::Get(pid, iid)),
        // PATCH /projects/{pid}/images/{iid} - label and/or position
        (&Method::PATCH, ["projects", pid, "images", iid]) => Some(GalleryRoute::Update(pid, iid)),
        // DELETE /projects/{pid}/images/{iid} - remove and close the gap
        (&Method::DELETE, ["projects", pid, "images", iid]) => Some(GalleryRoute::Delete(pid, iid)),
        _ => None,
    }
}

fn with_cors_headers(mut resp: Response<Body>, allowed_origin: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(allowed_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    resp
}

/// Main Lambda handler - routes gallery requests. Authentication happens upstream.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    let allowed_origin = state.config.allowed_origin.as_str();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, allowed_origin));
    }

    let ctx = &state.gallery;
    let resp = match gallery_route(method, path) {
        Some(GalleryRoute::List(pid)) => gallery::list_images_handler(ctx, pid).await,
        Some(GalleryRoute::Upload(pid)) => gallery::upload_image_handler(ctx, pid, body).await,
        Some(GalleryRoute::Reorder(pid)) => gallery::reorder_images_handler(ctx, pid, body).await,
        Some(GalleryRoute::Renumber(pid)) => gallery::renumber_images_handler(ctx, pid, body).await,
        Some(GalleryRoute::Get(pid, iid)) => {
            atoms::media::get_gallery_item_handler(
                &state.dynamo_client,
                &state.config.table_name,
                &state.config.asset_base_url,
                pid,
                iid,
            )
            .await
        }
        Some(GalleryRoute::Update(pid, iid)) => gallery::update_image_handler(ctx, pid, iid, body).await,
        Some(GalleryRoute::Delete(pid, iid)) => gallery::delete_image_handler(ctx, pid, iid).await,
        None => not_found(),
    };

    resp.map(|r| with_cors_headers(r, allowed_origin))
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_gallery_paths() {
        assert_eq!(
            gallery_route(&Method::GET, "/projects/p1/images"),
            Some(GalleryRoute::List("p1"))
        );
        assert_eq!(
            gallery_route(&Method::POST, "/projects/p1/images/reorder"),
            Some(GalleryRoute::Reorder("p1"))
        );
        assert_eq!(
            gallery_route(&Method::POST, "/projects/p1/images/renumber/"),
            Some(GalleryRoute::Renumber("p1"))
        );
        assert_eq!(
            gallery_route(&Method::DELETE, "/projects/p1/images/i9"),
            Some(GalleryRoute::Delete("p1", "i9"))
        );
        assert_eq!(
            gallery_route(&Method::PATCH, "/projects/p1/images/i9"),
            Some(GalleryRoute::Update("p1", "i9"))
        );
    }

    #[test]
    fn unknown_paths_and_methods_do_not_route() {
        assert_eq!(gallery_route(&Method::PUT, "/projects/p1/images"), None);
        assert_eq!(gallery_route(&Method::GET, "/projects/p1"), None);
        assert_eq!(gallery_route(&Method::DELETE, "/projects/p1/images/i9/extra"), None);
    }

    #[test]
    fn cors_headers_use_configured_origin() {
        let resp = not_found().unwrap();
        let resp = with_cors_headers(resp, "https://admin.example.com");
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "https://admin.example.com"
        );
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
