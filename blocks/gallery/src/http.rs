use base64::{engine::general_purpose::STANDARD, Engine as _};
use folio_atoms::media::{GalleryItem, UpdateGalleryItemPayload};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::batch::PersistBatch;
use crate::error::{GalleryError, GalleryResult};
use crate::lease::GalleryLease;
use crate::manager::GalleryManager;
use crate::status::SaveStatus;
use crate::store::{AssetStore, GalleryStore};

#[derive(Debug, Deserialize)]
pub struct UploadImageRequest {
    pub file_name: String,
    pub content_type: String,
    /// Base64 encoded file bytes
    pub data: String,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Drag-and-drop sends `new_index`, the arrow buttons send `direction`
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub image_id: String,
    pub new_index: Option<usize>,
    pub direction: Option<MoveDirection>,
}

/// Manual retry. `order` is the gallery as the client last showed it; without
/// it the stored order is rewritten as loaded.
#[derive(Debug, Default, Deserialize)]
pub struct RenumberRequest {
    pub order: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ItemView<'a> {
    #[serde(flatten)]
    item: &'a GalleryItem,
    url: String,
}

#[derive(Serialize)]
struct GalleryView<'a> {
    project_id: &'a str,
    items: Vec<ItemView<'a>>,
    status: SaveStatus,
}

/// Per-request settings for the gallery handlers
#[derive(Clone)]
pub struct GalleryContext<S, A> {
    pub store: Arc<S>,
    pub assets: Arc<A>,
    pub saved_display: Duration,
    /// Upper bound on how long one request may hold a project's gallery
    pub lease_ttl: Duration,
}

impl<S: GalleryStore, A: AssetStore> GalleryContext<S, A> {
    async fn load(&self, project_id: &str) -> GalleryResult<GalleryManager<S, A>> {
        GalleryManager::load(
            project_id,
            Arc::clone(&self.store),
            Arc::clone(&self.assets),
            self.saved_display,
        )
        .await
    }

    /// Lease the gallery, then load it. The snapshot is read under the lease,
    /// so positions computed from it cannot interleave with another writer.
    async fn load_exclusive(&self, project_id: &str) -> GalleryResult<(GalleryLease, GalleryManager<S, A>)> {
        let lease = GalleryLease::acquire(self.store.as_ref(), project_id, self.lease_ttl).await?;
        match self.load(project_id).await {
            Ok(manager) => Ok((lease, manager)),
            Err(e) => {
                lease.release(self.store.as_ref()).await;
                Err(e)
            }
        }
    }
}

fn json_response(status: StatusCode, body: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(body.into())
        .map_err(Box::new)?)
}

fn gallery_body<S: GalleryStore, A: AssetStore>(manager: &GalleryManager<S, A>) -> serde_json::Value {
    let view = GalleryView {
        project_id: manager.project_id(),
        items: manager
            .items()
            .iter()
            .map(|item| ItemView {
                item,
                url: manager.public_url(&item.locator),
            })
            .collect(),
        status: manager.status(),
    };
    serde_json::to_value(&view).unwrap_or_default()
}

fn gallery_response<S: GalleryStore, A: AssetStore>(
    status: StatusCode,
    manager: &GalleryManager<S, A>,
) -> Result<Response<Body>, Error> {
    json_response(status, gallery_body(manager).to_string())
}

pub fn error_status(error: &GalleryError) -> StatusCode {
    match error {
        GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
        GalleryError::InvalidIndex { .. } | GalleryError::MissingOwner => StatusCode::BAD_REQUEST,
        GalleryError::PersistenceFailed { .. } => StatusCode::BAD_GATEWAY,
        GalleryError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GalleryError::Conflict(_) => StatusCode::CONFLICT,
    }
}

fn error_response(error: &GalleryError) -> Result<Response<Body>, Error> {
    let mut body = serde_json::json!({ "error": error.to_string() });
    if let GalleryError::PersistenceFailed { failed_ids } = error {
        body["failed_ids"] = serde_json::json!(failed_ids);
    }
    json_response(error_status(error), body.to_string())
}

fn bad_request(message: String) -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({ "error": message }).to_string(),
    )
}

/// Persist a batch and answer with the resulting gallery.
/// On partial failure the local order is still returned alongside the failed ids.
async fn persist_and_respond<S: GalleryStore, A: AssetStore>(
    manager: &GalleryManager<S, A>,
    batch: PersistBatch<S, A>,
) -> Result<Response<Body>, Error> {
    match batch.persist().await {
        Ok(()) => gallery_response(StatusCode::OK, manager),
        Err(e) => {
            tracing::error!("Gallery persist failed: project_id={}, error={}", manager.project_id(), e);
            let mut body = gallery_body(manager);
            body["error"] = serde_json::json!(e.to_string());
            if let GalleryError::PersistenceFailed { failed_ids } = &e {
                body["failed_ids"] = serde_json::json!(failed_ids);
            }
            json_response(error_status(&e), body.to_string())
        }
    }
}

/// HTTP handler: GET /projects/{pid}/images
pub async fn list_images_handler<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    project_id: &str,
) -> Result<Response<Body>, Error> {
    match ctx.load(project_id).await {
        Ok(manager) => gallery_response(StatusCode::OK, &manager),
        Err(e) => {
            tracing::error!("list_images_handler failed: project_id={}, error={}", project_id, e);
            error_response(&e)
        }
    }
}

/// HTTP handler: POST /projects/{pid}/images
/// Stores the binary first, then appends it to the end of the gallery.
pub async fn upload_image_handler<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    project_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: UploadImageRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };
    let bytes = match STANDARD.decode(req.data.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(format!("Invalid base64 data: {}", e)),
    };

    tracing::info!(
        "upload_image_handler: project_id={}, file_name={}, size={}",
        project_id,
        req.file_name,
        bytes.len()
    );

    let (lease, mut manager) = match ctx.load_exclusive(project_id).await {
        Ok(loaded) => loaded,
        Err(e) => return error_response(&e),
    };
    let resp = append_upload(ctx, &mut manager, req, bytes).await;
    lease.release(ctx.store.as_ref()).await;
    resp
}

async fn append_upload<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    manager: &mut GalleryManager<S, A>,
    req: UploadImageRequest,
    bytes: Vec<u8>,
) -> Result<Response<Body>, Error> {
    let project_id = manager.project_id().to_string();
    let locator = match ctx
        .assets
        .put_asset(&project_id, &req.file_name, &req.content_type, bytes)
        .await
    {
        Ok(locator) => locator,
        Err(e) => {
            tracing::error!("Asset upload failed: project_id={}, error={}", project_id, e);
            return error_response(&GalleryError::UpstreamUnavailable(e));
        }
    };

    match manager.append(locator.clone(), req.label).await {
        Ok(item) => {
            let mut body = gallery_body(manager);
            let view = ItemView {
                item: &item,
                url: manager.public_url(&item.locator),
            };
            body["item"] = serde_json::to_value(&view).unwrap_or_default();
            json_response(StatusCode::CREATED, body.to_string())
        }
        Err(e) => {
            // No row points at the asset any more
            if let Err(cleanup) = ctx.assets.delete_asset(&locator).await {
                tracing::warn!("Orphaned asset {} not cleaned up: {}", locator, cleanup);
            }
            error_response(&e)
        }
    }
}

/// HTTP handler: PATCH /projects/{pid}/images/{iid}
/// `label` updates the alt text; `position` moves the image like a reorder.
pub async fn update_image_handler<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    project_id: &str,
    image_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateGalleryItemPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    let (lease, mut manager) = match ctx.load_exclusive(project_id).await {
        Ok(loaded) => loaded,
        Err(e) => return error_response(&e),
    };
    let resp = apply_patch(&mut manager, image_id, payload).await;
    lease.release(ctx.store.as_ref()).await;
    resp
}

async fn apply_patch<S: GalleryStore, A: AssetStore>(
    manager: &mut GalleryManager<S, A>,
    image_id: &str,
    payload: UpdateGalleryItemPayload,
) -> Result<Response<Body>, Error> {
    if let Some(label) = &payload.label {
        if let Err(e) = manager.update_label(image_id, label).await {
            return error_response(&e);
        }
    }

    match payload.position {
        Some(position) => match manager.reorder(image_id, position as usize) {
            Ok(batch) => persist_and_respond(manager, batch).await,
            Err(e) => error_response(&e),
        },
        None => gallery_response(StatusCode::OK, manager),
    }
}

/// HTTP handler: DELETE /projects/{pid}/images/{iid}
pub async fn delete_image_handler<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    project_id: &str,
    image_id: &str,
) -> Result<Response<Body>, Error> {
    let (lease, mut manager) = match ctx.load_exclusive(project_id).await {
        Ok(loaded) => loaded,
        Err(e) => return error_response(&e),
    };

    let resp = match manager.remove(image_id) {
        Ok(batch) => persist_and_respond(&manager, batch).await,
        Err(e) => error_response(&e),
    };
    lease.release(ctx.store.as_ref()).await;
    resp
}

/// HTTP handler: POST /projects/{pid}/images/reorder
pub async fn reorder_images_handler<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    project_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: ReorderRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };
    if req.new_index.is_some() == req.direction.is_some() {
        return bad_request("Provide exactly one of new_index or direction".to_string());
    }

    let (lease, mut manager) = match ctx.load_exclusive(project_id).await {
        Ok(loaded) => loaded,
        Err(e) => return error_response(&e),
    };

    let batch = match (req.new_index, req.direction) {
        (Some(new_index), _) => manager.reorder(&req.image_id, new_index),
        (None, Some(MoveDirection::Up)) => manager.move_up(&req.image_id),
        (None, _) => manager.move_down(&req.image_id),
    };
    let resp = match batch {
        Ok(batch) => persist_and_respond(&manager, batch).await,
        Err(e) => error_response(&e),
    };
    lease.release(ctx.store.as_ref()).await;
    resp
}

/// HTTP handler: POST /projects/{pid}/images/renumber
/// The manual retry after a failed save: rewrites every position, in the
/// client's order when the body carries one.
pub async fn renumber_images_handler<S: GalleryStore, A: AssetStore>(
    ctx: &GalleryContext<S, A>,
    project_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let req: RenumberRequest = if body.is_empty() {
        RenumberRequest::default()
    } else {
        match serde_json::from_slice(body) {
            Ok(req) => req,
            Err(e) => return bad_request(format!("Invalid request body: {}", e)),
        }
    };

    let (lease, mut manager) = match ctx.load_exclusive(project_id).await {
        Ok(loaded) => loaded,
        Err(e) => return error_response(&e),
    };

    let batch = match &req.order {
        Some(order) => manager.restore_order(order),
        None => Ok(manager.retry()),
    };
    let resp = match batch {
        Ok(batch) => persist_and_respond(&manager, batch).await,
        Err(e) => error_response(&e),
    };
    lease.release(ctx.store.as_ref()).await;
    resp
}
