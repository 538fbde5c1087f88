use serde::{Deserialize, Serialize};

/// Gallery item domain model - one image attached to a project, ranked by `position`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GalleryItem {
    pub image_id: String,
    pub project_id: String,
    /// S3 object key of the stored asset, never changed after creation
    pub locator: String,
    /// Alt text
    pub label: String,
    pub position: u32,
    pub uploaded_at: String,
}

impl GalleryItem {
    /// Fresh item with a newly minted id. Ids are never derived from position.
    pub fn new(project_id: &str, locator: String, label: String, position: u32) -> Self {
        Self {
            image_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            locator,
            label,
            position,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateGalleryItemPayload {
    pub label: Option<String>,
    pub position: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_items_get_distinct_ids() {
        let a = GalleryItem::new("p1", "projects/p1/a.jpg".into(), String::new(), 0);
        let b = GalleryItem::new("p1", "projects/p1/a.jpg".into(), String::new(), 0);
        assert_ne!(a.image_id, b.image_id);
        assert_eq!(a.project_id, "p1");
        assert!(chrono::DateTime::parse_from_rfc3339(&a.uploaded_at).is_ok());
    }
}
