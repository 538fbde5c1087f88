use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Index {index} out of range for {len} images")]
    InvalidIndex { index: usize, len: usize },

    #[error("Failed to persist images: {}", .failed_ids.join(", "))]
    PersistenceFailed { failed_ids: Vec<String> },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Gallery has no owning project")]
    MissingOwner,

    /// Another writer holds the gallery, or the caller's view of it is stale
    #[error("Gallery conflict: {0}")]
    Conflict(String),
}

pub type GalleryResult<T> = Result<T, GalleryError>;
