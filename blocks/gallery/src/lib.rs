//! Ordered image galleries for portfolio projects.
//!
//! [`GalleryManager`] owns one project's image order. Every mutation
//! produces a [`PersistBatch`] of remote writes; awaiting the batch drives
//! the [`SaveStatus`] a UI renders as saving / saved / failed.

pub mod aws;
pub mod batch;
pub mod error;
pub mod http;
pub mod lease;
pub mod manager;
pub mod reorder;
pub mod status;
pub mod store;

#[cfg(test)]
mod fake;

pub use aws::{DynamoGalleryStore, S3AssetStore};
pub use batch::{PersistBatch, Write};
pub use error::{GalleryError, GalleryResult};
pub use http::GalleryContext;
pub use lease::{GalleryLease, DEFAULT_LEASE_TTL};
pub use manager::GalleryManager;
pub use status::{SaveStatus, DEFAULT_SAVED_DISPLAY};
pub use store::{AssetStore, GalleryStore};
