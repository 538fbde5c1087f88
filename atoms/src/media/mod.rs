// Re-export model types and service functions
pub mod model;
pub mod service;
pub mod lease;
pub mod http;

pub use model::{GalleryItem, UpdateGalleryItemPayload};
pub use service::*;
pub use lease::*;
pub use http::*;
