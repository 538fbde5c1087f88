// S3 asset helpers: the locator of a gallery item is its object key
pub mod service;

pub use service::*;
