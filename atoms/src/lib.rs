pub mod media;
pub mod storage;
