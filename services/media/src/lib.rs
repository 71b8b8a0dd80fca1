//! Media hosting
//!
//! Uploaded images and videos are stored through a [`MediaHost`]: S3 in
//! production, an in-memory map for tests and local runs. Video durations
//! are read with `ffprobe`.

pub mod host;
pub mod memory;
pub mod metadata_extractor;
pub mod s3;

pub use host::{MediaHost, MediaKind, MediaUpload, StoredMedia};
pub use memory::MemoryMediaHost;
pub use metadata_extractor::MetadataExtractor;
pub use s3::{S3Config, S3MediaHost};
