//! Wire types for the partlift storage backend API.
//!
//! Request and response payloads for the multipart upload endpoints, plus
//! the value types the SDK hands back to callers. All JSON uses camelCase
//! field names to match the backend.

pub mod files;
pub mod messages;

pub use files::{FileInfo, NewFileSpec};
pub use messages::{
    CompleteMultipartUploadRequest, MultipartUploadResponse, PartStatus, PartUploadResult,
};

/// Minimum number of parts in a multipart upload session.
pub const MIN_PART_COUNT: usize = 1;

/// Maximum number of parts the backend will issue upload targets for.
pub const MAX_PART_COUNT: usize = 250;
