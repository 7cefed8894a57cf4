use serde::{Deserialize, Serialize};

use crate::files::FileInfo;

// ---------------------------------------------------------------------------
// Multipart upload payloads
// ---------------------------------------------------------------------------

/// Response of the initiate-multipart-upload call.
///
/// The backend creates the file record and answers with it, plus the opaque
/// upload identifier and one upload target URL per requested part, in part
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUploadResponse {
    #[serde(flatten)]
    pub file: FileInfo,
    pub upload_id: String,
    pub upload_urls: Vec<String>,
}

/// Body of the complete-multipart-upload call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultipartUploadRequest {
    /// The file record id the parts are assembled into.
    pub id: i64,
    pub upload_id: String,
}

// ---------------------------------------------------------------------------
// Per-part results
// ---------------------------------------------------------------------------

/// Outcome of a single part transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartStatus {
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

/// Returned by `upload_part` when a transfer was actually performed.
///
/// A `Failed` status is data, not an error: the caller retries that part
/// number with the same content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUploadResult {
    pub part_number: usize,
    pub status: PartStatus,
}
