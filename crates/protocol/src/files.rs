use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A file record as known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Backend-issued identifier of the file record.
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Whether the backend has materialized the file content yet.
    #[serde(default)]
    pub uploaded: bool,
    /// Creation timestamp, milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_time: i64,
    /// Last-update timestamp, milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_updated_time: i64,
}

/// Metadata describing a file about to be uploaded.
///
/// Sent as the body of the initiate-multipart-upload call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFileSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl NewFileSpec {
    /// Creates a spec with only the required file name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
