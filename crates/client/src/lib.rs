//! HTTP client for the partlift storage backend.
//!
//! Provides the provisioning call that opens a multipart upload session,
//! the HTTP transport the parts travel over, and a driver that uploads all
//! parts of a session with bounded concurrency and retry rounds.

mod client;
mod transport;
mod uploader;

pub use client::{Error, StorageClient};
pub use transport::HttpTransport;
pub use uploader::{PartUploader, UploadEvent};
