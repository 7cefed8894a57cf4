//! Storage backend API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::sync::Arc;

use partlift_protocol::{
    MAX_PART_COUNT, MIN_PART_COUNT, MultipartUploadResponse, NewFileSpec,
};
use partlift_session::{SessionError, UploadSession};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use crate::transport::HttpTransport;

/// Errors from the storage client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API token")]
    InvalidToken,

    /// Requested part count outside [1, 250]. Raised before any request is
    /// issued.
    #[error("part count {0} outside allowed range [1, 250]")]
    InvalidPartCount(usize),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("cancelled")]
    Cancelled,

    #[error("have {have} part buffers for {want} part slots")]
    PartCountMismatch { have: usize, want: usize },

    #[error("parts still incomplete after retries: {0:?}")]
    PartsIncomplete(Vec<usize>),

    #[error("upload driver error: {0}")]
    Driver(String),
}

/// Storage backend API client.
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
}

impl StorageClient {
    /// Creates a new client for `base_url` authenticating with `token`.
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Provisions a multipart upload session.
    ///
    /// Validates `part_count` against the protocol limits before issuing
    /// any request, asks the backend to create the file record and issue
    /// one upload target per part, and wraps the result in an
    /// [`UploadSession`] bound to this client's HTTP stack.
    pub async fn multipart_upload_session(
        &self,
        spec: &NewFileSpec,
        part_count: usize,
        overwrite: bool,
    ) -> Result<Arc<UploadSession>, Error> {
        let resp = self.init_multipart_upload(spec, part_count, overwrite).await?;
        debug!(
            file_id = resp.file.id,
            upload_id = %resp.upload_id,
            parts = resp.upload_urls.len(),
            "multipart upload session provisioned"
        );

        let transport = Arc::new(HttpTransport::new(self.http.clone(), self.base_url.clone()));
        let session =
            UploadSession::new(transport, resp.upload_id, resp.file.id, resp.upload_urls)?;
        Ok(Arc::new(session))
    }

    /// Issues the initiate-multipart-upload call and returns the raw
    /// response.
    pub async fn init_multipart_upload(
        &self,
        spec: &NewFileSpec,
        part_count: usize,
        overwrite: bool,
    ) -> Result<MultipartUploadResponse, Error> {
        if !(MIN_PART_COUNT..=MAX_PART_COUNT).contains(&part_count) {
            return Err(Error::InvalidPartCount(part_count));
        }

        let url = format!("{}/files/initmultipartupload", self.base_url);
        let resp = self
            .http
            .post(&url)
            .query(&[
                ("parts", part_count.to_string()),
                ("overwrite", overwrite.to_string()),
            ])
            .json(spec)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
