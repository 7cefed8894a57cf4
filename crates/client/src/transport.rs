//! `PartTransport` implementation over reqwest.

use std::future::Future;
use std::pin::Pin;

use partlift_protocol::CompleteMultipartUploadRequest;
use partlift_session::{PartTransport, SessionError, TransferOutcome};
use tracing::warn;

/// Sends part bytes and the completion call over HTTP.
///
/// Any 2xx response maps to `Accepted`, any other status to `Rejected`.
/// Errors that never produce a status (connection refused, TLS failure)
/// surface as [`SessionError::Transport`].
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

impl PartTransport for HttpTransport {
    fn send_part(
        &self,
        target: &str,
        content: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<TransferOutcome, SessionError>> + Send + '_>> {
        let request = self.http.put(target).body(content.to_vec());
        Box::pin(async move {
            let resp = request
                .send()
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;
            let status = resp.status();
            if status.is_success() {
                Ok(TransferOutcome::Accepted)
            } else {
                warn!(status = status.as_u16(), "part target rejected transfer");
                Ok(TransferOutcome::Rejected)
            }
        })
    }

    fn complete_upload(
        &self,
        upload_id: &str,
        object_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<TransferOutcome, SessionError>> + Send + '_>> {
        let body = CompleteMultipartUploadRequest {
            id: object_id,
            upload_id: upload_id.to_string(),
        };
        let request = self
            .http
            .post(format!("{}/files/completemultipartupload", self.base_url))
            .json(&body);
        Box::pin(async move {
            let resp = request
                .send()
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;
            let status = resp.status();
            if status.is_success() {
                Ok(TransferOutcome::Accepted)
            } else {
                warn!(status = status.as_u16(), "backend rejected completion call");
                Ok(TransferOutcome::Rejected)
            }
        })
    }
}
