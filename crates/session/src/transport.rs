//! Transport seam between the session and the backend.

use std::future::Future;
use std::pin::Pin;

use crate::error::SessionError;

/// Outcome of a backend call, judged purely by its response status.
///
/// This is the only signal the session consults: no response body is
/// interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The backend acknowledged with a success status.
    Accepted,
    /// The backend answered with a non-success status.
    Rejected,
}

/// Abstract transport used by [`UploadSession`](crate::UploadSession).
///
/// The client crate implements this on top of its HTTP stack. Using a trait
/// keeps session logic decoupled from the network and testable with mocks.
/// A `Rejected` outcome is a status-level refusal; errors that produce no
/// status at all surface as [`SessionError::Transport`].
pub trait PartTransport: Send + Sync {
    /// Sends one part's bytes to its upload target.
    fn send_part(
        &self,
        target: &str,
        content: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<TransferOutcome, SessionError>> + Send + '_>>;

    /// Issues the one-time completion call for the whole upload.
    fn complete_upload(
        &self,
        upload_id: &str,
        object_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<TransferOutcome, SessionError>> + Send + '_>>;
}
