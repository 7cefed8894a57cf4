//! Multipart upload session tracking.
//!
//! An [`UploadSession`] owns the ordered part slots of one multipart upload,
//! performs per-part transfers through a pluggable [`PartTransport`], and
//! completes the upload exactly once when the last outstanding part lands.
//!
//! Sessions are built for concurrent callers: each part slot carries its own
//! atomic completion flag (uploads of different parts never serialize each
//! other) and the completion sequence is guarded so at most one racing
//! caller reaches the backend.

mod error;
mod session;
mod transport;

pub use error::SessionError;
pub use session::UploadSession;
pub use transport::{PartTransport, TransferOutcome};
