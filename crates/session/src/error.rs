//! Session error types.

/// Errors produced by an upload session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Requested part count outside [1, 250]. Raised before any network
    /// call is made.
    #[error("part count {count} outside allowed range [1, 250]")]
    InvalidPartCount { count: usize },

    /// `upload_part` was handed empty content.
    #[error("part content is empty")]
    EmptyContent,

    /// `upload_part` was handed an index with no slot.
    #[error("part index {index} out of range for {part_count} parts")]
    InvalidPartIndex { index: usize, part_count: usize },

    /// Completion was attempted on a session that already finished. Signals
    /// a caller protocol violation or a lost completion race.
    #[error("upload has already finished")]
    AlreadyFinished,

    /// The backend rejected the completion call. The session stays
    /// unfinished so a later attempt can retry.
    #[error("backend rejected the completion call")]
    FinalizeRejected,

    /// The transport produced no status at all (connection failure and the
    /// like). The affected part stays incomplete.
    #[error("transport failure: {0}")]
    Transport(String),
}
