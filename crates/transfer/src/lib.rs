//! Caller-side splitting of a payload into a fixed number of parts.
//!
//! The upload session transfers whatever bytes it is handed; this crate
//! produces those bytes. It plans contiguous extents covering a payload,
//! reads them from disk on demand, and digests each part with SHA-256 for
//! audit logging.

mod parts;

pub use parts::{Part, PartExtent, PartReader, checksum_bytes, plan_parts, split_bytes};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("part count {0} outside allowed range [1, 250]")]
    InvalidPartCount(usize),

    #[error("cannot split {size} bytes into {count} non-empty parts")]
    TooManyParts { size: u64, count: usize },

    #[error("no extent for part index {0}")]
    InvalidPartIndex(usize),
}
