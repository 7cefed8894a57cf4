use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use partlift_protocol::{MAX_PART_COUNT, MIN_PART_COUNT};
use sha2::{Digest, Sha256};

use crate::TransferError;

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A planned byte range for one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartExtent {
    pub index: usize,
    pub offset: u64,
    pub len: u64,
}

/// One part's bytes, ready to hand to an upload session.
#[derive(Debug, Clone)]
pub struct Part {
    pub index: usize,
    pub offset: u64,
    pub data: Vec<u8>,
    /// SHA-256 hex digest of `data`.
    pub checksum: String,
}

/// Splits `total_size` bytes into exactly `part_count` contiguous extents.
///
/// Parts are equal-sized except the last, which absorbs the remainder.
/// Every extent is non-empty: a size that cannot produce `part_count`
/// non-empty parts is rejected, since an empty part could never be
/// uploaded.
pub fn plan_parts(total_size: u64, part_count: usize) -> Result<Vec<PartExtent>, TransferError> {
    if !(MIN_PART_COUNT..=MAX_PART_COUNT).contains(&part_count) {
        return Err(TransferError::InvalidPartCount(part_count));
    }
    if total_size < part_count as u64 {
        return Err(TransferError::TooManyParts {
            size: total_size,
            count: part_count,
        });
    }

    let base = total_size / part_count as u64;
    let mut extents = Vec::with_capacity(part_count);
    for index in 0..part_count {
        let offset = index as u64 * base;
        let len = if index == part_count - 1 {
            total_size - offset
        } else {
            base
        };
        extents.push(PartExtent { index, offset, len });
    }
    Ok(extents)
}

/// Splits an in-memory buffer into `part_count` parts.
pub fn split_bytes(data: &[u8], part_count: usize) -> Result<Vec<Part>, TransferError> {
    let extents = plan_parts(data.len() as u64, part_count)?;
    Ok(extents
        .iter()
        .map(|extent| {
            let slice = &data[extent.offset as usize..(extent.offset + extent.len) as usize];
            Part {
                index: extent.index,
                offset: extent.offset,
                data: slice.to_vec(),
                checksum: checksum_bytes(slice),
            }
        })
        .collect())
}

/// Reads planned parts of a file on demand.
pub struct PartReader {
    file: File,
    extents: Vec<PartExtent>,
    next: usize,
}

impl PartReader {
    /// Opens `path` and plans `part_count` extents over its size.
    pub fn new(path: &Path, part_count: usize) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let extents = plan_parts(size, part_count)?;
        Ok(Self {
            file,
            extents,
            next: 0,
        })
    }

    /// Planned extents, in part order.
    pub fn extents(&self) -> &[PartExtent] {
        &self.extents
    }

    /// Number of planned parts.
    pub fn part_count(&self) -> usize {
        self.extents.len()
    }

    /// Reads the next part in order. Returns `None` after the last.
    pub fn next_part(&mut self) -> Result<Option<Part>, TransferError> {
        if self.next >= self.extents.len() {
            return Ok(None);
        }
        let part = self.read_part(self.next)?;
        self.next += 1;
        Ok(Some(part))
    }

    /// Reads a single part by index, independent of cursor position.
    ///
    /// Retry loops use this to re-read only the parts that failed.
    pub fn read_part(&mut self, index: usize) -> Result<Part, TransferError> {
        let extent = *self
            .extents
            .get(index)
            .ok_or(TransferError::InvalidPartIndex(index))?;
        self.file.seek(SeekFrom::Start(extent.offset))?;
        let mut data = vec![0u8; extent.len as usize];
        self.file.read_exact(&mut data)?;
        let checksum = checksum_bytes(&data);
        Ok(Part {
            index: extent.index,
            offset: extent.offset,
            data,
            checksum,
        })
    }
}
