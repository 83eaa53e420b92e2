use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ReadAt;
use crate::error::{Error, NetworkError, Result};
use crate::tar::IndexEntry;

/// Inclusive byte span of a single `Range` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRange {
    pub start: u64,
    pub end: u64,
}

impl RequestRange {
    /// Span of `len` bytes beginning at `start`. `None` when `len` is zero
    /// or the span does not fit in `u64`.
    pub fn new(start: u64, len: u64) -> Option<Self> {
        let end = start.checked_add(len.checked_sub(1)?)?;
        Some(Self { start, end })
    }

    /// Span covering an index entry inside an archive that itself begins at
    /// `outer_offset` within the remote object. `None` for empty entries and
    /// for offsets past `u64::MAX`.
    pub fn for_entry(entry: IndexEntry, outer_offset: u64) -> Option<Self> {
        Self::new(entry.offset.checked_add(outer_offset)?, entry.size)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the HTTP `Range` header.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.start, self.end)
    }
}

/// Fetches index entries from a reader, shifted by the archive's position
/// inside the larger object.
///
/// No retries: a failed read is returned to the caller as is.
pub struct RangeFetcher<R: ReadAt + ?Sized> {
    reader: Arc<R>,
    outer_offset: u64,
}

impl<R: ReadAt + ?Sized> RangeFetcher<R> {
    pub fn new(reader: Arc<R>, outer_offset: u64) -> Self {
        Self {
            reader,
            outer_offset,
        }
    }

    pub fn outer_offset(&self) -> u64 {
        self.outer_offset
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Read the data of `entry`.
    ///
    /// Returns [`Error::Cancelled`] as soon as `cancel` fires; the partial
    /// read is dropped and never handed to the caller. An entry reaching past
    /// the end of the reader fails before anything is allocated or read.
    pub async fn fetch(&self, entry: IndexEntry, cancel: &CancellationToken) -> Result<Bytes> {
        if entry.size == 0 {
            return Ok(Bytes::new());
        }
        let size = self.reader.size();
        let range = RequestRange::for_entry(entry, self.outer_offset)
            .filter(|range| range.end < size)
            .ok_or_else(|| NetworkError::OutOfBounds {
                start: entry.offset.saturating_add(self.outer_offset),
                end: entry
                    .offset
                    .saturating_add(self.outer_offset)
                    .saturating_add(entry.size - 1),
                size,
            })?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        debug!(range = %range, "fetching entry");
        let mut buf = vec![0u8; range.len() as usize];
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = self.reader.read_at(range.start, &mut buf) => read,
        };
        read?;

        Ok(Bytes::from(buf))
    }
}
