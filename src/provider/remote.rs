use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AttachmentContent, AttachmentsProvider, IndexedArchive};
use crate::config::Config;
use crate::error::{Error, ParseError, Result};
use crate::io::{RangeFetcher, ReadAt};
use crate::tar::{self, FileIndex, IndexEntry};
use crate::tree::FileNode;

/// Attachments of a tar archive living inside a larger remote object.
///
/// Offsets in the index are relative to the start of the attachments tar;
/// `outer_offset` is where that tar begins within the object the reader
/// points at.
pub struct RemoteAttachments {
    archive: IndexedArchive<dyn ReadAt>,
}

impl RemoteAttachments {
    /// Wrap an index obtained elsewhere. Entries are not validated here; one
    /// that reaches past the end of the object fails on fetch with
    /// [`NetworkError::OutOfBounds`](crate::NetworkError::OutOfBounds).
    pub fn new(
        reader: Arc<dyn ReadAt>,
        index: FileIndex,
        outer_offset: u64,
        strip_prefix: &str,
    ) -> Self {
        info!(entries = index.len(), outer_offset, "opened remote attachments");
        Self {
            archive: IndexedArchive::new(index, strip_prefix, RangeFetcher::new(reader, outer_offset)),
        }
    }

    /// Open the attachments of a container archive.
    ///
    /// Walks the container's headers, picks the sidecar index and the
    /// attachments tar with `config.layout`, downloads only the sidecar, and
    /// checks every sidecar entry against the payload bounds.
    pub async fn discover(
        reader: Arc<dyn ReadAt>,
        config: &Config,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let outer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outer = tar::scan_remote(reader.as_ref()) => outer?,
        };
        let located = config.layout.locate(&outer)?;

        let sidecar = RangeFetcher::new(reader.clone(), 0)
            .fetch(located.index, cancel)
            .await?;
        let index = FileIndex::from_json(&sidecar)?;
        check_bounds(&index, located.payload)?;

        info!(
            index = %located.index_path,
            payload = %located.payload_path,
            "discovered attachments"
        );
        Ok(Self::new(
            reader,
            index,
            located.payload.offset,
            &config.strip_prefix,
        ))
    }

    /// Open a remote object that is itself the attachments tar.
    pub async fn direct(
        reader: Arc<dyn ReadAt>,
        config: &Config,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let index = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            index = tar::scan_remote(reader.as_ref()) => index?,
        };
        Ok(Self::new(reader, index, 0, &config.strip_prefix))
    }

    pub fn index(&self) -> &FileIndex {
        &self.archive.index
    }

    pub fn outer_offset(&self) -> u64 {
        self.archive.fetcher.outer_offset()
    }
}

/// A sidecar entry pointing outside the payload would read foreign bytes.
fn check_bounds(index: &FileIndex, payload: IndexEntry) -> Result<(), ParseError> {
    for (_, entry) in index.iter() {
        let end = entry.offset.checked_add(entry.size);
        if end.is_none_or(|end| end > payload.size) {
            return Err(ParseError::TruncatedData {
                offset: entry.offset,
                size: entry.size,
                available: payload.size.saturating_sub(entry.offset),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl AttachmentsProvider for RemoteAttachments {
    fn tree(&self) -> &[FileNode] {
        &self.archive.tree
    }

    fn entry(&self, path: &str) -> Option<IndexEntry> {
        self.archive.index.get(path)
    }

    async fn attachment_content(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<AttachmentContent> {
        self.archive.content(path, cancel).await
    }
}
