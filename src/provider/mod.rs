//! Uniform access to the attachments of one archive.
//!
//! Two strategies implement [`AttachmentsProvider`]:
//!
//! - [`LocalAttachments`]: the whole archive is in memory and is indexed on
//!   construction.
//! - [`RemoteAttachments`]: only a JSON sidecar index and the archive's start
//!   offset inside a larger remote object are known; every content request
//!   is one fresh range fetch.
//!
//! Construction either succeeds with a complete index or fails; a provider
//! never exposes a partial tree.

mod layout;
mod local;
mod remote;

pub use layout::{
    AttachmentLayout, DEFAULT_INDEX_PATTERN, DEFAULT_PAYLOAD_PATTERN, LocatedAttachments,
};
pub use local::LocalAttachments;
pub use remote::RemoteAttachments;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::io::{RangeFetcher, ReadAt};
use crate::tar::{FileIndex, IndexEntry};
use crate::tree::{FileNode, build_tree};

/// Bytes of one attachment, fetched for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    pub bytes: Bytes,
    pub size: u64,
}

#[async_trait]
pub trait AttachmentsProvider: Send + Sync {
    /// Visible attachment tree.
    fn tree(&self) -> &[FileNode];

    /// Index entry of `path`, if present.
    fn entry(&self, path: &str) -> Option<IndexEntry>;

    /// Fetch the bytes of `path`.
    ///
    /// Fails with [`Error::NotFound`] for unknown paths and
    /// [`Error::EmptyFile`] for zero-length ones, without any I/O.
    async fn attachment_content(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<AttachmentContent>;

    fn is_empty(&self) -> bool {
        self.tree().is_empty()
    }
}

/// Index, tree and fetcher shared by both strategies.
struct IndexedArchive<R: ReadAt + ?Sized> {
    index: Arc<FileIndex>,
    tree: Arc<Vec<FileNode>>,
    fetcher: RangeFetcher<R>,
}

impl<R: ReadAt + ?Sized> IndexedArchive<R> {
    fn new(index: FileIndex, strip_prefix: &str, fetcher: RangeFetcher<R>) -> Self {
        let tree = build_tree(&index, strip_prefix);
        Self {
            index: Arc::new(index),
            tree: Arc::new(tree),
            fetcher,
        }
    }

    async fn content(&self, path: &str, cancel: &CancellationToken) -> Result<AttachmentContent> {
        let entry = self.index.get(path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        if entry.size == 0 {
            return Err(Error::EmptyFile {
                path: path.to_string(),
            });
        }

        let bytes = self.fetcher.fetch(entry, cancel).await?;
        Ok(AttachmentContent {
            bytes,
            size: entry.size,
        })
    }
}
