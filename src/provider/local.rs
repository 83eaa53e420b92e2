use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AttachmentContent, AttachmentsProvider, IndexedArchive};
use crate::config::Config;
use crate::error::Result;
use crate::io::{MemoryReader, RangeFetcher};
use crate::tar::{self, FileIndex, IndexEntry};
use crate::tree::FileNode;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Attachments of an archive held entirely in memory.
pub struct LocalAttachments {
    archive: IndexedArchive<MemoryReader>,
}

impl LocalAttachments {
    /// Index `data` on the calling thread.
    ///
    /// Gzip-compressed archives are inflated first.
    pub fn from_bytes(data: impl Into<Bytes>, strip_prefix: &str) -> Result<Self> {
        let data = inflate(data.into())?;
        let index = tar::scan(&data)?;
        info!(entries = index.len(), bytes = data.len(), "indexed local archive");

        let fetcher = RangeFetcher::new(Arc::new(MemoryReader::new(data)), 0);
        Ok(Self {
            archive: IndexedArchive::new(index, strip_prefix, fetcher),
        })
    }

    /// Index `data`, moving the work to the blocking pool when the archive
    /// is larger than `config.offload_threshold`.
    pub async fn load(data: impl Into<Bytes>, config: &Config) -> Result<Self> {
        let data = data.into();
        if (data.len() as u64) <= config.offload_threshold {
            return Self::from_bytes(data, &config.strip_prefix);
        }

        let prefix = config.strip_prefix.clone();
        tokio::task::spawn_blocking(move || Self::from_bytes(data, &prefix)).await?
    }

    pub fn index(&self) -> &FileIndex {
        &self.archive.index
    }

    /// The (inflated) archive bytes.
    pub fn archive_bytes(&self) -> &Bytes {
        self.archive.fetcher.reader().bytes()
    }
}

fn inflate(data: Bytes) -> Result<Bytes> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(data);
    }
    let mut out = Vec::new();
    GzDecoder::new(&data[..]).read_to_end(&mut out)?;
    Ok(Bytes::from(out))
}

#[async_trait]
impl AttachmentsProvider for LocalAttachments {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ::tar::Builder::new(Vec::new());
        for (path, data) in files {
            let mut header = ::tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[tokio::test]
    async fn serves_content_and_tree() {
        let data = archive(&[
            ("attachments/logs/train.log", b"epoch 1\n"),
            ("attachments/empty.txt", b""),
        ]);
        let provider = LocalAttachments::from_bytes(data, "attachments/").unwrap();

        assert!(!provider.is_empty());
        assert_eq!(provider.tree().len(), 1);
        assert_eq!(provider.tree()[0].name(), "logs");

        let content = provider
            .attachment_content("attachments/logs/train.log", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(content.size, 8);
        assert_eq!(&content.bytes[..], b"epoch 1\n");
    }

    #[tokio::test]
    async fn missing_and_empty_paths() {
        let data = archive(&[("attachments/empty.txt", b"")]);
        let provider = LocalAttachments::from_bytes(data, "attachments/").unwrap();
        let cancel = CancellationToken::new();

        assert!(provider.is_empty());
        assert!(matches!(
            provider.attachment_content("nope", &cancel).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            provider.attachment_content("attachments/empty.txt", &cancel).await,
            Err(Error::EmptyFile { .. })
        ));
    }

    #[tokio::test]
    async fn gzip_archives_are_inflated() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&archive(&[("a.txt", b"zipped")])).unwrap();
        let provider = LocalAttachments::from_bytes(encoder.finish().unwrap(), "").unwrap();

        let content = provider
            .attachment_content("a.txt", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(&content.bytes[..], b"zipped");
    }

    #[tokio::test]
    async fn large_archives_are_offloaded() {
        let data = archive(&[("big.bin", &[5u8; 4096])]);
        let config = Config {
            offload_threshold: 1024,
            ..Config::default()
        };
        let provider = LocalAttachments::load(data, &config).await.unwrap();
        assert_eq!(provider.entry("big.bin"), Some(IndexEntry::new(512, 4096)));
    }

    #[test]
    fn corrupt_archive_fails_construction() {
        let mut data = archive(&[("a.txt", b"abc")]);
        data.truncate(600);
        data[124..136].copy_from_slice(b"00000077777\0");
        assert!(matches!(
            LocalAttachments::from_bytes(data, ""),
            Err(Error::Parse(_))
        ));
    }
}
