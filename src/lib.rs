//! # tarpeek
//!
//! Browse and fetch single files out of tar archives stored in (or embedded
//! inside) large remote objects, using HTTP Range requests.
//!
//! An archive is indexed once into a flat map of path to data offset and
//! size. From then on, every file is one exact byte-range read away, so a
//! multi-gigabyte object never has to be downloaded to show one attachment.
//!
//! ## Features
//!
//! - ustar, PAX extended headers and GNU long names
//! - Local archives (plain or gzip) indexed in memory
//! - Remote containers: a JSON sidecar index plus the attachments tar,
//!   located by naming convention and fetched by range
//! - Hierarchical file tree for browsing
//! - Preview decoding with a size ceiling, script stripping and cancellation
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tarpeek::{AttachmentsProvider, Config, HttpRangeReader, RemoteAttachments};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> tarpeek::Result<()> {
//!     // Probe the object once; fails if the backend ignores Range
//!     let reader = Arc::new(HttpRangeReader::new("https://example.com/run.tar".to_string()).await?);
//!
//!     let cancel = CancellationToken::new();
//!     let attachments = RemoteAttachments::discover(reader, &Config::default(), &cancel).await?;
//!     for node in attachments.tree() {
//!         println!("{}", node.name());
//!     }
//!
//!     let content = attachments.attachment_content("attachments/readme.txt", &cancel).await?;
//!     println!("{} bytes", content.size);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod preview;
pub mod provider;
pub mod tar;
pub mod tree;

pub use cli::Cli;
pub use config::Config;
pub use error::{Error, NetworkError, ParseError, Result};
pub use io::{HttpRangeReader, MemoryReader, RangeFetcher, ReadAt, RequestRange};
pub use preview::{ContentTypeDispatcher, PreviewArtifact, PreviewSlot, PreviewState};
pub use provider::{AttachmentContent, AttachmentsProvider, LocalAttachments, RemoteAttachments};
pub use tar::{FileIndex, IndexEntry};
pub use tree::{FileNode, build_tree};
