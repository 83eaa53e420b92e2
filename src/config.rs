//! Runtime settings shared by the providers, the preview pipeline and the CLI.

use crate::provider::AttachmentLayout;

/// Largest attachment the preview pipeline will fetch (10 MiB).
pub const DEFAULT_PREVIEW_CEILING: u64 = 10 * 1024 * 1024;

/// Archives larger than this are indexed on the blocking thread pool.
pub const DEFAULT_OFFLOAD_THRESHOLD: u64 = 32 * 1024 * 1024;

/// Path prefix under which attachments live inside their archive.
pub const DEFAULT_STRIP_PREFIX: &str = "attachments/";

#[derive(Debug, Clone)]
pub struct Config {
    pub preview_ceiling: u64,
    pub offload_threshold: u64,
    /// Removed from index paths when building the visible tree
    pub strip_prefix: String,
    /// Naming convention for the sidecar index and payload of a container
    pub layout: AttachmentLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preview_ceiling: DEFAULT_PREVIEW_CEILING,
            offload_threshold: DEFAULT_OFFLOAD_THRESHOLD,
            strip_prefix: DEFAULT_STRIP_PREFIX.to_string(),
            layout: AttachmentLayout::default(),
        }
    }
}
