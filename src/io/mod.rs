mod http;
mod local;
mod range;

pub use http::HttpRangeReader;
pub use local::MemoryReader;
pub use range::{RangeFetcher, RequestRange};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Reads never extend past [`size`](ReadAt::size); such a request fails
    /// instead of returning a short count.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
