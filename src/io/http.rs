use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{ReadAt, RequestRange};
use crate::error::{NetworkError, Result};

/// HTTP Range reader for remote archives behind a (signed) URL
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This sends a one-byte range request to verify that the backend honors
    /// `Range` with `206 Partial Content`, and learns the object size from
    /// `Content-Range`. A backend answering `200` would stream the whole
    /// object for every file, so it is rejected here rather than per request.
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().build().map_err(NetworkError::from)?;
        Self::with_client(client, url).await
    }

    /// Same as [`new`](Self::new) with a caller-configured client (timeouts,
    /// proxies, default headers).
    pub async fn with_client(client: Client, url: String) -> Result<Self> {
        let resp = client
            .get(&url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(NetworkError::from)?;

        let status = resp.status();
        let size = match status {
            StatusCode::PARTIAL_CONTENT | StatusCode::RANGE_NOT_SATISFIABLE => resp
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_total_size)
                .ok_or(NetworkError::MissingContentRange)?,
            s if s.is_success() => {
                return Err(NetworkError::RangeUnsupported {
                    status: s.as_u16(),
                }
                .into());
            }
            s => return Err(NetworkError::Status { status: s.as_u16() }.into()),
        };

        debug!(url = %url, size, "range requests supported");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Extract the complete length from `bytes 0-0/1234` or `bytes */1234`.
fn parse_total_size(content_range: &str) -> Option<u64> {
    let (_, total) = content_range.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let len = buf.len() as u64;
        let range = RequestRange::new(offset, len)
            .filter(|range| range.end < self.size)
            .ok_or(NetworkError::OutOfBounds {
                start: offset,
                end: offset.saturating_add(len - 1),
                size: self.size,
            })?;

        debug!(url = %self.url, range = %range, "range request");
        let resp = self
            .client
            .get(&self.url)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(NetworkError::from)?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK => return Err(NetworkError::RangeUnsupported { status: 200 }.into()),
            s => return Err(NetworkError::Status { status: s.as_u16() }.into()),
        }

        let bytes = resp.bytes().await.map_err(NetworkError::from)?;
        if bytes.len() != buf.len() {
            return Err(NetworkError::ShortBody {
                expected: buf.len() as u64,
                received: bytes.len() as u64,
            }
            .into());
        }

        buf.copy_from_slice(&bytes);
        self.transferred_bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.size
    }
}
