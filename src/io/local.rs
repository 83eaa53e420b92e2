use super::ReadAt;
use crate::error::{NetworkError, Result};
use async_trait::async_trait;
use bytes::Bytes;

/// Random access over an archive already resident in memory
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Bytes,
}

impl MemoryReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Zero-copy view of `len` bytes at `offset`.
    pub fn slice(&self, offset: u64, len: u64) -> Result<Bytes> {
        let size = self.data.len() as u64;
        let end = offset.checked_add(len).filter(|end| *end <= size);
        match end {
            Some(end) => Ok(self.data.slice(offset as usize..end as usize)),
            None => Err(NetworkError::OutOfBounds {
                start: offset,
                end: offset.saturating_add(len).saturating_sub(1),
                size,
            }
            .into()),
        }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let chunk = self.slice(offset, buf.len() as u64)?;
        buf.copy_from_slice(&chunk);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_within_bounds() {
        let reader = MemoryReader::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(3, &mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"3456");
        assert_eq!(reader.size(), 10);
    }

    #[tokio::test]
    async fn rejects_reads_past_end() {
        let reader = MemoryReader::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];
        let err = reader.read_at(8, &mut buf).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Network(NetworkError::OutOfBounds { start: 8, end: 11, size: 10 })
        ));
    }
}
