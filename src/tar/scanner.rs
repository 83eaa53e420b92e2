//! Sequential tar header walk producing a [`FileIndex`].
//!
//! Two drivers share one state machine:
//!
//! - [`scan`] walks an archive that is fully resident in memory.
//! - [`scan_remote`] walks an archive behind a [`ReadAt`] source, fetching
//!   only header blocks and extension header data. Every file data region
//!   is skipped, so indexing a remote archive costs one small read per entry.

use tracing::debug;

use crate::error::{ParseError, Result};
use crate::io::ReadAt;

use super::header::{BLOCK_SIZE, EntryType, TarHeader, is_zero_block, padded_size};
use super::index::{FileIndex, IndexEntry};
use super::pax::PendingOverrides;

/// Upper bound for a PAX or GNU long-name data region fetched remotely.
const MAX_EXTENSION_SIZE: u64 = 1024 * 1024;

/// Mutable state of one walk. Never shared between archives.
#[derive(Default)]
struct ScanState {
    pending: PendingOverrides,
    index: FileIndex,
    zero_run: bool,
}

impl ScanState {
    /// Register a zero block; returns `true` at the end-of-archive marker.
    fn on_zero_block(&mut self) -> bool {
        let end = self.zero_run;
        self.zero_run = true;
        end
    }

    /// Process one header. `data` must hold the entry's data region when
    /// [`needs_data`] is true for it. Returns the unpadded data length the
    /// cursor has to skip.
    fn on_header(
        &mut self,
        header: &TarHeader,
        header_offset: u64,
        data: Option<&[u8]>,
        archive_len: u64,
    ) -> Result<u64, ParseError> {
        self.zero_run = false;
        let data_start = header_offset + BLOCK_SIZE as u64;
        if header.entry_type.is_extension() {
            ensure_fits(data_start, header.size, archive_len)?;
        }

        match header.entry_type {
            EntryType::PaxExtended => {
                self.pending.apply_pax(data.unwrap_or_default(), header_offset)?;
                Ok(header.size)
            }
            EntryType::GnuLongName => {
                self.pending.set_long_name(data.unwrap_or_default());
                Ok(header.size)
            }
            EntryType::PaxGlobal => Ok(header.size),
            entry_type => {
                let size = self.pending.take_size(header);
                let path = self.pending.take_path(header);
                ensure_fits(data_start, size, archive_len)?;

                if entry_type == EntryType::Regular && !path.is_empty() {
                    debug!(path = %path, offset = data_start, size, "indexed entry");
                    self.index.insert(path, IndexEntry::new(data_start, size));
                }
                Ok(size)
            }
        }
    }
}

fn needs_data(header: &TarHeader) -> bool {
    matches!(
        header.entry_type,
        EntryType::PaxExtended | EntryType::GnuLongName
    )
}

/// Offset of the header following an entry whose data region is `size` long.
fn next_header(header_offset: u64, size: u64) -> Result<u64, ParseError> {
    padded_size(size)
        .and_then(|padded| {
            header_offset
                .checked_add(BLOCK_SIZE as u64)?
                .checked_add(padded)
        })
        .ok_or(ParseError::InvalidSize {
            offset: header_offset,
        })
}

fn ensure_fits(start: u64, size: u64, archive_len: u64) -> Result<(), ParseError> {
    let available = archive_len.saturating_sub(start);
    if size > available {
        return Err(ParseError::TruncatedData {
            offset: start,
            size,
            available,
        });
    }
    Ok(())
}

/// Index every regular file of an archive held in memory.
///
/// The walk ends at the two-zero-block marker or when no full block remains.
/// A partial trailing block that is not zero padding, or a header claiming
/// more data than the buffer holds, fails with [`ParseError`].
pub fn scan(archive: &[u8]) -> Result<FileIndex, ParseError> {
    let archive_len = archive.len() as u64;
    let mut state = ScanState::default();
    let mut pos: u64 = 0;

    while pos < archive_len {
        let rest = &archive[pos as usize..];
        if rest.len() < BLOCK_SIZE {
            if is_zero_block(rest) {
                break;
            }
            return Err(ParseError::TruncatedHeader { offset: pos });
        }

        let block = &rest[..BLOCK_SIZE];
        if is_zero_block(block) {
            if state.on_zero_block() {
                break;
            }
            pos += BLOCK_SIZE as u64;
            continue;
        }

        let header = TarHeader::from_block(block, pos)?;
        let data_start = pos + BLOCK_SIZE as u64;
        let data = if needs_data(&header) {
            ensure_fits(data_start, header.size, archive_len)?;
            let start = data_start as usize;
            Some(&archive[start..start + header.size as usize])
        } else {
            None
        };

        let size = state.on_header(&header, pos, data, archive_len)?;
        pos = next_header(pos, size)?;
    }

    debug!(entries = state.index.len(), bytes = archive_len, "scanned archive");
    Ok(state.index)
}

/// Index every regular file of an archive behind a random-access reader,
/// reading only headers and extension data.
pub async fn scan_remote<R: ReadAt + ?Sized>(reader: &R) -> Result<FileIndex> {
    let archive_len = reader.size();
    let mut state = ScanState::default();
    let mut pos: u64 = 0;
    let mut block = [0u8; BLOCK_SIZE];

    while pos < archive_len {
        let remaining = archive_len - pos;
        if remaining < BLOCK_SIZE as u64 {
            let tail = &mut block[..remaining as usize];
            reader.read_at(pos, tail).await?;
            if is_zero_block(tail) {
                break;
            }
            return Err(ParseError::TruncatedHeader { offset: pos }.into());
        }

        reader.read_at(pos, &mut block).await?;
        if is_zero_block(&block) {
            if state.on_zero_block() {
                break;
            }
            pos += BLOCK_SIZE as u64;
            continue;
        }

        let header = TarHeader::from_block(&block, pos)?;
        let data_start = pos + BLOCK_SIZE as u64;
        let data = if needs_data(&header) {
            ensure_fits(data_start, header.size, archive_len)?;
            if header.size > MAX_EXTENSION_SIZE {
                return Err(ParseError::PaxRecord {
                    offset: pos,
                    reason: "extension header too large",
                }
                .into());
            }
            let mut buf = vec![0u8; header.size as usize];
            reader.read_at(data_start, &mut buf).await?;
            Some(buf)
        } else {
            None
        };

        let size = state.on_header(&header, pos, data.as_deref(), archive_len)?;
        pos = next_header(pos, size)?;
    }

    debug!(entries = state.index.len(), bytes = archive_len, "walked remote archive");
    Ok(state.index)
}
