use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::ParseError;

/// Every tar header and data region is aligned to this block size.
pub const BLOCK_SIZE: usize = 512;

const NAME: std::ops::Range<usize> = 0..100;
const SIZE: std::ops::Range<usize> = 124..136;
const TYPEFLAG: usize = 156;
const MAGIC: std::ops::Range<usize> = 257..263;
const PREFIX: std::ops::Range<usize> = 345..500;

/// POSIX ustar magic. GNU headers carry `"ustar  \0"` and reuse the prefix
/// area for timestamps, so the prefix is only honored for POSIX headers.
const USTAR_MAGIC: &[u8] = b"ustar\0";

/// Tar entry type flags this crate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Regular,
    PaxExtended,
    PaxGlobal,
    GnuLongName,
    Other(u8),
}

impl EntryType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            b'0' | 0 => EntryType::Regular,
            b'x' => EntryType::PaxExtended,
            b'g' => EntryType::PaxGlobal,
            b'L' => EntryType::GnuLongName,
            other => EntryType::Other(other),
        }
    }

    /// Extension headers describe the entry that follows them.
    pub fn is_extension(&self) -> bool {
        matches!(
            self,
            EntryType::PaxExtended | EntryType::PaxGlobal | EntryType::GnuLongName
        )
    }
}

/// The fields of a 512-byte header block that indexing needs.
#[derive(Debug, Clone)]
pub struct TarHeader {
    pub name: String,
    pub size: u64,
    pub entry_type: EntryType,
    pub prefix: String,
}

impl TarHeader {
    /// Parse a header block located at `offset` in the archive.
    pub fn from_block(block: &[u8], offset: u64) -> Result<Self, ParseError> {
        if block.len() < BLOCK_SIZE {
            return Err(ParseError::TruncatedHeader { offset });
        }

        let prefix = if &block[MAGIC] == USTAR_MAGIC {
            nul_terminated(&block[PREFIX])
        } else {
            String::new()
        };

        Ok(Self {
            name: nul_terminated(&block[NAME]),
            size: parse_size(&block[SIZE], offset)?,
            entry_type: EntryType::from_u8(block[TYPEFLAG]),
            prefix,
        })
    }

    /// Path from the header alone: `prefix/name` when a prefix is present.
    pub fn path(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.prefix, self.name)
        }
    }
}

pub fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|b| *b == 0)
}

/// Round `size` up to the next multiple of [`BLOCK_SIZE`], `None` on overflow.
pub fn padded_size(size: u64) -> Option<u64> {
    size.div_ceil(BLOCK_SIZE as u64).checked_mul(BLOCK_SIZE as u64)
}

/// Decode an ASCII field up to its first NUL.
pub fn nul_terminated(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Decode the 12-byte size field.
///
/// Octal ASCII may be padded with NUL or whitespace on either side. A set
/// high bit on the first byte selects the GNU base-256 encoding.
fn parse_size(field: &[u8], offset: u64) -> Result<u64, ParseError> {
    if field[0] & 0x80 != 0 {
        return parse_base256(field, offset);
    }

    let text = std::str::from_utf8(field).map_err(|_| ParseError::InvalidSize { offset })?;
    let digits = text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 8).map_err(|_| ParseError::InvalidSize { offset })
}

fn parse_base256(field: &[u8], offset: u64) -> Result<u64, ParseError> {
    // Negative values (0xff marker) and anything wider than 64 bits are invalid.
    let (high, low) = field.split_at(field.len() - 8);
    if high[0] != 0x80 || high[1..].iter().any(|b| *b != 0) {
        return Err(ParseError::InvalidSize { offset });
    }
    Cursor::new(low)
        .read_u64::<BigEndian>()
        .map_err(|_| ParseError::InvalidSize { offset })
}
