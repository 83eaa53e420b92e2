//! Tar archive indexing.
//!
//! This module turns a POSIX tar archive into a flat [`FileIndex`] mapping
//! each regular file's path to the offset and size of its data region, so
//! that single files can later be fetched with one byte-range read.
//!
//! ## Architecture
//!
//! - [`header`]: decoding of 512-byte ustar header blocks
//! - [`pax`]: PAX extended records and GNU long names, held as pending
//!   overrides for the entry that follows
//! - [`scanner`]: the sequential header walk, over memory or a remote reader
//! - [`index`]: the resulting [`FileIndex`] and its JSON sidecar form
//!
//! ## Tar Format Overview
//!
//! A tar archive is a sequence of 512-byte blocks:
//! 1. A header block describing one entry (name, size, type flag, prefix)
//! 2. The entry's data, padded to a whole number of blocks
//! 3. Two all-zero blocks marking the end of the archive
//!
//! Paths longer than the 100-byte name field arrive through a preceding
//! PAX `x` header or GNU `L` header whose data holds the full path.
//!
//! ## Limitations
//!
//! - Only regular files are indexed; links, devices and directories are skipped
//! - Header checksums are not verified

pub mod header;
pub mod index;
pub mod pax;
pub mod scanner;

pub use header::{BLOCK_SIZE, EntryType, TarHeader};
pub use index::{FileIndex, IndexEntry};
pub use scanner::{scan, scan_remote};
