//! PAX extended header records and the per-entry overrides they produce.

use crate::error::ParseError;

use super::header::{TarHeader, nul_terminated};

/// Overrides captured from extension headers, waiting for the entry they
/// describe. Lives on the stack of a single scan.
#[derive(Debug, Default)]
pub struct PendingOverrides {
    pax_path: Option<String>,
    pax_size: Option<u64>,
    gnu_long_name: Option<String>,
}

impl PendingOverrides {
    /// Record the data region of a GNU `L` entry.
    pub fn set_long_name(&mut self, data: &[u8]) {
        self.gnu_long_name = Some(nul_terminated(data));
    }

    /// Parse a PAX extended header data region.
    ///
    /// Each record reads `"<len> <key>=<value>\n"`, where `len` counts the
    /// whole record from its first digit through the newline.
    pub fn apply_pax(&mut self, data: &[u8], header_offset: u64) -> Result<(), ParseError> {
        let fail = |reason: &'static str| ParseError::PaxRecord {
            offset: header_offset,
            reason,
        };

        let mut pos = 0;
        while pos < data.len() {
            if data[pos] == 0 {
                break;
            }

            let space = data[pos..]
                .iter()
                .position(|b| *b == b' ')
                .map(|i| pos + i)
                .ok_or_else(|| fail("missing length separator"))?;

            let len: usize = std::str::from_utf8(&data[pos..space])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| fail("invalid record length"))?;

            let end = pos + len;
            if end > data.len() {
                return Err(fail("record extends past header data"));
            }
            if end <= space + 1 {
                return Err(fail("record ends before its own start"));
            }

            let body = &data[space + 1..end];
            let Some((&b'\n', kv)) = body.split_last() else {
                return Err(fail("record is not newline terminated"));
            };
            let eq = kv
                .iter()
                .position(|b| *b == b'=')
                .ok_or_else(|| fail("record has no '='"))?;
            let (key, value) = (&kv[..eq], &kv[eq + 1..]);

            match key {
                b"path" => self.pax_path = Some(String::from_utf8_lossy(value).into_owned()),
                b"size" => {
                    let size = std::str::from_utf8(value)
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| fail("invalid size value"))?;
                    self.pax_size = Some(size);
                }
                _ => {}
            }

            pos = end;
        }

        Ok(())
    }

    /// Resolve the path of the entry described by `header` and clear every
    /// pending path override.
    ///
    /// Precedence: PAX `path`, GNU long name, then the header's own
    /// `prefix/name`.
    pub fn take_path(&mut self, header: &TarHeader) -> String {
        let pax = self.pax_path.take();
        let long = self.gnu_long_name.take();
        pax.or(long).unwrap_or_else(|| header.path())
    }

    /// Size of the entry described by `header`, honoring a PAX `size` record.
    pub fn take_size(&mut self, header: &TarHeader) -> u64 {
        self.pax_size.take().unwrap_or(header.size)
    }
}
