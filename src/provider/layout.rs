use regex::Regex;

use crate::error::ParseError;
use crate::tar::{FileIndex, IndexEntry};

pub const DEFAULT_INDEX_PATTERN: &str = r"(^|/)attachments\.index\.json$";
pub const DEFAULT_PAYLOAD_PATTERN: &str = r"(^|/)attachments\.tar$";

/// Naming convention that identifies, inside a container archive, the JSON
/// sidecar index and the attachments tar it describes.
#[derive(Debug, Clone)]
pub struct AttachmentLayout {
    index_pattern: Regex,
    payload_pattern: Regex,
}

/// Entries of a container archive selected by an [`AttachmentLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedAttachments {
    pub index_path: String,
    pub index: IndexEntry,
    pub payload_path: String,
    pub payload: IndexEntry,
}

impl AttachmentLayout {
    pub fn new(index_pattern: &str, payload_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            index_pattern: Regex::new(index_pattern)?,
            payload_pattern: Regex::new(payload_pattern)?,
        })
    }

    /// First entries of `index` matching each pattern.
    pub fn locate(&self, index: &FileIndex) -> Result<LocatedAttachments, ParseError> {
        let find = |pattern: &Regex, what| {
            index
                .iter()
                .find(|(path, _)| pattern.is_match(path))
                .map(|(path, entry)| (path.to_string(), entry))
                .ok_or(ParseError::MissingEntry { what })
        };

        let (index_path, index_entry) = find(&self.index_pattern, "an attachments index")?;
        let (payload_path, payload) = find(&self.payload_pattern, "an attachments payload")?;

        Ok(LocatedAttachments {
            index_path,
            index: index_entry,
            payload_path,
            payload,
        })
    }
}

impl Default for AttachmentLayout {
    fn default() -> Self {
        Self {
            index_pattern: Regex::new(DEFAULT_INDEX_PATTERN).expect("valid index pattern"),
            payload_pattern: Regex::new(DEFAULT_PAYLOAD_PATTERN).expect("valid payload pattern"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> FileIndex {
        [
            ("meta/run.json", IndexEntry::new(512, 10)),
            ("meta/attachments.index.json", IndexEntry::new(1536, 40)),
            ("meta/attachments.tar", IndexEntry::new(2560, 3072)),
        ]
        .into_iter()
        .map(|(p, e)| (p.to_string(), e))
        .collect()
    }

    #[test]
    fn default_layout_finds_both_parts() {
        let located = AttachmentLayout::default().locate(&container()).unwrap();
        assert_eq!(located.index_path, "meta/attachments.index.json");
        assert_eq!(located.index, IndexEntry::new(1536, 40));
        assert_eq!(located.payload_path, "meta/attachments.tar");
        assert_eq!(located.payload, IndexEntry::new(2560, 3072));
    }

    #[test]
    fn missing_payload_is_reported() {
        let layout = AttachmentLayout::new(r"index\.json$", r"\.tar\.zst$").unwrap();
        let err = layout.locate(&container()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingEntry {
                what: "an attachments payload"
            }
        );
    }

    #[test]
    fn custom_patterns() {
        let layout = AttachmentLayout::new(r"run\.json$", r"attachments\.tar$").unwrap();
        assert_eq!(layout.locate(&container()).unwrap().index_path, "meta/run.json");
    }
}
