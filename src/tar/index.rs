use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// Location of one file's data inside an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Absolute offset of the data region within the archive
    pub offset: u64,
    /// Data length in bytes
    pub size: u64,
}

impl IndexEntry {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }
}

// Wire form is a two-element array: `[offset, size]`.
impl Serialize for IndexEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.offset, self.size).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (offset, size) = <(u64, u64)>::deserialize(deserializer)?;
        Ok(Self { offset, size })
    }
}

/// Flat `path -> (offset, size)` map of the regular files in an archive.
///
/// Keys are unique and iteration follows first-insertion order, so trees
/// built from the same index always come out the same.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    entries: Vec<(String, IndexEntry)>,
    positions: HashMap<String, usize>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. A replaced path keeps its original position.
    pub fn insert(&mut self, path: String, entry: IndexEntry) {
        match self.positions.get(&path) {
            Some(&pos) => self.entries[pos].1 = entry,
            None => {
                self.positions.insert(path.clone(), self.entries.len());
                self.entries.push((path, entry));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<IndexEntry> {
        self.positions.get(path).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IndexEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), *entry))
    }

    /// Parse the JSON sidecar form `{ "<path>": [offset, size], ... }`.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromIterator<(String, IndexEntry)> for FileIndex {
    fn from_iter<I: IntoIterator<Item = (String, IndexEntry)>>(iter: I) -> Self {
        let mut index = FileIndex::new();
        for (path, entry) in iter {
            index.insert(path, entry);
        }
        index
    }
}

impl Serialize for FileIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, entry) in &self.entries {
            map.serialize_entry(path, entry)?;
        }
        map.end()
    }
}

struct FileIndexVisitor;

impl<'de> Visitor<'de> for FileIndexVisitor {
    type Value = FileIndex;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of path to [offset, size]")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<FileIndex, A::Error> {
        let mut index = FileIndex::new();
        while let Some((path, entry)) = access.next_entry::<String, IndexEntry>()? {
            index.insert(path, entry);
        }
        Ok(index)
    }
}

impl<'de> Deserialize<'de> for FileIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FileIndexVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_json_keeps_document_order() {
        let index =
            FileIndex::from_json(br#"{"z/last.txt":[1024,3],"a/first.txt":[512,11]}"#).unwrap();
        let paths: Vec<_> = index.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["z/last.txt", "a/first.txt"]);
        assert_eq!(index.get("a/first.txt"), Some(IndexEntry::new(512, 11)));
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn serializes_as_offset_size_pairs() {
        let index: FileIndex = [("readme.txt".to_string(), IndexEntry::new(512, 11))]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&index).unwrap(),
            r#"{"readme.txt":[512,11]}"#
        );
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut index = FileIndex::new();
        index.insert("a".into(), IndexEntry::new(512, 1));
        index.insert("b".into(), IndexEntry::new(1536, 2));
        index.insert("a".into(), IndexEntry::new(2560, 3));
        assert_eq!(index.len(), 2);
        assert_eq!(index.iter().next(), Some(("a", IndexEntry::new(2560, 3))));
    }

    #[test]
    fn rejects_malformed_sidecar() {
        assert!(FileIndex::from_json(br#"{"a": [1]}"#).is_err());
        assert!(FileIndex::from_json(b"[]").is_err());
    }
}
