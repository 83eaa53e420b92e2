//! Hierarchical file/folder view over a flat [`FileIndex`].

use serde::Serialize;
use std::collections::HashMap;

use crate::tar::FileIndex;

/// One node of the attachment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileNode {
    File {
        name: String,
        /// Index key of the file, usable with `attachment_content`
        path: String,
        size: u64,
    },
    Folder {
        name: String,
        children: Vec<FileNode>,
    },
}

impl FileNode {
    pub fn name(&self) -> &str {
        match self {
            FileNode::File { name, .. } | FileNode::Folder { name, .. } => name,
        }
    }
}

/// Folder under construction. Children stay in first-seen order; the map
/// only speeds up lookups of existing subfolders.
#[derive(Default)]
struct FolderBuilder {
    children: Vec<ChildBuilder>,
    folders: HashMap<String, usize>,
}

enum ChildBuilder {
    File {
        name: String,
        path: String,
        size: u64,
    },
    Folder {
        name: String,
        folder: FolderBuilder,
    },
}

impl FolderBuilder {
    fn folder(&mut self, name: &str) -> &mut FolderBuilder {
        let existing = self.folders.get(name).copied();
        let pos = match existing {
            Some(pos) => pos,
            None => {
                let pos = self.children.len();
                self.children.push(ChildBuilder::Folder {
                    name: name.to_string(),
                    folder: FolderBuilder::default(),
                });
                self.folders.insert(name.to_string(), pos);
                pos
            }
        };
        match &mut self.children[pos] {
            ChildBuilder::Folder { folder, .. } => folder,
            ChildBuilder::File { .. } => unreachable!("folder lookup points at a file"),
        }
    }

    fn into_nodes(self) -> Vec<FileNode> {
        self.children
            .into_iter()
            .map(|child| match child {
                ChildBuilder::File { name, path, size } => FileNode::File { name, path, size },
                ChildBuilder::Folder { name, folder } => FileNode::Folder {
                    name,
                    children: folder.into_nodes(),
                },
            })
            .collect()
    }
}

/// Build the visible tree of `index`, with `strip_prefix` removed from every
/// path that starts with it.
///
/// Empty files and directory markers (paths ending in `/`) are left out.
pub fn build_tree(index: &FileIndex, strip_prefix: &str) -> Vec<FileNode> {
    let mut root = FolderBuilder::default();

    for (path, entry) in index.iter() {
        if entry.size == 0 || path.ends_with('/') {
            continue;
        }

        let relative = path.strip_prefix(strip_prefix).unwrap_or(path);
        let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        let Some(file_name) = segments.pop() else {
            continue;
        };

        let mut folder = &mut root;
        for segment in segments {
            folder = folder.folder(segment);
        }
        folder.children.push(ChildBuilder::File {
            name: file_name.to_string(),
            path: path.to_string(),
            size: entry.size,
        });
    }

    root.into_nodes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tar::IndexEntry;

    fn index(entries: &[(&str, u64)]) -> FileIndex {
        entries
            .iter()
            .enumerate()
            .map(|(i, (path, size))| (path.to_string(), IndexEntry::new(512 * (i as u64 + 1), *size)))
            .collect()
    }

    fn file(name: &str, path: &str, size: u64) -> FileNode {
        FileNode::File {
            name: name.into(),
            path: path.into(),
            size,
        }
    }

    fn folder(name: &str, children: Vec<FileNode>) -> FileNode {
        FileNode::Folder {
            name: name.into(),
            children,
        }
    }

    #[test]
    fn nests_and_strips_prefix() {
        let index = index(&[
            ("attachments/b/x.txt", 3),
            ("attachments/a.txt", 1),
            ("attachments/b/c/y.txt", 2),
            ("attachments/b/z.txt", 4),
        ]);
        let tree = build_tree(&index, "attachments/");
        assert_eq!(
            tree,
            vec![
                folder(
                    "b",
                    vec![
                        file("x.txt", "attachments/b/x.txt", 3),
                        folder("c", vec![file("y.txt", "attachments/b/c/y.txt", 2)]),
                        file("z.txt", "attachments/b/z.txt", 4),
                    ]
                ),
                file("a.txt", "attachments/a.txt", 1),
            ]
        );
    }

    #[test]
    fn skips_empty_files_and_directory_markers() {
        let index = index(&[("docs/", 5), ("docs/empty.txt", 0), ("docs/real.txt", 9)]);
        let tree = build_tree(&index, "");
        assert_eq!(tree, vec![folder("docs", vec![file("real.txt", "docs/real.txt", 9)])]);
    }

    #[test]
    fn unprefixed_paths_are_kept_whole() {
        let index = index(&[("other/file.bin", 1)]);
        let tree = build_tree(&index, "attachments/");
        assert_eq!(tree, vec![folder("other", vec![file("file.bin", "other/file.bin", 1)])]);
    }

    #[test]
    fn build_is_idempotent() {
        let index = index(&[("a/b/c.txt", 1), ("a/d.txt", 2), ("e.txt", 3), ("a/b/f.txt", 4)]);
        assert_eq!(build_tree(&index, ""), build_tree(&index, ""));
    }

    #[test]
    fn leaf_ancestors_rebuild_the_path() {
        fn walk(nodes: &[FileNode], parents: &mut Vec<String>, out: &mut Vec<(String, String)>) {
            for node in nodes {
                match node {
                    FileNode::File { name, path, .. } => {
                        let mut parts = parents.clone();
                        parts.push(name.clone());
                        out.push((parts.join("/"), path.clone()));
                    }
                    FileNode::Folder { name, children } => {
                        parents.push(name.clone());
                        walk(children, parents, out);
                        parents.pop();
                    }
                }
            }
        }

        let index = index(&[("att/x/y/z.txt", 1), ("att/x/w.txt", 1), ("att/v.txt", 1)]);
        let mut pairs = Vec::new();
        walk(&build_tree(&index, "att/"), &mut Vec::new(), &mut pairs);
        for (joined, path) in pairs {
            assert_eq!(format!("att/{joined}"), path);
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let tree = build_tree(&index(&[("d/f.txt", 7)]), "");
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "folder", "name": "d", "children": [
                    {"type": "file", "name": "f.txt", "path": "d/f.txt", "size": 7}
                ]}
            ])
        );
    }
}
