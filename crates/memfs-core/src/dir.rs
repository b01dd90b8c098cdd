// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Directory listing for the flat namespace

use std::path::Path;

use tracing::debug;

use crate::store::FileStore;
use crate::{DirEntry, FileKind};

fn dot_entries() -> Vec<DirEntry> {
    [".", ".."]
        .into_iter()
        .map(|name| DirEntry {
            name: name.to_string(),
            kind: FileKind::Directory,
        })
        .collect()
}

/// List a directory: `.` and `..` first, then, for the root, every file in
/// the store in table order. Any other path has no entries of its own.
pub fn list(store: &FileStore, path: impl AsRef<Path>) -> Vec<DirEntry> {
    let path = path.as_ref();
    let mut entries = dot_entries();

    if path == Path::new("/") {
        entries.extend(store.names().into_iter().map(|name| DirEntry {
            name,
            kind: FileKind::RegularFile,
        }));
    }

    debug!(path = %path.display(), entries = entries.len(), "listed directory");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsConfig;
    use std::collections::HashSet;

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn empty_root_has_dot_entries() {
        let store = FileStore::new(&FsConfig::default());
        let entries = list(&store, "/");
        assert_eq!(names(&entries), vec![".", ".."]);
        assert!(entries.iter().all(|e| e.kind == FileKind::Directory));
    }

    #[test]
    fn root_lists_every_file_after_dots() {
        let store = FileStore::new(&FsConfig::default());
        for name in ["/a.txt", "/b.txt", "/c.bin"] {
            store.create(name, 0o644).unwrap();
        }

        let entries = list(&store, "/");
        assert_eq!(names(&entries[..2]), vec![".", ".."]);

        let files: HashSet<&str> = names(&entries[2..]).into_iter().collect();
        assert_eq!(files, HashSet::from(["a.txt", "b.txt", "c.bin"]));
        assert!(entries[2..].iter().all(|e| e.kind == FileKind::RegularFile));
    }

    #[test]
    fn listing_follows_renames_and_deletes() {
        let store = FileStore::new(&FsConfig::default());
        store.create("/old", 0o644).unwrap();
        store.create("/gone", 0o644).unwrap();
        store.rename("/old", "/new").unwrap();
        store.delete("/gone").unwrap();

        assert_eq!(names(&list(&store, "/")), vec![".", "..", "new"]);
    }

    #[test]
    fn non_root_path_has_only_dot_entries() {
        let store = FileStore::new(&FsConfig::default());
        store.create("/a.txt", 0o644).unwrap();

        assert_eq!(names(&list(&store, "/a.txt")), vec![".", ".."]);
        assert_eq!(names(&list(&store, "/sub/dir")), vec![".", ".."]);
    }
}
