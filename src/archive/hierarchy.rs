//! Folder hierarchy builder.
//!
//! Turns a list of folder segments into nested folders inside one
//! container, creating each distinct path at most once.

use std::collections::HashMap;

use tracing::trace;

use super::{ArchiveSink, FolderHandle};
use crate::error::Result;

/// Already-created folders of one container, keyed by the lowercased full
/// path from the root. Scoped to a single container; never shared.
#[derive(Debug, Default)]
pub struct FolderCache {
    entries: HashMap<String, FolderHandle>,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of folders created through this cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Return the folder at `segments` below `root`, creating missing ancestors.
///
/// Lookups are case-insensitive: the first spelling seen for a path is the
/// one created. An empty `segments` returns `root`.
pub fn ensure_path<S: AsRef<str>>(
    sink: &mut dyn ArchiveSink,
    cache: &mut FolderCache,
    root: FolderHandle,
    segments: &[S],
) -> Result<FolderHandle> {
    let mut parent = root;
    let mut key = String::new();

    for segment in segments {
        let name = segment.as_ref();
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&name.to_lowercase());

        parent = match cache.entries.get(&key) {
            Some(&handle) => handle,
            None => {
                let handle = sink.add_subfolder(parent, name)?;
                trace!(path = %key, "Created folder");
                cache.entries.insert(key.clone(), handle);
                handle
            }
        };
    }

    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::memory::MemorySinkFactory;
    use crate::archive::SinkFactory;
    use std::path::Path;

    #[test]
    fn test_ensure_path_is_idempotent() {
        let factory = MemorySinkFactory::new();
        let mut sink = factory.create(Path::new("a.mbox")).unwrap();
        let mut cache = FolderCache::new();
        let root = sink.root();

        let first = ensure_path(sink.as_mut(), &mut cache, root, &["A", "B"]).unwrap();
        let second = ensure_path(sink.as_mut(), &mut cache, root, &["A", "B"]).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 2);
        sink.finish().unwrap();

        let container = factory.container(Path::new("a.mbox")).unwrap();
        assert_eq!(container.folder_paths(), vec!["A", "A/B"]);
    }

    #[test]
    fn test_ensure_path_shares_prefixes_case_insensitively() {
        let factory = MemorySinkFactory::new();
        let mut sink = factory.create(Path::new("b.mbox")).unwrap();
        let mut cache = FolderCache::new();
        let root = sink.root();

        let ab = ensure_path(sink.as_mut(), &mut cache, root, &["Inbox", "Work"]).unwrap();
        let ac = ensure_path(sink.as_mut(), &mut cache, root, &["INBOX", "Home"]).unwrap();
        let ab2 = ensure_path(sink.as_mut(), &mut cache, root, &["inbox", "WORK"]).unwrap();
        assert_ne!(ab, ac);
        assert_eq!(ab, ab2);
        assert_eq!(cache.len(), 3);
        sink.finish().unwrap();

        let container = factory.container(Path::new("b.mbox")).unwrap();
        assert_eq!(container.folder_paths(), vec!["Inbox", "Inbox/Work", "Inbox/Home"]);
    }

    #[test]
    fn test_empty_path_returns_root() {
        let factory = MemorySinkFactory::new();
        let mut sink = factory.create(Path::new("c.mbox")).unwrap();
        let mut cache = FolderCache::new();
        let root = sink.root();
        let empty: [&str; 0] = [];
        assert_eq!(ensure_path(sink.as_mut(), &mut cache, root, &empty).unwrap(), root);
        assert!(cache.is_empty());
    }
}
