//! Archive sink capability: the container format packaging writes into.
//!
//! A container is a root folder, nested subfolders and messages. Packaging
//! only ever talks to [`ArchiveSink`] and [`SinkFactory`], so the concrete
//! on-disk format can be swapped without touching `crate::package`.

pub mod hierarchy;
pub mod mbox;
pub mod memory;

use std::path::{Path, PathBuf};

use crate::error::{RepackError, Result};
use crate::model::message::SyntheticMessage;

/// Handle to a folder inside one container. Meaningless in any other container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderHandle(pub(crate) usize);

impl FolderHandle {
    /// The root folder of every container.
    pub const ROOT: FolderHandle = FolderHandle(0);
}

/// Counters reported when a container is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ContainerStats {
    /// Folders created, excluding the root.
    pub folders: usize,
    pub messages: usize,
    /// Bytes written to disk (0 for in-memory sinks).
    pub bytes: u64,
}

/// One open archive container.
pub trait ArchiveSink {
    /// Handle of the container root.
    fn root(&self) -> FolderHandle {
        FolderHandle::ROOT
    }

    /// Create a subfolder named `name` under `parent`.
    fn add_subfolder(&mut self, parent: FolderHandle, name: &str) -> Result<FolderHandle>;

    /// Write `message` into `folder`.
    fn add_message(&mut self, folder: FolderHandle, message: &SyntheticMessage) -> Result<()>;

    /// Flush and close the container.
    fn finish(&mut self) -> Result<ContainerStats>;
}

/// Creates containers of one format.
pub trait SinkFactory {
    /// File extension of containers, without the dot.
    fn extension(&self) -> &str;

    /// Acquire whatever the format needs before any container is created.
    /// A failure here aborts the whole run.
    fn prepare(&self, output_dir: &Path) -> Result<()>;

    /// Create a new, empty container at `path`.
    fn create(&self, path: &Path) -> Result<Box<dyn ArchiveSink>>;

    /// `true` if a container already occupies `path`.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Remove a container left behind by a failed unit.
    fn discard(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RepackError::io(path, e)),
        }
    }

    /// Path for `{stem}.{ext}` in `dir` that does not exist yet, appending
    /// `_1`, `_2`, … to the stem as needed.
    fn unique_path(&self, dir: &Path, stem: &str) -> PathBuf {
        let ext = self.extension();
        let candidate = dir.join(format!("{stem}.{ext}"));
        if !self.exists(&candidate) {
            return candidate;
        }

        let mut i: u64 = 1;
        loop {
            let candidate = dir.join(format!("{stem}_{i}.{ext}"));
            if !self.exists(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }
}

/// Validate a handle against the number of folders a sink holds.
pub(crate) fn check_handle(handle: FolderHandle, folder_count: usize) -> Result<()> {
    if handle.0 < folder_count {
        Ok(())
    } else {
        Err(RepackError::Archive(format!(
            "folder handle {} does not belong to this container",
            handle.0
        )))
    }
}
