//! In-memory sink, used for dry runs and tests.
//!
//! Containers live in a registry shared by the factory and every sink it
//! creates, so their contents can be inspected after packaging finishes.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{check_handle, ArchiveSink, ContainerStats, FolderHandle, SinkFactory};
use crate::error::{RepackError, Result};
use crate::model::message::SyntheticMessage;

/// Snapshot of one in-memory container.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    /// `(parent index, name)`; index 0 is the root.
    folders: Vec<(usize, String)>,
    /// `(folder index, message)` in write order.
    messages: Vec<(usize, SyntheticMessage)>,
    /// Set once `finish` has run.
    pub finished: bool,
}

impl MemoryContainer {
    fn new() -> Self {
        Self {
            folders: vec![(0, String::new())],
            messages: Vec::new(),
            finished: false,
        }
    }

    /// Slash-joined path of folder `index` (empty for the root).
    fn path_of(&self, index: usize) -> String {
        let mut parts = Vec::new();
        let mut current = index;
        while current != 0 {
            let (parent, name) = &self.folders[current];
            parts.push(name.as_str());
            current = *parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Full paths of every folder except the root, in creation order.
    pub fn folder_paths(&self) -> Vec<String> {
        (1..self.folders.len()).map(|i| self.path_of(i)).collect()
    }

    /// Messages stored directly in the folder at `path` (`""` for the root).
    pub fn messages_in(&self, path: &str) -> Vec<&SyntheticMessage> {
        self.messages
            .iter()
            .filter(|(folder, _)| self.path_of(*folder) == path)
            .map(|(_, msg)| msg)
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

type Registry = Arc<Mutex<BTreeMap<PathBuf, MemoryContainer>>>;

fn lock(registry: &Registry) -> Result<MutexGuard<'_, BTreeMap<PathBuf, MemoryContainer>>> {
    registry
        .lock()
        .map_err(|_| RepackError::Archive("in-memory registry poisoned".into()))
}

/// Factory for [`MemorySink`] containers.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkFactory {
    registry: Registry,
    fail_prepare: bool,
    fail_create: HashSet<String>,
    fail_subjects: HashSet<String>,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make [`SinkFactory::prepare`] fail.
    pub fn failing_prepare(mut self) -> Self {
        self.fail_prepare = true;
        self
    }

    /// Make container creation fail when the file name contains `fragment`.
    pub fn failing_create(mut self, fragment: &str) -> Self {
        self.fail_create.insert(fragment.to_string());
        self
    }

    /// Make writes of messages with this exact subject fail.
    pub fn failing_subject(mut self, subject: &str) -> Self {
        self.fail_subjects.insert(subject.to_string());
        self
    }

    /// Snapshot of the container created at `path`.
    pub fn container(&self, path: &Path) -> Option<MemoryContainer> {
        lock(&self.registry).ok()?.get(path).cloned()
    }

    /// Paths of every container created so far, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        lock(&self.registry)
            .map(|reg| reg.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total messages across all containers.
    pub fn total_messages(&self) -> usize {
        lock(&self.registry)
            .map(|reg| reg.values().map(MemoryContainer::message_count).sum())
            .unwrap_or(0)
    }
}

impl SinkFactory for MemorySinkFactory {
    fn extension(&self) -> &str {
        "mbox"
    }

    fn prepare(&self, output_dir: &Path) -> Result<()> {
        if self.fail_prepare {
            return Err(RepackError::Archive(format!(
                "cannot initialize archive output in {}",
                output_dir.display()
            )));
        }
        Ok(())
    }

    fn create(&self, path: &Path) -> Result<Box<dyn ArchiveSink>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail_create.iter().any(|f| name.contains(f.as_str())) {
            return Err(RepackError::Archive(format!("cannot create container {name}")));
        }

        lock(&self.registry)?.insert(path.to_path_buf(), MemoryContainer::new());
        Ok(Box::new(MemorySink {
            registry: Arc::clone(&self.registry),
            path: path.to_path_buf(),
            fail_subjects: self.fail_subjects.clone(),
        }))
    }

    fn discard(&self, path: &Path) -> Result<()> {
        lock(&self.registry)?.remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        lock(&self.registry)
            .map(|reg| reg.contains_key(path))
            .unwrap_or(false)
    }
}

/// A container held in memory.
#[derive(Debug)]
pub struct MemorySink {
    registry: Registry,
    path: PathBuf,
    fail_subjects: HashSet<String>,
}

impl MemorySink {
    fn with_container<T>(&self, f: impl FnOnce(&mut MemoryContainer) -> Result<T>) -> Result<T> {
        let mut reg = lock(&self.registry)?;
        let container = reg
            .get_mut(&self.path)
            .ok_or_else(|| {
                RepackError::Archive(format!("unknown container {}", self.path.display()))
            })?;
        f(container)
    }
}

impl ArchiveSink for MemorySink {
    fn add_subfolder(&mut self, parent: FolderHandle, name: &str) -> Result<FolderHandle> {
        self.with_container(|c| {
            check_handle(parent, c.folders.len())?;
            c.folders.push((parent.0, name.to_string()));
            Ok(FolderHandle(c.folders.len() - 1))
        })
    }

    fn add_message(&mut self, folder: FolderHandle, message: &SyntheticMessage) -> Result<()> {
        if self.fail_subjects.contains(&message.subject) {
            return Err(RepackError::Archive(format!(
                "cannot write message '{}'",
                message.subject
            )));
        }
        self.with_container(|c| {
            check_handle(folder, c.folders.len())?;
            c.messages.push((folder.0, message.clone()));
            Ok(())
        })
    }

    fn finish(&mut self) -> Result<ContainerStats> {
        self.with_container(|c| {
            c.finished = true;
            Ok(ContainerStats {
                folders: c.folders.len() - 1,
                messages: c.messages.len(),
                bytes: 0,
            })
        })
    }
}
