//! Packaging strategies: how records are partitioned into containers.
//!
//! | Mode          | Containers                      | Layout inside a container          |
//! |---------------|---------------------------------|------------------------------------|
//! | `single`      | one for the whole run           | `{account}/{folder path}`          |
//! | `per-account` | one per account                 | `{folder path}`                    |
//! | `per-folder`  | one per (account, folder path)  | `{folder path}`                    |
//! | `per-message` | one per record (deduplicated)   | `Inbox`                            |
//!
//! Every strategy stops once the global [`WriteBudget`] is spent and keeps
//! going after a failed unit.

mod per_account;
mod per_folder;
mod per_message;
mod single;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::archive::{ArchiveSink, FolderHandle, SinkFactory};
use crate::error::Result;
use crate::model::record::{AccountBatch, MetadataRecord};
use crate::synth;

/// Partitioning policy for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackagingMode {
    Single,
    PerAccount,
    PerFolder,
    #[default]
    PerMessage,
}

impl PackagingMode {
    /// Resolve the command-line mode flags.
    ///
    /// `single` beats `per_folder`, which beats `per_account`. Returns
    /// `None` when no flag is set so the caller can apply its own default;
    /// `per_message` on its own maps to [`PackagingMode::PerMessage`].
    pub fn from_flags(
        single: bool,
        per_message: bool,
        per_folder: bool,
        per_account: bool,
    ) -> Option<Self> {
        if single {
            Some(Self::Single)
        } else if per_folder {
            Some(Self::PerFolder)
        } else if per_account {
            Some(Self::PerAccount)
        } else if per_message {
            Some(Self::PerMessage)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::PerAccount => "per-account",
            Self::PerFolder => "per-folder",
            Self::PerMessage => "per-message",
        }
    }
}

impl fmt::Display for PackagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global message limit for a run.
///
/// A slot is reserved before every write and handed back if the write
/// fails, so the count stays exact when containers are filled from
/// several threads.
#[derive(Debug, Default)]
pub struct WriteBudget {
    limit: Option<u64>,
    written: AtomicU64,
}

impl WriteBudget {
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            written: AtomicU64::new(0),
        }
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Messages currently counted as written.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.written() >= limit)
    }

    /// Reserve one slot. Returns `false` once the limit is reached.
    pub fn try_acquire(&self) -> bool {
        self.written
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match self.limit {
                Some(limit) if n >= limit => None,
                _ => Some(n + 1),
            })
            .is_ok()
    }

    /// Hand back `count` slots after a failed write or a discarded unit.
    pub fn release(&self, count: u64) {
        if count > 0 {
            self.written.fetch_sub(count, Ordering::SeqCst);
        }
    }
}

/// Everything a strategy needs besides its input.
pub struct RunContext<'a> {
    pub factory: &'a dyn SinkFactory,
    pub output_dir: PathBuf,
    pub budget: WriteBudget,
    /// Called with the running total after every written message.
    pub progress: Option<&'a dyn Fn(u64)>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        factory: &'a dyn SinkFactory,
        output_dir: impl AsRef<Path>,
        limit: Option<u64>,
    ) -> Self {
        Self {
            factory,
            output_dir: output_dir.as_ref().to_path_buf(),
            budget: WriteBudget::new(limit),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Fn(u64)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Collision-free path for a container named `stem`.
    fn container_path(&self, stem: &str) -> PathBuf {
        self.factory.unique_path(&self.output_dir, stem)
    }

    /// Remove what is left of a failed container.
    fn discard(&self, path: &Path) {
        if let Err(e) = self.factory.discard(path) {
            warn!(path = %path.display(), error = %e, "Could not remove partial container");
        }
    }

    /// Synthesize and write one record, honoring the budget.
    ///
    /// `Ok(false)` means the limit was reached and nothing was written.
    fn write_record(
        &self,
        sink: &mut dyn ArchiveSink,
        folder: FolderHandle,
        account: &str,
        record: &MetadataRecord,
        source_name: &str,
    ) -> Result<bool> {
        if !self.budget.try_acquire() {
            return Ok(false);
        }

        let message = synth::synthesize(account, record, source_name);
        if let Err(e) = sink.add_message(folder, &message) {
            self.budget.release(1);
            return Err(e);
        }

        if let Some(progress) = self.progress {
            progress(self.budget.written());
        }
        Ok(true)
    }
}

/// Outcome of one unit of work (an account, a folder group, …).
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// Human-readable identity of the unit.
    pub name: String,
    /// Containers written for this unit.
    pub paths: Vec<PathBuf>,
    /// Messages written.
    pub written: u64,
    /// Failure that caused the unit to be skipped.
    pub error: Option<String>,
}

impl UnitReport {
    fn ok(name: impl Into<String>, paths: Vec<PathBuf>, written: u64) -> Self {
        Self {
            name: name.into(),
            paths,
            written,
            error: None,
        }
    }

    fn failed(name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            written: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Result of a packaging run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub mode: PackagingMode,
    pub limit: Option<u64>,
    pub total_written: u64,
    /// Records skipped because their (account, id) was already written.
    pub duplicates_skipped: u64,
    /// Individual records that failed outside a failed unit.
    pub failed_records: u64,
    pub units: Vec<UnitReport>,
}

impl PackageReport {
    fn new(mode: PackagingMode, limit: Option<u64>) -> Self {
        Self {
            mode,
            limit,
            total_written: 0,
            duplicates_skipped: 0,
            failed_records: 0,
            units: Vec::new(),
        }
    }

    /// Units skipped because of an error.
    pub fn failed_units(&self) -> usize {
        self.units.iter().filter(|u| u.error.is_some()).count()
    }

    /// Distinct containers written.
    pub fn containers(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self
            .units
            .iter()
            .flat_map(|u| u.paths.iter().map(PathBuf::as_path))
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

/// Run `mode` over `batches`.
///
/// Errors returned here are catastrophic (the archive output could not be
/// acquired at all); per-unit failures are recorded in the report instead.
pub fn package(
    mode: PackagingMode,
    batches: &[AccountBatch],
    ctx: &RunContext<'_>,
) -> Result<PackageReport> {
    ctx.factory.prepare(&ctx.output_dir)?;

    let mut report = PackageReport::new(mode, ctx.budget.limit());
    match mode {
        PackagingMode::Single => single::run(batches, ctx, &mut report)?,
        PackagingMode::PerAccount => per_account::run(batches, ctx, &mut report),
        PackagingMode::PerFolder => per_folder::run(batches, ctx, &mut report),
        PackagingMode::PerMessage => per_message::run(batches, ctx, &mut report),
    }
    report.total_written = ctx.budget.written();

    if ctx.budget.is_exhausted() {
        info!(limit = ?ctx.budget.limit(), "Global limit reached");
    }
    info!(
        mode = %mode,
        total = report.total_written,
        containers = report.containers().len(),
        failed_units = report.failed_units(),
        "Packaging finished"
    );
    Ok(report)
}

/// Number of records a run will try to write, for progress reporting.
pub fn eligible_records(batches: &[AccountBatch], limit: Option<u64>) -> u64 {
    let total: u64 = batches.iter().map(|b| b.records.len() as u64).sum();
    limit.map_or(total, |l| total.min(l))
}
