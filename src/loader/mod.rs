//! Record loader: discovers per-account metadata files and parses them.
//!
//! ```text
//! metadata/
//!   alice@example.com/
//!     emails_20240101_093000.csv
//!     emails_20240315_141210.csv   <- newest, selected
//!   backup/
//!     emails_20240210_080000.csv
//! ```

pub mod csv;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::{RepackError, Result};
use crate::model::record::{AccountBatch, MetadataRecord, RECORD_COLUMNS};

/// Naming convention of per-account metadata files.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Required file name prefix (`emails_`).
    pub file_prefix: String,
    /// Required extension without the dot (`csv`).
    pub file_extension: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderConfig::default().into()
    }
}

impl From<LoaderConfig> for LoaderOptions {
    fn from(cfg: LoaderConfig) -> Self {
        Self {
            file_prefix: cfg.file_prefix,
            file_extension: cfg.file_extension,
        }
    }
}

impl LoaderOptions {
    /// `true` if `name` follows the `{prefix}*.{extension}` convention.
    pub fn matches(&self, name: &str) -> bool {
        let suffix = format!(".{}", self.file_extension);
        name.starts_with(&self.file_prefix)
            && name.len() > self.file_prefix.len() + suffix.len()
            && name.to_lowercase().ends_with(&suffix.to_lowercase())
    }

    /// Timestamp embedded in `{prefix}YYYYMMDD_HHMMSS.{ext}`, if any.
    fn embedded_timestamp(&self, name: &str) -> Option<NaiveDateTime> {
        let stem = name.strip_prefix(&self.file_prefix)?;
        let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
        NaiveDateTime::parse_from_str(stem, "%Y%m%d_%H%M%S").ok()
    }
}

/// Load one [`AccountBatch`] per account directory under `root`.
///
/// Accounts without a matching file, or whose file cannot be read, are
/// skipped with a warning. Fails only when `root` does not exist or holds
/// no account directories.
pub fn load_batches(root: &Path, options: &LoaderOptions) -> Result<Vec<AccountBatch>> {
    let dirs = account_dirs(root)?;
    let mut batches = Vec::with_capacity(dirs.len());

    for dir in dirs {
        let account = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let latest = match find_latest_metadata_file(&dir, options) {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(
                    account = %account,
                    dir = %dir.display(),
                    "No metadata file found, skipping account"
                );
                continue;
            }
            Err(e) => {
                warn!(account = %account, error = %e, "Cannot list account directory, skipping");
                continue;
            }
        };

        match read_records(&latest) {
            Ok(records) => {
                info!(
                    account = %account,
                    file = %latest.display(),
                    records = records.len(),
                    "Loaded metadata"
                );
                batches.push(AccountBatch::new(account, records, latest));
            }
            Err(e) => {
                warn!(
                    account = %account,
                    error = %e,
                    "Cannot read metadata file, skipping account"
                );
            }
        }
    }

    Ok(batches)
}

/// List the immediate subdirectories of `root`, sorted by name so the
/// order is stable.
pub fn account_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(RepackError::MetadataRootMissing(root.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(|e| RepackError::io(root, e))? {
        let entry = entry.map_err(|e| RepackError::io(root, e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    if dirs.is_empty() {
        return Err(RepackError::NoAccounts(root.to_path_buf()));
    }

    dirs.sort();
    Ok(dirs)
}

/// Pick the newest metadata file in an account directory.
///
/// Newest modification time wins; ties are broken by the timestamp in the
/// file name, then by the file name itself.
pub fn find_latest_metadata_file(dir: &Path, options: &LoaderOptions) -> Result<Option<PathBuf>> {
    let mut best: Option<(SystemTime, Option<NaiveDateTime>, String, PathBuf)> = None;

    for entry in std::fs::read_dir(dir).map_err(|e| RepackError::io(dir, e))? {
        let entry = entry.map_err(|e| RepackError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !path.is_file() || !options.matches(&name) {
            continue;
        }

        let mtime = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let candidate = (mtime, options.embedded_timestamp(&name), name, path);
        debug!(file = %candidate.3.display(), "Metadata candidate");

        let newer = match &best {
            None => true,
            Some(current) => {
                (&candidate.0, &candidate.1, &candidate.2) > (&current.0, &current.1, &current.2)
            }
        };
        if newer {
            best = Some(candidate);
        }
    }

    Ok(best.map(|(_, _, _, path)| path))
}

/// Read and parse one metadata file.
pub fn read_records(path: &Path) -> Result<Vec<MetadataRecord>> {
    let bytes = std::fs::read(path).map_err(|e| RepackError::io(path, e))?;
    let text = csv::decode_bytes(&bytes);
    Ok(parse_records(&text, &path.display().to_string()))
}

/// Map CSV text with a header row to records.
///
/// Unknown columns are ignored; missing columns and short rows leave the
/// affected fields empty.
pub fn parse_records(text: &str, source: &str) -> Vec<MetadataRecord> {
    let mut rows = csv::parse_rows(text).into_iter();
    let Some(header) = rows.next() else {
        warn!(source = source, "Metadata file is empty");
        return Vec::new();
    };

    let columns: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    let missing: Vec<&str> = RECORD_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.iter().any(|h| h == c))
        .collect();
    if !missing.is_empty() {
        warn!(source = source, missing = ?missing, "Metadata file lacks columns");
    }

    rows.map(|row| {
        let mut record = MetadataRecord::default();
        for (column, value) in columns.iter().zip(row) {
            record.set_field(column, value);
        }
        record
    })
    .collect()
}
