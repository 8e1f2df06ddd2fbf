//! Run summary written next to the archives.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{RepackError, Result};
use crate::package::PackageReport;

/// Summary document for one run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub generated_at: String,
    pub metadata_dir: &'a Path,
    pub output_dir: &'a Path,
    pub accounts: usize,
    pub records: u64,
    pub dry_run: bool,
    #[serde(flatten)]
    pub report: &'a PackageReport,
}

/// Write `repack_summary_{YYYYMMDD_HHMMSS}.json` into `output_dir`.
pub fn write_summary(
    output_dir: &Path,
    summary: &RunSummary<'_>,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| RepackError::io(output_dir, e))?;
    let path = output_dir.join(format!("repack_summary_{}.json", now.format("%Y%m%d_%H%M%S")));
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| RepackError::Archive(format!("cannot encode run summary: {e}")))?;
    std::fs::write(&path, json).map_err(|e| RepackError::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::memory::MemorySinkFactory;
    use crate::model::record::{AccountBatch, MetadataRecord};
    use crate::package::{package, PackagingMode, RunContext};
    use chrono::TimeZone;

    #[test]
    fn test_write_summary() {
        let batches = vec![AccountBatch::new(
            "ali",
            vec![MetadataRecord {
                id: "1".into(),
                folder: "Inbox".into(),
                ..Default::default()
            }],
            "emails_x.csv",
        )];
        let factory = MemorySinkFactory::new();
        let ctx = RunContext::new(&factory, "/out", None);
        let report = package(PackagingMode::PerAccount, &batches, &ctx).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let summary = RunSummary {
            generated_at: "2024-03-15T14:12:10+00:00".into(),
            metadata_dir: Path::new("/meta"),
            output_dir: dir.path(),
            accounts: 1,
            records: 1,
            dry_run: true,
            report: &report,
        };
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 12, 10).unwrap();
        let path = write_summary(dir.path(), &summary, now).unwrap();
        assert!(path.ends_with("repack_summary_20240315_141210.json"));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "per-account");
        assert_eq!(value["total_written"], 1);
        assert_eq!(value["units"][0]["name"], "ali");
    }
}
