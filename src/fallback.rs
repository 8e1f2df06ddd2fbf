//! Fallback report written when no archive could be produced at all.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{RepackError, Result};
use crate::package::PackagingMode;

/// File name of the fallback report inside the output directory.
pub const FALLBACK_FILE: &str = "export_fallback.json";

/// Machine-readable description of a catastrophic packaging failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackReport {
    /// Always `"fallback"`.
    pub status: String,
    pub message: String,
    /// The error that aborted packaging.
    pub error: String,
    pub mode: PackagingMode,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    /// Suggested remediation steps.
    pub options: Vec<String>,
}

impl FallbackReport {
    pub fn new(mode: PackagingMode, error: &dyn std::fmt::Display) -> Self {
        Self {
            status: "fallback".to_string(),
            message: "Archive output could not be created; \
                      no mailbox archive was produced for this run."
                .to_string(),
            error: error.to_string(),
            mode,
            generated_at: Utc::now().to_rfc3339(),
            options: [
                "Check that the output directory exists, is writable and has free space.",
                "Re-run with a smaller --limit to produce a partial archive.",
                "Re-run with --per-message or --per-folder to produce smaller containers.",
                "Re-run with --dry-run to validate the metadata without writing archives.",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Write the fallback report to `output_dir` and return its path.
pub fn write_report(output_dir: &Path, report: &FallbackReport) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| RepackError::io(output_dir, e))?;
    let path = output_dir.join(FALLBACK_FILE);
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| RepackError::Archive(format!("cannot encode fallback report: {e}")))?;
    std::fs::write(&path, json).map_err(|e| RepackError::io(&path, e))?;
    tracing::warn!(path = %path.display(), error = %report.error, "Wrote fallback report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let err = RepackError::Archive("out of handles".into());
        let report = FallbackReport::new(PackagingMode::Single, &err);
        let path = write_report(dir.path(), &report).unwrap();

        assert_eq!(path, dir.path().join(FALLBACK_FILE));
        let parsed: FallbackReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.status, "fallback");
        assert_eq!(parsed.mode, PackagingMode::Single);
        assert!(parsed.error.contains("out of handles"));
        assert!(!parsed.options.is_empty());
    }
}
