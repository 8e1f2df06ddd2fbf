//! Single mode: one container for the whole run, one top-level folder per account.

use tracing::{info, warn};

use super::{PackageReport, RunContext, UnitReport};
use crate::archive::hierarchy::{ensure_path, FolderCache};
use crate::error::Result;
use crate::model::record::AccountBatch;
use crate::sanitize::{sanitize_display, FolderPath};

/// File stem of the run-wide container.
pub const SINGLE_STEM: &str = "all_accounts";

/// Only failing to create or close the container is an error; a record that
/// cannot be written is logged and skipped.
pub(super) fn run(
    batches: &[AccountBatch],
    ctx: &RunContext<'_>,
    report: &mut PackageReport,
) -> Result<()> {
    let path = ctx.container_path(SINGLE_STEM);
    let mut sink = ctx.factory.create(&path)?;
    let mut cache = FolderCache::new();
    let root = sink.root();

    let mut ordered: Vec<&AccountBatch> = batches.iter().collect();
    ordered.sort_by(|a, b| a.account.cmp(&b.account));

    for batch in ordered {
        if ctx.budget.is_exhausted() {
            break;
        }

        let account_folder = sanitize_display(&batch.account);
        let source = batch.source_name();
        let mut written: u64 = 0;

        for record in &batch.records {
            let folder_path = FolderPath::from_original(&record.folder);
            let mut segments = Vec::with_capacity(folder_path.segments().len() + 1);
            segments.push(account_folder.as_str());
            segments.extend(folder_path.segments().iter().map(String::as_str));

            let outcome = ensure_path(sink.as_mut(), &mut cache, root, &segments)
                .and_then(|folder| {
                    ctx.write_record(sink.as_mut(), folder, &batch.account, record, &source)
                });
            match outcome {
                Ok(true) => written += 1,
                Ok(false) => break,
                Err(e) => {
                    warn!(account = %batch.account, id = %record.id, error = %e, "Skipping record");
                    report.failed_records += 1;
                }
            }
        }

        info!(account = %batch.account, written, "Account packaged");
        report
            .units
            .push(UnitReport::ok(batch.account.clone(), vec![path.clone()], written));
    }

    let stats = sink.finish()?;
    info!(
        path = %path.display(),
        folders = stats.folders,
        messages = stats.messages,
        "Container closed"
    );
    Ok(())
}
