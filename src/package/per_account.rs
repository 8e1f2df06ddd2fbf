//! Per-account mode: one container per account holding its folder tree.

use std::path::PathBuf;

use tracing::{error, info};

use super::{PackageReport, RunContext, UnitReport};
use crate::archive::hierarchy::{ensure_path, FolderCache};
use crate::archive::ArchiveSink;
use crate::error::Result;
use crate::model::record::AccountBatch;
use crate::sanitize::{sanitize_filename, FolderPath};

/// Container path and sink, opened on the first record of an account.
type OpenContainer = Option<(PathBuf, Box<dyn ArchiveSink>)>;

pub(super) fn run(batches: &[AccountBatch], ctx: &RunContext<'_>, report: &mut PackageReport) {
    for batch in batches {
        if ctx.budget.is_exhausted() {
            break;
        }

        let mut written: u64 = 0;

        match package_account(batch, ctx, &mut written) {
            Ok(Some(path)) => {
                info!(
                    account = %batch.account,
                    path = %path.display(),
                    written,
                    "Account packaged"
                );
                report
                    .units
                    .push(UnitReport::ok(batch.account.clone(), vec![path], written));
            }
            Ok(None) => {
                info!(account = %batch.account, "No records written, no container created");
                report
                    .units
                    .push(UnitReport::ok(batch.account.clone(), Vec::new(), 0));
            }
            Err(e) => {
                error!(account = %batch.account, error = %e, "Account failed, skipping");
                ctx.budget.release(written);
                report
                    .units
                    .push(UnitReport::failed(batch.account.clone(), e));
            }
        }
    }
}

/// Fill one account container, creating it when the first record is
/// written. Returns `None` if nothing was written. On error the partial
/// container is removed and `written` holds the slots to hand back.
fn package_account(
    batch: &AccountBatch,
    ctx: &RunContext<'_>,
    written: &mut u64,
) -> Result<Option<PathBuf>> {
    let mut open: OpenContainer = None;
    let result = fill(&mut open, batch, ctx, written);

    let Some((path, mut sink)) = open else {
        return result.map(|()| None);
    };
    let result = result.and_then(|()| sink.finish().map(|_| ()));
    drop(sink);

    match result {
        Ok(()) if *written > 0 => Ok(Some(path)),
        Ok(()) => {
            ctx.discard(&path);
            Ok(None)
        }
        Err(e) => {
            ctx.discard(&path);
            Err(e)
        }
    }
}

fn fill(
    open: &mut OpenContainer,
    batch: &AccountBatch,
    ctx: &RunContext<'_>,
    written: &mut u64,
) -> Result<()> {
    let mut cache = FolderCache::new();
    let source = batch.source_name();

    for record in &batch.records {
        if ctx.budget.is_exhausted() {
            break;
        }
        if open.is_none() {
            let path = ctx.container_path(&sanitize_filename(&batch.account));
            let sink = ctx.factory.create(&path)?;
            *open = Some((path, sink));
        }
        let Some((_, sink)) = open.as_mut() else {
            break;
        };
        let sink: &mut dyn ArchiveSink = &mut **sink;

        let root = sink.root();
        let folder_path = FolderPath::from_original(&record.folder);
        let folder = ensure_path(sink, &mut cache, root, folder_path.segments())?;
        if !ctx.write_record(sink, folder, &batch.account, record, &source)? {
            break;
        }
        *written += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::memory::MemorySinkFactory;
    use crate::model::record::MetadataRecord;
    use crate::package::{package, PackagingMode};

    #[test]
    fn test_empty_account_creates_no_container() {
        let batches = vec![
            AccountBatch::new("empty", Vec::new(), "emails_x.csv"),
            AccountBatch::new(
                "ali",
                vec![MetadataRecord {
                    id: "1".into(),
                    folder: "Inbox".into(),
                    ..Default::default()
                }],
                "emails_y.csv",
            ),
        ];
        let factory = MemorySinkFactory::new();
        let ctx = RunContext::new(&factory, "/out", None);
        let report = package(PackagingMode::PerAccount, &batches, &ctx).unwrap();

        assert_eq!(factory.paths(), vec![PathBuf::from("/out/ali.mbox")]);
        assert_eq!(report.total_written, 1);
        assert_eq!(report.units[0].name, "empty");
        assert!(report.units[0].paths.is_empty());
        assert!(report.units[0].error.is_none());
    }
}
