//! Per-message mode: one container per record, each holding a single `Inbox`.
//!
//! The only mode that deduplicates: a record whose (account, id) was already
//! seen in this run is skipped, first occurrence wins.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::{PackageReport, RunContext, UnitReport};
use crate::archive::ArchiveSink;
use crate::error::Result;
use crate::model::record::{AccountBatch, MetadataRecord};
use crate::sanitize::sanitize_filename;

/// Name of the only folder in a per-message container.
pub const INBOX: &str = "Inbox";

/// File stem of a per-message container before collision suffixes.
pub fn message_stem(account: &str, id: &str) -> String {
    format!("{}__{}", sanitize_filename(account), sanitize_filename(id))
}

pub(super) fn run(batches: &[AccountBatch], ctx: &RunContext<'_>, report: &mut PackageReport) {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for batch in batches {
        if ctx.budget.is_exhausted() {
            break;
        }

        let source = batch.source_name();
        let mut written: u64 = 0;
        let mut paths = Vec::new();

        for record in &batch.records {
            if ctx.budget.is_exhausted() {
                break;
            }

            if !seen.insert((batch.account.as_str(), record.id.as_str())) {
                debug!(account = %batch.account, id = %record.id, "Skipping duplicate record");
                report.duplicates_skipped += 1;
                continue;
            }

            match package_message(batch, record, &source, ctx) {
                Ok(Some(path)) => {
                    written += 1;
                    paths.push(path);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        account = %batch.account,
                        id = %record.id,
                        error = %e,
                        "Message failed, skipping"
                    );
                    report.failed_records += 1;
                }
            }
        }

        info!(account = %batch.account, written, "Account packaged");
        report
            .units
            .push(UnitReport::ok(batch.account.clone(), paths, written));
    }
}

/// Write one record into its own container and return its path; `None`
/// once the limit is reached. A container that ends up without its
/// message is removed again.
fn package_message(
    batch: &AccountBatch,
    record: &MetadataRecord,
    source: &str,
    ctx: &RunContext<'_>,
) -> Result<Option<PathBuf>> {
    let path = ctx.container_path(&message_stem(&batch.account, &record.id));
    let mut sink = ctx.factory.create(&path)?;

    let result = fill(sink.as_mut(), batch, record, source, ctx);
    drop(sink);
    match result {
        Ok(true) => {
            debug!(path = %path.display(), "Message packaged");
            Ok(Some(path))
        }
        Ok(false) => {
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
    sink: &mut dyn ArchiveSink,
    batch: &AccountBatch,
    record: &MetadataRecord,
    source: &str,
    ctx: &RunContext<'_>,
) -> Result<bool> {
    let root = sink.root();
    let inbox = sink.add_subfolder(root, INBOX)?;
    if !ctx.write_record(sink, inbox, &batch.account, record, source)? {
        return Ok(false);
    }
    if let Err(e) = sink.finish() {
        ctx.budget.release(1);
        return Err(e);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_stem() {
        assert_eq!(message_stem("alice@example.com", "00AB12"), "aliceexample.com__00AB12");
        assert_eq!(message_stem("", "***"), "unnamed__unnamed");
    }
}
