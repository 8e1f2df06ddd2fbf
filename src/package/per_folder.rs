//! Per-folder mode: one container per (account, folder path) group.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{error, info};

use super::{PackageReport, RunContext, UnitReport};
use crate::archive::hierarchy::{ensure_path, FolderCache};
use crate::archive::ArchiveSink;
use crate::error::Result;
use crate::model::record::{AccountBatch, MetadataRecord};
use crate::sanitize::{sanitize_filename, FolderPath};

/// Records sharing an account and a sanitized folder path.
struct FolderGroup<'a> {
    account: &'a str,
    /// First spelling seen for the path.
    path: FolderPath,
    /// `(record, source file name)` in input order.
    records: Vec<(&'a MetadataRecord, String)>,
}

impl FolderGroup<'_> {
    fn name(&self) -> String {
        if self.path.is_root() {
            self.account.to_string()
        } else {
            format!("{}/{}", self.account, self.path)
        }
    }

    fn file_stem(&self) -> String {
        format!("{}__{}", sanitize_filename(self.account), self.path.flattened())
    }
}

/// Group records by account and case-insensitive folder key, sorted by both.
fn group_records(batches: &[AccountBatch]) -> BTreeMap<(String, String), FolderGroup<'_>> {
    let mut groups: BTreeMap<(String, String), FolderGroup<'_>> = BTreeMap::new();

    for batch in batches {
        let source = batch.source_name();
        for record in &batch.records {
            let path = FolderPath::from_original(&record.folder);
            groups
                .entry((batch.account.clone(), path.key()))
                .or_insert_with(|| FolderGroup {
                    account: &batch.account,
                    path,
                    records: Vec::new(),
                })
                .records
                .push((record, source.clone()));
        }
    }

    groups
}

pub(super) fn run(batches: &[AccountBatch], ctx: &RunContext<'_>, report: &mut PackageReport) {
    let groups = group_records(batches);
    info!(groups = groups.len(), "Grouped records by folder");

    for group in groups.values() {
        if ctx.budget.is_exhausted() {
            break;
        }

        let path = ctx.container_path(&group.file_stem());
        let mut written: u64 = 0;

        match package_group(group, &path, ctx, &mut written) {
            Ok(()) => {
                info!(folder = %group.name(), path = %path.display(), written, "Folder packaged");
                report.units.push(UnitReport::ok(group.name(), vec![path], written));
            }
            Err(e) => {
                error!(folder = %group.name(), error = %e, "Folder failed, skipping");
                ctx.budget.release(written);
                report.units.push(UnitReport::failed(group.name(), e));
            }
        }
    }
}

fn package_group(
    group: &FolderGroup<'_>,
    path: &Path,
    ctx: &RunContext<'_>,
    written: &mut u64,
) -> Result<()> {
    let mut sink = ctx.factory.create(path)?;
    let result = fill(sink.as_mut(), group, ctx, written);
    if result.is_err() {
        drop(sink);
        ctx.discard(path);
    }
    result
}

fn fill(
    sink: &mut dyn ArchiveSink,
    group: &FolderGroup<'_>,
    ctx: &RunContext<'_>,
    written: &mut u64,
) -> Result<()> {
    let mut cache = FolderCache::new();
    let root = sink.root();
    let folder = ensure_path(sink, &mut cache, root, group.path.segments())?;

    for (record, source) in &group.records {
        if !ctx.write_record(sink, folder, group.account, record, source)? {
            break;
        }
        *written += 1;
    }
    sink.finish().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, folder: &str) -> MetadataRecord {
        MetadataRecord {
            id: id.into(),
            folder: folder.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_group_records_sorted_and_case_insensitive() {
        let batches = vec![
            AccountBatch::new("zeynep", vec![rec("1", "Inbox")], "z.csv"),
            AccountBatch::new(
                "ali",
                vec![
                    rec("1", "veri/Sent"),
                    rec("2", "Inbox"),
                    rec("3", "INBOX"),
                    rec("4", "Outlook veri dosyasının en üstü/Inbox"),
                ],
                "a.csv",
            ),
        ];
        let groups = group_records(&batches);
        let names: Vec<String> = groups.values().map(FolderGroup::name).collect();
        assert_eq!(names, vec!["ali/Inbox", "ali/Sent", "zeynep/Inbox"]);

        let ali_inbox = groups.values().next().unwrap();
        let ids: Vec<&str> = ali_inbox.records.iter().map(|(r, _)| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "4"]);
        assert_eq!(ali_inbox.file_stem(), "ali__Inbox");
    }

    #[test]
    fn test_root_group_name() {
        let batches = vec![AccountBatch::new("ali@example.com", vec![rec("1", "")], "a.csv")];
        let groups = group_records(&batches);
        let group = groups.values().next().unwrap();
        assert_eq!(group.name(), "ali@example.com");
        assert_eq!(group.file_stem(), "aliexample.com__root");
    }
}
