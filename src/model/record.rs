//! Metadata records as produced by the PST extractor.

use std::path::{Path, PathBuf};

/// Column names recognized in a metadata file header row.
pub const RECORD_COLUMNS: [&str; 8] = [
    "id",
    "folder",
    "subject",
    "sender_name",
    "sender_email",
    "delivery_time",
    "size",
    "attachments_count",
];

/// One row of a per-account metadata file.
///
/// Every field is kept as the raw string found in the file. Missing or
/// malformed cells are empty strings, never errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetadataRecord {
    /// Identifier, unique only within one account's source file.
    pub id: String,
    /// Slash-delimited original folder path.
    pub folder: String,
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    /// Delivery timestamp as written by the extractor (may be empty).
    pub delivery_time: String,
    /// Message size, preserved verbatim.
    pub size: String,
    /// Attachment count, preserved verbatim.
    pub attachments_count: String,
}

impl MetadataRecord {
    /// Set a field by its column name. Unknown columns are ignored.
    pub fn set_field(&mut self, column: &str, value: String) {
        match column {
            "id" => self.id = value,
            "folder" => self.folder = value,
            "subject" => self.subject = value,
            "sender_name" => self.sender_name = value,
            "sender_email" => self.sender_email = value,
            "delivery_time" => self.delivery_time = value,
            "size" => self.size = value,
            "attachments_count" => self.attachments_count = value,
            _ => {}
        }
    }
}

/// All records of one account, read from a single source file.
///
/// Built once by the loader and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AccountBatch {
    /// Account name (the metadata subdirectory name).
    pub account: String,
    /// Records in file order.
    pub records: Vec<MetadataRecord>,
    /// The metadata file the records were read from.
    pub source: PathBuf,
}

impl AccountBatch {
    pub fn new(
        account: impl Into<String>,
        records: Vec<MetadataRecord>,
        source: impl AsRef<Path>,
    ) -> Self {
        Self {
            account: account.into(),
            records,
            source: source.as_ref().to_path_buf(),
        }
    }

    /// File name of the source, used in message bodies.
    pub fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.to_string_lossy().to_string())
    }
}
