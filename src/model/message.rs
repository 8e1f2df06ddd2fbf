//! Messages synthesized from metadata records.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;

/// An archive-native message built from one [`MetadataRecord`](super::record::MetadataRecord).
///
/// Never stored: it is built on demand and written into exactly one folder
/// of exactly one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticMessage {
    /// Sender; the display name is empty when the record had none.
    pub from: EmailAddress,
    /// Single recipient (the account, or a placeholder).
    pub to: EmailAddress,
    pub subject: String,
    /// Delivery time; `None` lets the container pick its own default.
    pub date: Option<DateTime<Utc>>,
    /// Plain-text body.
    pub body: String,
    /// Extra headers, in emission order.
    pub headers: Vec<(String, String)>,
}

impl SyntheticMessage {
    /// Look up a custom header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
