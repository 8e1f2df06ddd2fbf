//! Message synthesis: one [`MetadataRecord`] becomes one [`SyntheticMessage`].

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::model::address::{is_valid_address, EmailAddress};
use crate::model::message::SyntheticMessage;
use crate::model::record::MetadataRecord;

/// Sender used when the record has no valid address.
pub const PLACEHOLDER_SENDER: &str = "unknown@unknown.invalid";

/// Recipient used when the account name is not an address.
pub const PLACEHOLDER_RECIPIENT: &str = "undisclosed-recipients@unknown.invalid";

/// Subject used when the record's subject is blank.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Header carrying the record's raw `size` value.
pub const HEADER_SIZE: &str = "X-Original-Size";

/// Header carrying the record's raw `attachments_count` value.
pub const HEADER_ATTACHMENTS: &str = "X-Attachments-Count";

/// Build the message for `record`, owned by `account` and read from the
/// file named `source_name`.
///
/// Never fails: bad addresses, blank subjects and unparseable dates are
/// replaced by placeholders or omitted.
pub fn synthesize(account: &str, record: &MetadataRecord, source_name: &str) -> SyntheticMessage {
    let parsed_sender = EmailAddress::parse(&record.sender_email);
    let sender_address = if parsed_sender.is_valid() {
        parsed_sender.address
    } else {
        PLACEHOLDER_SENDER.to_string()
    };
    let from = EmailAddress::new(single_line(record.sender_name.trim()), sender_address);

    let recipient = if is_valid_address(account) {
        account.trim()
    } else {
        PLACEHOLDER_RECIPIENT
    };

    let subject = if record.subject.trim().is_empty() {
        NO_SUBJECT.to_string()
    } else {
        single_line(&record.subject)
    };

    SyntheticMessage {
        from,
        to: EmailAddress::new("", recipient),
        subject,
        date: parse_delivery_time(&record.delivery_time),
        body: render_body(account, record, source_name),
        headers: vec![
            (HEADER_SIZE.to_string(), record.size.clone()),
            (HEADER_ATTACHMENTS.to_string(), record.attachments_count.clone()),
        ],
    }
}

/// Replace CR and LF with spaces so `value` cannot leave its header line.
pub fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Render the message body.
///
/// Downstream tooling parses this text; keep the wording and line order.
pub fn render_body(account: &str, record: &MetadataRecord, source_name: &str) -> String {
    format!(
        "This message was reconstructed from exported metadata.\n\
         \n\
         Record-Id: {}\n\
         Folder: {}\n\
         Account: {}\n\
         Source-File: {}\n",
        record.id, record.folder, account, source_name
    )
}

/// Parse a delivery time string.
///
/// The extractor writes `%Y-%m-%d %H:%M:%S` in UTC; RFC 2822, RFC 3339
/// and a few common variants are accepted too.
pub fn parse_delivery_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let zoned = ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S %z"];
    for fmt in &zoned {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for fmt in &naive {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    mail_parser_date(trimmed)
}

/// Last resort: let `mail-parser` try its lenient RFC 5322 date parser.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn record() -> MetadataRecord {
        MetadataRecord {
            id: "42".into(),
            folder: "Outlook veri dosyasının en üstü/Gelen Kutusu".into(),
            subject: "Toplantı".into(),
            sender_name: "Ayşe Yılmaz".into(),
            sender_email: "ayse@ornek.com.tr".into(),
            delivery_time: "2024-03-15 14:12:10".into(),
            size: "20480".into(),
            attachments_count: "3".into(),
        }
    }

    #[test]
    fn test_synthesize_full_record() {
        let msg = synthesize("bob@example.com", &record(), "emails_20240315_141210.csv");
        assert_eq!(msg.from.address, "ayse@ornek.com.tr");
        assert_eq!(msg.from.display_name, "Ayşe Yılmaz");
        assert_eq!(msg.to.address, "bob@example.com");
        assert_eq!(msg.subject, "Toplantı");
        assert_eq!(msg.date.unwrap().to_rfc3339(), "2024-03-15T14:12:10+00:00");
        assert_eq!(msg.header(HEADER_SIZE), Some("20480"));
        assert_eq!(msg.header(HEADER_ATTACHMENTS), Some("3"));
    }

    #[test]
    fn test_synthesize_placeholders() {
        let mut rec = record();
        rec.sender_email = "/O=EXCHANGELABS/CN=RECIPIENTS/CN=XYZ".into();
        rec.sender_name = "   ".into();
        rec.subject = "  ".into();
        rec.delivery_time = "unknown".into();
        rec.size = String::new();

        let msg = synthesize("backup", &rec, "emails_x.csv");
        assert_eq!(msg.from.address, PLACEHOLDER_SENDER);
        assert_eq!(msg.from.display_name, "");
        assert_eq!(msg.to.address, PLACEHOLDER_RECIPIENT);
        assert_eq!(msg.subject, NO_SUBJECT);
        assert!(msg.date.is_none());
        assert_eq!(msg.header(HEADER_SIZE), Some(""));
    }

    #[test]
    fn test_synthesize_flattens_line_breaks() {
        let mut rec = record();
        rec.subject = "Hello\r\nBcc: victim@example.com".into();
        rec.sender_name = "Ayşe\nReply-To: x@example.com".into();

        let msg = synthesize("bob@example.com", &rec, "emails_x.csv");
        assert_eq!(msg.subject, "Hello  Bcc: victim@example.com");
        assert_eq!(msg.from.display_name, "Ayşe Reply-To: x@example.com");
        assert_eq!(single_line("a\r\n\r\nb"), "a    b");
    }

    #[test]
    fn test_body_contract() {
        let body = render_body("bob@example.com", &record(), "emails_20240315_141210.csv");
        assert_eq!(
            body,
            "This message was reconstructed from exported metadata.\n\
             \n\
             Record-Id: 42\n\
             Folder: Outlook veri dosyasının en üstü/Gelen Kutusu\n\
             Account: bob@example.com\n\
             Source-File: emails_20240315_141210.csv\n"
        );
    }

    #[test]
    fn test_parse_delivery_time_variants() {
        assert!(parse_delivery_time("2024-01-02 03:04:05").is_some());
        assert!(parse_delivery_time("2024-01-02T03:04:05Z").is_some());
        assert!(parse_delivery_time("Tue, 2 Jan 2024 03:04:05 +0300").is_some());
        assert_eq!(parse_delivery_time("15.03.2024 10:00:00").unwrap().month(), 3);
        assert!(parse_delivery_time("").is_none());
        assert!(parse_delivery_time("   ").is_none());
    }
}
