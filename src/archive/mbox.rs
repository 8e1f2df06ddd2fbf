//! MBOX container sink.
//!
//! Each container is one mboxrd file. MBOX has no native folders, so the
//! folder tree is kept in memory and every message carries its full folder
//! path in an `X-Folder` header.
//!
//! ```text
//! From ayse@ornek.com.tr Fri Mar 15 14:12:10 2024
//! From: "Ayşe Yılmaz" <ayse@ornek.com.tr>
//! To: <bob@example.com>
//! Subject: Toplantı
//! X-Folder: bob@example.com/Gelen Kutusu
//! X-Original-Size: 20480
//! ...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use mail_builder::headers::date::Date;
use mail_builder::headers::text::Text;
use mail_builder::MessageBuilder;
use tracing::debug;

use super::{check_handle, ArchiveSink, ContainerStats, FolderHandle, SinkFactory};
use crate::error::{RepackError, Result};
use crate::model::message::SyntheticMessage;
use crate::synth::single_line;

/// Header carrying the folder path of each message.
pub const FOLDER_HEADER: &str = "X-Folder";

/// Creates `.mbox` containers on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct MboxSinkFactory;

impl SinkFactory for MboxSinkFactory {
    fn extension(&self) -> &str {
        "mbox"
    }

    fn prepare(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir).map_err(|e| RepackError::io(output_dir, e))?;

        // Fail early on read-only or full destinations
        let probe = output_dir.join(".mailrepack-probe");
        std::fs::write(&probe, b"probe").map_err(|e| RepackError::io(&probe, e))?;
        std::fs::remove_file(&probe).map_err(|e| RepackError::io(&probe, e))?;
        Ok(())
    }

    fn create(&self, path: &Path) -> Result<Box<dyn ArchiveSink>> {
        Ok(Box::new(MboxSink::create(path)?))
    }
}

/// One open `.mbox` file.
#[derive(Debug)]
pub struct MboxSink {
    path: PathBuf,
    writer: BufWriter<File>,
    /// `(parent index, name)`; index 0 is the root.
    folders: Vec<(usize, String)>,
    messages: usize,
    bytes: u64,
}

impl MboxSink {
    /// Create a new container. Never overwrites an existing file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| RepackError::io(path, e))?;
        debug!(path = %path.display(), "Created MBOX container");

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            folders: vec![(0, String::new())],
            messages: 0,
            bytes: 0,
        })
    }

    /// Slash-joined path of folder `index` (empty for the root).
    fn folder_path(&self, index: usize) -> String {
        let mut parts = Vec::new();
        let mut current = index;
        while current != 0 {
            let (parent, name) = &self.folders[current];
            parts.push(name.as_str());
            current = *parent;
        }
        parts.reverse();
        parts.join("/")
    }
}

impl ArchiveSink for MboxSink {
    fn add_subfolder(&mut self, parent: FolderHandle, name: &str) -> Result<FolderHandle> {
        check_handle(parent, self.folders.len())?;
        self.folders.push((parent.0, name.to_string()));
        Ok(FolderHandle(self.folders.len() - 1))
    }

    fn add_message(&mut self, folder: FolderHandle, message: &SyntheticMessage) -> Result<()> {
        check_handle(folder, self.folders.len())?;
        let folder_path = self.folder_path(folder.0);
        let entry = render_entry(message, &folder_path)?;

        self.writer
            .write_all(entry.as_bytes())
            .map_err(|e| RepackError::io(&self.path, e))?;
        self.bytes += entry.len() as u64;
        self.messages += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<ContainerStats> {
        self.writer
            .flush()
            .map_err(|e| RepackError::io(&self.path, e))?;
        Ok(ContainerStats {
            folders: self.folders.len() - 1,
            messages: self.messages,
            bytes: self.bytes,
        })
    }
}

/// Render one mboxrd entry: separator line, RFC 5322 message, blank line.
pub fn render_entry(message: &SyntheticMessage, folder_path: &str) -> Result<String> {
    let raw = render_message(message, folder_path)?;
    let text = String::from_utf8_lossy(&raw).replace("\r\n", "\n");

    let date = message.date.unwrap_or_else(Utc::now);
    let mut entry = format!(
        "From {} {}\n",
        message.from.address,
        date.format("%a %b %e %H:%M:%S %Y")
    );
    for line in text.lines() {
        if is_from_line(line) {
            entry.push('>');
        }
        entry.push_str(line);
        entry.push('\n');
    }
    entry.push('\n');
    Ok(entry)
}

/// Render the RFC 5322 form of a message.
fn render_message(message: &SyntheticMessage, folder_path: &str) -> Result<Vec<u8>> {
    let mut builder = MessageBuilder::new();
    builder = if message.from.display_name.is_empty() {
        builder.from(message.from.address.as_str())
    } else {
        builder.from((
            single_line(&message.from.display_name),
            message.from.address.clone(),
        ))
    };
    builder = builder
        .to(message.to.address.as_str())
        .subject(single_line(&message.subject));
    if let Some(date) = message.date {
        builder = builder.date(Date::new(date.timestamp()));
    }
    if !folder_path.is_empty() {
        builder = builder.header(FOLDER_HEADER, Text::new(single_line(folder_path)));
    }
    for (name, value) in &message.headers {
        builder = builder.header(name.as_str(), Text::new(single_line(value)));
    }

    builder
        .text_body(message.body.as_str())
        .write_to_vec()
        .map_err(|e| RepackError::Archive(format!("cannot render message: {e}")))
}

/// `true` for lines that mboxrd must quote (`From `, `>From `, `>>From `, …).
fn is_from_line(line: &str) -> bool {
    line.trim_start_matches('>').starts_with("From ")
}
