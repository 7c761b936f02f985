//! Plain text exporter.

use std::fmt::Write as _;

use super::{Artifact, Document, ExportFormat, Exporter};
use crate::error::Result;

const BANNER: &str = "==============================";
const RULE: &str = "--------------------";
const INDENT: &str = "      ";

/// UTF-8 text exporter.
///
/// Layout:
///
/// ```text
///
/// ==============================
///       Title
///       By Author
/// ==============================
///
/// [Book Info]
/// Title: ...
/// ...
///
/// ==============================
/// [Begin]
///
/// Speaker:
/// message text
///
/// --------------------
///
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextExporter;

impl TextExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for TextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn export(&self, document: &Document<'_>) -> Result<Artifact> {
        let locale = document.locale();
        let mut text = String::new();

        let _ = write!(
            text,
            "\n{BANNER}\n{INDENT}{}\n{INDENT}By {}\n{BANNER}\n\n{}\n",
            document.title(),
            document.author(),
            locale.bracketed(locale.book_info()),
        );
        for (label, value) in document.info_fields() {
            let _ = writeln!(text, "{label}{}{value}", locale.colon());
        }
        let _ = write!(text, "\n{BANNER}\n{}\n\n", locale.bracketed(locale.body_start()));

        for record in document.records {
            if document.shows_speaker(record) {
                let _ = writeln!(text, "{}:", record.speaker_name);
            }
            let _ = write!(text, "{}\n\n{RULE}\n\n", record.plain_text);
        }

        Ok(Artifact::new(
            document.file_name(ExportFormat::Text.extension()),
            ExportFormat::Text.media_type(),
            text.into_bytes(),
        ))
    }
}
