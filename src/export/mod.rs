//! Document assembly.
//!
//! Each output format has an exporter implementing [`Exporter`]:
//! - `new()` creates an exporter with default configuration
//! - `with_config()` allows customization
//! - `export()` turns a [`Document`] into an in-memory [`Artifact`]
//!
//! [`export`] runs the whole pipeline: extraction, assembly, and the
//! empty-selection check between them.
//!
//! # Example
//!
//! ```
//! use chatbind::export::{self, ExportFormat};
//! use chatbind::markdown::CmarkRenderer;
//! use chatbind::{ExportConfig, Transcript};
//!
//! let mut transcript = Transcript::new();
//! transcript.push(true, "Ada", "Hello!").push(false, "Bot", "Hi **Ada**.");
//!
//! let config = ExportConfig { include_user: true, ..ExportConfig::default() };
//! let artifact = export::export(ExportFormat::Text, &transcript, &[], &CmarkRenderer::new(), &config)?;
//!
//! assert_eq!(artifact.file_name, "Chat2Ebook.txt");
//! assert!(String::from_utf8(artifact.bytes).unwrap().contains("Hi Ada."));
//! # Ok::<(), chatbind::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::extract::{ExportConfig, Extractor, RenderRecord};
use crate::markdown::MarkdownRenderer;
use crate::rules::RuleSource;
use crate::transcript::TranscriptSource;
use crate::util::char_len;

mod epub;
mod html;
mod labels;
mod text;
mod word;
mod xml;

pub use epub::{EpubConfig, EpubExporter};
pub use html::{HtmlConfig, HtmlExporter};
pub use labels::Locale;
pub use text::TextExporter;
pub use word::{DocumentConverter, HtmlDocument, PageMargins, WordConfig, WordExporter, WordHtmlConverter};

/// Name written to the "generator" field of the front matter.
pub const GENERATOR: &str = concat!("chatbind ", env!("CARGO_PKG_VERSION"));

/// Colors of the speaker label.
pub(crate) const USER_COLOR: &str = "#2c3e50";
pub(crate) const AGENT_COLOR: &str = "#800000";

/// Page break understood by word processors importing HTML.
pub(crate) const PAGE_BREAK: &str =
    "<br clear=\"all\" style=\"mso-special-character:line-break;page-break-before:always\">";

/// A supported output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Epub,
    Html,
    Word,
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Epub => "epub",
            ExportFormat::Html => "html",
            ExportFormat::Word => "doc",
            ExportFormat::Text => "txt",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ExportFormat::Epub => "application/epub+zip",
            ExportFormat::Html => "text/html",
            ExportFormat::Word => "application/msword",
            ExportFormat::Text => "text/plain",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epub" => Ok(ExportFormat::Epub),
            "html" | "htm" => Ok(ExportFormat::Html),
            "doc" | "word" => Ok(ExportFormat::Word),
            "txt" | "text" => Ok(ExportFormat::Text),
            other => Err(format!("unknown format '{other}' (expected epub, html, doc or txt)")),
        }
    }
}

/// One finished output file, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Totals shown on the info page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub chapter_count: usize,
    pub message_count: usize,
    /// Sum of the records' plain-text lengths in characters.
    pub total_chars: usize,
    pub exported_at: NaiveDateTime,
}

impl FrontMatter {
    pub fn compute(records: &[RenderRecord], config: &ExportConfig, exported_at: NaiveDateTime) -> Self {
        Self {
            chapter_count: records.len().div_ceil(config.effective_chapter_size()),
            message_count: records.len(),
            total_chars: records.iter().map(|r| char_len(&r.plain_text)).sum(),
            exported_at,
        }
    }

    pub fn exported_at_display(&self) -> String {
        self.exported_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Split records into chapters of `size` (0 is treated as 1). The last
/// chapter may be shorter.
pub fn chapters(records: &[RenderRecord], size: usize) -> std::slice::Chunks<'_, RenderRecord> {
    records.chunks(size.max(1))
}

/// Everything an exporter needs.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub records: &'a [RenderRecord],
    pub config: &'a ExportConfig,
    pub front_matter: FrontMatter,
}

impl<'a> Document<'a> {
    /// A document stamped with the current local time.
    pub fn new(records: &'a [RenderRecord], config: &'a ExportConfig) -> Self {
        Self::with_exported_at(records, config, chrono::Local::now().naive_local())
    }

    pub fn with_exported_at(records: &'a [RenderRecord], config: &'a ExportConfig, exported_at: NaiveDateTime) -> Self {
        Self {
            records,
            config,
            front_matter: FrontMatter::compute(records, config, exported_at),
        }
    }

    pub fn title(&self) -> &str {
        self.config.display_title()
    }

    pub fn author(&self) -> &str {
        self.config.display_author()
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    /// Output file name for the given extension.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", crate::util::file_stem(self.title()))
    }

    /// Whether a record's speaker label is printed.
    pub fn shows_speaker(&self, record: &RenderRecord) -> bool {
        record.is_user_authored || !self.config.hide_agent_name
    }

    /// The info page as `(label, value)` pairs, in display order.
    pub fn info_fields(&self) -> Vec<(&'static str, String)> {
        let locale = self.locale();
        let fm = &self.front_matter;
        vec![
            (locale.title(), self.title().to_string()),
            (locale.author(), self.author().to_string()),
            (locale.chapters(), locale.chapter_summary(fm.chapter_count, fm.message_count)),
            (locale.length(), locale.length_summary(fm.total_chars)),
            (locale.exported(), fm.exported_at_display()),
            (locale.generator(), GENERATOR.to_string()),
        ]
    }
}

/// Color of a record's speaker label.
pub(crate) fn speaker_color(record: &RenderRecord) -> &'static str {
    if record.is_user_authored { USER_COLOR } else { AGENT_COLOR }
}

/// Trait for assembling documents in a specific format.
pub trait Exporter {
    fn format(&self) -> ExportFormat;

    /// Build the complete artifact. Nothing is returned on failure.
    fn export(&self, document: &Document<'_>) -> Result<Artifact>;
}

/// The default exporter for a format.
pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Epub => Box::new(EpubExporter::new()),
        ExportFormat::Html => Box::new(HtmlExporter::new()),
        ExportFormat::Word => Box::new(WordExporter::new()),
        ExportFormat::Text => Box::new(TextExporter::new()),
    }
}

/// Extract and assemble one export with the default exporter for `format`.
///
/// Returns [`Error::EmptySelection`] when the configured range and role
/// filter select no messages.
pub fn export(
    format: ExportFormat,
    transcript: &dyn TranscriptSource,
    sources: &[&dyn RuleSource],
    renderer: &dyn MarkdownRenderer,
    config: &ExportConfig,
) -> Result<Artifact> {
    export_with(exporter_for(format).as_ref(), transcript, sources, renderer, config)
}

/// [`export`] with a caller-supplied exporter.
pub fn export_with(
    exporter: &dyn Exporter,
    transcript: &dyn TranscriptSource,
    sources: &[&dyn RuleSource],
    renderer: &dyn MarkdownRenderer,
    config: &ExportConfig,
) -> Result<Artifact> {
    let extraction = Extractor::new(renderer).extract(transcript, sources, config);
    if extraction.records.is_empty() {
        return Err(Error::EmptySelection);
    }

    let document = Document::new(&extraction.records, config);
    let artifact = exporter.export(&document)?;

    tracing::info!(
        format = %exporter.format(),
        file = %artifact.file_name,
        messages = document.front_matter.message_count,
        chapters = document.front_matter.chapter_count,
        bytes = artifact.bytes.len(),
        skipped_rules = extraction.diagnostics.len(),
        "export complete"
    );
    Ok(artifact)
}
