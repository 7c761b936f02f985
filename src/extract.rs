//! Transcript extraction: range and role selection, rule rewriting and
//! rendering of each selected message.

use std::path::Path;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::export::Locale;
use crate::markdown::MarkdownRenderer;
use crate::rules::{RuleDiagnostic, RuleSource, Rewriter, aggregate};
use crate::sanitize::{SanitizeMode, sanitize};
use crate::transcript::TranscriptSource;
use crate::util::decode_text;

/// Title used when the configured one is blank.
pub const DEFAULT_TITLE: &str = "Chat2Ebook";

/// Author used when the configured one is blank.
pub const DEFAULT_AUTHOR: &str = "SillyTavern";

/// Key the host stores this exporter's settings under.
const SETTINGS_KEY: &str = "chat2ebook";

/// Export settings.
///
/// Field names follow Rust conventions; the host's camelCase names
/// (`exportStart`, `exportEnd`, `exportUser`, `exportAI`, `hideAIName`,
/// `chapterSplit`) are accepted when deserializing, and numbers may be
/// given as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub title: String,
    pub author: String,
    /// First message index to export.
    #[serde(alias = "exportStart", deserialize_with = "lenient_i64")]
    pub range_start: i64,
    /// Last message index to export, inclusive.
    #[serde(alias = "exportEnd", deserialize_with = "lenient_i64")]
    pub range_end: i64,
    #[serde(alias = "exportUser")]
    pub include_user: bool,
    #[serde(alias = "exportAI")]
    pub include_agent: bool,
    #[serde(alias = "hideAIName")]
    pub hide_agent_name: bool,
    /// Messages per EPUB chapter; 0 is treated as 1.
    #[serde(alias = "chapterSplit", deserialize_with = "lenient_usize")]
    pub chapter_size: usize,
    pub locale: Locale,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            author: String::new(),
            range_start: 0,
            range_end: 99_999,
            include_user: false,
            include_agent: true,
            hide_agent_name: true,
            chapter_size: 1,
            locale: Locale::default(),
        }
    }
}

impl ExportConfig {
    /// Parse settings JSON.
    ///
    /// Accepts the settings object itself or a host settings document with
    /// the object under `extension_settings.chat2ebook`.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut document: Value = serde_json::from_str(text)?;
        if let Some(nested) = document
            .get_mut("extension_settings")
            .and_then(|settings| settings.get_mut(SETTINGS_KEY))
        {
            document = nested.take();
        }
        Ok(serde_json::from_value(document)?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&decode_text(&bytes, None))
    }

    /// Chapter size with 0 mapped to 1.
    pub fn effective_chapter_size(&self) -> usize {
        self.chapter_size.max(1)
    }

    pub fn display_title(&self) -> &str {
        non_blank(&self.title).unwrap_or(DEFAULT_TITLE)
    }

    pub fn display_author(&self) -> &str {
        non_blank(&self.author).unwrap_or(DEFAULT_AUTHOR)
    }

    /// Fill a blank author with `name`, usually the transcript's user name.
    pub fn with_default_author(mut self, name: Option<&str>) -> Self {
        if non_blank(&self.author).is_none() {
            if let Some(name) = name.and_then(non_blank) {
                self.author = name.to_string();
            }
        }
        self
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom(format!("{n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("'{s}' is not an integer"))),
        other => Err(de::Error::custom(format!("expected a number, found {other}"))),
    }
}

fn lenient_usize<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_i64(deserializer).map(|n| usize::try_from(n).unwrap_or(0))
}

/// One message, fully processed for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRecord {
    pub sequence_index: usize,
    pub speaker_name: String,
    pub is_user_authored: bool,
    /// Rendered HTML fragment, before any per-format sanitization.
    pub rendered_html: String,
    /// Visible text of `rendered_html`.
    pub plain_text: String,
}

/// Result of one extraction run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<RenderRecord>,
    /// Rules that were skipped because they failed to compile.
    pub diagnostics: Vec<RuleDiagnostic>,
}

/// Selects messages and turns them into [`RenderRecord`]s.
pub struct Extractor<'a> {
    renderer: &'a dyn MarkdownRenderer,
}

impl<'a> Extractor<'a> {
    pub fn new(renderer: &'a dyn MarkdownRenderer) -> Self {
        Self { renderer }
    }

    /// Extract the configured range.
    ///
    /// Records come out in ascending index order. Each message's depth is
    /// its distance from the last message of the whole transcript, not of
    /// the selected range. An empty transcript or range yields no records.
    pub fn extract(
        &self,
        transcript: &dyn TranscriptSource,
        sources: &[&dyn RuleSource],
        config: &ExportConfig,
    ) -> Extraction {
        let messages = transcript.messages();
        if messages.is_empty() {
            return Extraction::default();
        }

        let materialized = transcript.materialized_count();
        if materialized < messages.len() {
            tracing::debug!(
                recorded = messages.len(),
                materialized,
                "host has not materialized every message; exporting from the record"
            );
        }

        let last = messages.len() - 1;
        let start = usize::try_from(config.range_start.max(0)).unwrap_or(usize::MAX);
        let Ok(requested_end) = usize::try_from(config.range_end) else {
            tracing::debug!(end = config.range_end, "negative range end selects nothing");
            return Extraction::default();
        };
        if requested_end > last {
            tracing::debug!(requested = requested_end, clamped = last, "range end clamped");
        }
        let end = requested_end.min(last);
        if start > end {
            tracing::debug!(start, end, "empty export range");
            return Extraction::default();
        }

        let rules = aggregate(sources);
        let rewriter = Rewriter::new(&rules);

        let mut records = Vec::new();
        for (index, message) in messages.iter().enumerate().take(end + 1).skip(start) {
            let selected = if message.is_user_authored {
                config.include_user
            } else {
                config.include_agent
            };
            if !selected {
                continue;
            }

            let depth = last - index;
            let text = rewriter.render(&message.raw_text, message.is_user_authored, depth);
            let rendered_html = self.renderer.render(&text);
            let plain_text = sanitize(&rendered_html, SanitizeMode::PlainText);

            let speaker_name = match non_blank(&message.author_name) {
                Some(name) => name.to_string(),
                None if message.is_user_authored => "You".to_string(),
                None => "AI".to_string(),
            };

            records.push(RenderRecord {
                sequence_index: index,
                speaker_name,
                is_user_authored: message.is_user_authored,
                rendered_html,
                plain_text,
            });
        }

        tracing::debug!(start, end, records = records.len(), rules = rewriter.len(), "extraction complete");

        Extraction {
            records,
            diagnostics: rewriter.diagnostics().to_vec(),
        }
    }
}
