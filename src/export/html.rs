//! Standalone HTML exporter: cover, info block and the whole conversation
//! on one page.

use std::fmt::Write as _;

use quick_xml::escape::escape;

use super::{Artifact, Document, ExportFormat, Exporter, speaker_color};
use crate::error::Result;
use crate::sanitize::{SanitizeMode, sanitize};

const PAGE_CSS: &str = "body{font-family:'Segoe UI',sans-serif;padding:20px;}\
.cover{height:90vh;display:flex;flex-direction:column;justify-content:center;align-items:center;text-align:center;page-break-after:always;}\
.cover h1{font-size:3em;margin-bottom:20px;}.cover p{font-size:1.5em;color:#555;}\
.info{padding:40px;margin:40px auto;max-width:600px;border:1px solid #eee;border-radius:8px;page-break-after:always;}\
.info h2{border-bottom:1px solid #ddd;padding-bottom:10px;}\
.chat{max-width:800px;margin:0 auto;}\
.msg{padding:15px;margin-bottom:15px;border-radius:5px;}\
.msg.user{background:#f0f0f0;border:1px solid #ddd;}.msg.agent{background:#fff;border:1px solid transparent;}\
.msg .text{margin-top:5px;line-height:1.6;}img{max-width:100%;}";

/// Configuration for HTML export.
#[derive(Debug, Clone, Default)]
pub struct HtmlConfig {
    /// Extra CSS appended after the built-in stylesheet.
    pub extra_css: Option<String>,
}

/// Single-page HTML exporter.
pub struct HtmlExporter {
    config: HtmlConfig,
}

impl HtmlExporter {
    pub fn new() -> Self {
        Self {
            config: HtmlConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HtmlConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for HtmlExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for HtmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn export(&self, document: &Document<'_>) -> Result<Artifact> {
        let locale = document.locale();
        let title = escape(document.title());
        let mut page = String::new();

        // Writing to a String cannot fail
        let _ = write!(
            page,
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{title}</title>\n<style>{PAGE_CSS}{}</style>\n</head>\n<body>\n",
            locale.language_tag(),
            self.config.extra_css.as_deref().unwrap_or(""),
        );

        let _ = write!(
            page,
            "<div class=\"cover\"><h1>{title}</h1><p>{}</p></div>\n",
            escape(document.author())
        );

        let _ = write!(page, "<div class=\"info\"><h2>{}</h2>", escape(locale.book_info()));
        for (label, value) in document.info_fields() {
            let _ = write!(
                page,
                "<p><strong>{}{}</strong>{}</p>",
                escape(label),
                locale.colon(),
                escape(&value)
            );
        }
        page.push_str("</div>\n<div class=\"chat\">\n");

        for record in document.records {
            let class = if record.is_user_authored { "user" } else { "agent" };
            let _ = write!(page, "<div class=\"msg {class}\">");
            if document.shows_speaker(record) {
                let _ = write!(
                    page,
                    "<b style=\"color:{}\">{}:</b>",
                    speaker_color(record),
                    escape(&record.speaker_name)
                );
            }
            let _ = write!(
                page,
                "<div class=\"text\">{}</div></div>\n",
                sanitize(&record.rendered_html, SanitizeMode::Markup)
            );
        }

        page.push_str("</div>\n</body>\n</html>\n");

        Ok(Artifact::new(
            document.file_name(ExportFormat::Html.extension()),
            ExportFormat::Html.media_type(),
            page.into_bytes(),
        ))
    }
}
