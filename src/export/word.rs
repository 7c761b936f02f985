//! Word exporter.
//!
//! The exporter assembles one HTML body (cover, info page and messages,
//! separated by hard page breaks) and hands it to a [`DocumentConverter`].
//! The bundled [`WordHtmlConverter`] produces the HTML dialect Word opens
//! as a `.doc` file. Converters are loaded lazily through a
//! [`CapabilityCell`], so an expensive converter is set up once and only
//! when a Word export is actually requested.

use std::fmt::Write as _;
use std::sync::Arc;

use quick_xml::escape::escape;

use super::{Artifact, Document, ExportFormat, Exporter, PAGE_BREAK, speaker_color};
use crate::capability::CapabilityCell;
use crate::error::Result;
use crate::sanitize::{SanitizeMode, sanitize};

/// Input to a [`DocumentConverter`].
#[derive(Debug, Clone, Copy)]
pub struct HtmlDocument<'a> {
    pub title: &'a str,
    /// BCP 47 language tag.
    pub language: &'a str,
    /// Body markup. Attributes are limited to what word processors keep.
    pub body: &'a str,
}

/// Turns an HTML document into a word-processor file.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, document: &HtmlDocument<'_>) -> Result<Vec<u8>>;

    fn media_type(&self) -> &str {
        ExportFormat::Word.media_type()
    }

    fn extension(&self) -> &str {
        ExportFormat::Word.extension()
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMargins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl PageMargins {
    pub fn uniform(inches: f32) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }
}

impl Default for PageMargins {
    /// Word's "Normal" margins.
    fn default() -> Self {
        Self {
            top: 1.0,
            right: 1.25,
            bottom: 1.0,
            left: 1.25,
        }
    }
}

/// Writes Word-flavored HTML (`application/msword`).
#[derive(Debug, Clone, Default)]
pub struct WordHtmlConverter {
    margins: PageMargins,
}

impl WordHtmlConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margins(mut self, margins: PageMargins) -> Self {
        self.margins = margins;
        self
    }
}

impl DocumentConverter for WordHtmlConverter {
    fn convert(&self, document: &HtmlDocument<'_>) -> Result<Vec<u8>> {
        let m = self.margins;
        let mut out = String::with_capacity(document.body.len() + 1024);

        let _ = write!(
            out,
            "<html xmlns:o='urn:schemas-microsoft-com:office:office' \
             xmlns:w='urn:schemas-microsoft-com:office:word' \
             xmlns='http://www.w3.org/TR/REC-html40' lang=\"{lang}\">\n\
             <head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <!--[if gte mso 9]><xml><w:WordDocument><w:View>Print</w:View>\
             <w:Zoom>100</w:Zoom></w:WordDocument></xml><![endif]-->\n\
             <style>\n\
             @page Section1 {{ size: 8.5in 11.0in; margin: {}in {}in {}in {}in; }}\n\
             div.Section1 {{ page: Section1; }}\n\
             body {{ font-family: 'Microsoft YaHei', sans-serif; }}\n\
             img {{ max-width: 100%; }}\n\
             </style>\n</head>\n<body>\n<div class=\"Section1\">\n",
            m.top,
            m.right,
            m.bottom,
            m.left,
            lang = escape(document.language),
            title = escape(document.title),
        );
        out.push_str(document.body);
        out.push_str("\n</div>\n</body>\n</html>\n");

        Ok(out.into_bytes())
    }
}

type ConverterLoader = dyn Fn() -> Result<Box<dyn DocumentConverter>> + Send + Sync;

/// Configuration for Word export.
#[derive(Debug, Clone, Default)]
pub struct WordConfig {
    /// Margins for the bundled converter.
    pub margins: PageMargins,
}

/// Word format exporter.
pub struct WordExporter {
    config: WordConfig,
    loader: Option<Arc<ConverterLoader>>,
    converter: CapabilityCell<Box<dyn DocumentConverter>>,
}

impl WordExporter {
    pub fn new() -> Self {
        Self {
            config: WordConfig::default(),
            loader: None,
            converter: CapabilityCell::new("document converter"),
        }
    }

    pub fn with_config(mut self, config: WordConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom converter, created on first use.
    pub fn with_converter<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn DocumentConverter>> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    fn converter(&self) -> Result<Arc<Box<dyn DocumentConverter>>> {
        self.converter.ensure_ready(|| match &self.loader {
            Some(loader) => loader(),
            None => Ok(Box::new(WordHtmlConverter::new().with_margins(self.config.margins))),
        })
    }
}

impl Default for WordExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for WordExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Word
    }

    fn export(&self, document: &Document<'_>) -> Result<Artifact> {
        // Fail before assembling anything if no converter is available
        let converter = self.converter()?;
        let body = word_body(document);

        let bytes = converter.convert(&HtmlDocument {
            title: document.title(),
            language: document.locale().language_tag(),
            body: &body,
        })?;

        Ok(Artifact::new(
            document.file_name(converter.extension()),
            converter.media_type(),
            bytes,
        ))
    }
}

fn word_body(document: &Document<'_>) -> String {
    let locale = document.locale();
    let mut body = String::new();

    let _ = write!(
        body,
        "<div style=\"text-align:center;margin-top:200px;\"><h1 style=\"font-size:36pt;\">{}</h1>\
         <p style=\"font-size:18pt;color:#555;\">{}</p></div>\n{PAGE_BREAK}\n",
        escape(document.title()),
        escape(document.author()),
    );

    let _ = write!(body, "<div style=\"margin:50px;\"><h2>{}</h2>", escape(locale.book_info()));
    for (label, value) in document.info_fields() {
        let _ = write!(body, "<p><b>{}{}</b>{}</p>", escape(label), locale.colon(), escape(&value));
    }
    let _ = write!(body, "</div>\n{PAGE_BREAK}\n");

    for record in document.records {
        body.push_str("<div style=\"margin-bottom:15px;\">");
        if document.shows_speaker(record) {
            let _ = write!(
                body,
                "<p style=\"margin-bottom:5px;font-weight:bold;color:{}\">{}:</p>",
                speaker_color(record),
                escape(&record.speaker_name)
            );
        }
        let _ = write!(
            body,
            "<div>{}</div></div>\n<br>\n",
            sanitize(&record.rendered_html, SanitizeMode::RichTextPortable)
        );
    }

    body
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;
    use crate::export::test_support::{fixed_time, record};
    use crate::extract::ExportConfig;

    struct Failing;

    impl DocumentConverter for Failing {
        fn convert(&self, _document: &HtmlDocument<'_>) -> Result<Vec<u8>> {
            Err(Error::Conversion("renderer crashed".to_string()))
        }
    }

    fn records() -> Vec<crate::extract::RenderRecord> {
        vec![
            record(0, true, "Ada", r#"<p class="x" style="color:red" id="m">hi</p>"#, "hi"),
            record(1, false, "Bot", "<p>hello</p>", "hello"),
        ]
    }

    #[test]
    fn test_word_document() {
        let records = records();
        let config = ExportConfig::default();
        let document = Document::with_exported_at(&records, &config, fixed_time());

        let artifact = WordExporter::new().export(&document).unwrap();
        assert_eq!(artifact.file_name, "Chat2Ebook.doc");
        assert_eq!(artifact.media_type, "application/msword");

        let doc = String::from_utf8(artifact.bytes).unwrap();
        assert!(doc.contains("xmlns:w='urn:schemas-microsoft-com:office:word'"));
        assert!(doc.contains("margin: 1in 1.25in 1in 1.25in;"));
        assert!(doc.contains("<div><p>hi</p></div>"));
        assert_eq!(doc.matches("page-break-before:always").count(), 2);
        assert!(doc.contains(">Ada:</p>"));
        assert!(!doc.contains("Bot:"));
    }

    #[test]
    fn test_custom_margins() {
        let records = records();
        let config = ExportConfig::default();
        let document = Document::with_exported_at(&records, &config, fixed_time());

        let exporter = WordExporter::new().with_config(WordConfig {
            margins: PageMargins::uniform(0.5),
        });
        let doc = String::from_utf8(exporter.export(&document).unwrap().bytes).unwrap();
        assert!(doc.contains("margin: 0.5in 0.5in 0.5in 0.5in;"));
    }

    #[test]
    fn test_converter_failure_yields_no_artifact() {
        let records = records();
        let config = ExportConfig::default();
        let document = Document::with_exported_at(&records, &config, fixed_time());

        let exporter = WordExporter::new().with_converter(|| Ok(Box::new(Failing)));
        assert!(matches!(exporter.export(&document), Err(Error::Conversion(_))));
    }

    #[test]
    fn test_unavailable_converter() {
        let records = records();
        let config = ExportConfig::default();
        let document = Document::with_exported_at(&records, &config, fixed_time());

        let exporter = WordExporter::new().with_converter(|| Err(Error::Conversion("not installed".to_string())));
        assert!(matches!(
            exporter.export(&document),
            Err(Error::CapabilityUnavailable { capability: "document converter", .. })
        ));
    }

    #[test]
    fn test_converter_loaded_once() {
        static LOADS: AtomicUsize = AtomicUsize::new(0);

        let records = records();
        let config = ExportConfig::default();
        let document = Document::with_exported_at(&records, &config, fixed_time());

        let exporter = WordExporter::new().with_converter(|| {
            LOADS.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(WordHtmlConverter::new()))
        });
        exporter.export(&document).unwrap();
        exporter.export(&document).unwrap();
        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
    }
}
