//! EPUB exporter.
//!
//! Writes an EPUB 2 container: a cover page, an info page and one XHTML
//! file per chapter, with an OPF package document and an NCX table of
//! contents.

use std::io::{self, Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::xml::{XmlBuilder, xhtml_page_end, xhtml_page_start};
use super::{Artifact, Document, ExportFormat, Exporter, chapters, speaker_color};
use crate::error::Result;
use crate::extract::RenderRecord;
use crate::sanitize::{SanitizeMode, sanitize};

const OPF_NS: &str = "http://www.idpf.org/2007/opf";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const NCX_NS: &str = "http://www.daisy.org/z3986/2005/ncx/";
const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const COVER_CSS: &str = "body{text-align:center;margin-top:30%;font-family:sans-serif;}\
h1{font-size:2.5em;margin-bottom:0.5em;}p{font-size:1.5em;color:#555;}";
const INFO_CSS: &str = "body{padding:10%;font-family:sans-serif;line-height:1.8;}\
h2{border-bottom:1px solid #ccc;padding-bottom:10px;}";
const CHAPTER_CSS: &str = "body{font-family:sans-serif;padding:5%;}img{max-width:100%;}\
h2.chapter{text-align:center;margin-bottom:1.5em;color:#555;}\
div.msg{margin-bottom:1.5em;}strong.speaker{display:block;margin-bottom:0.2em;}div.text{line-height:1.6;}";

/// Configuration for EPUB export.
#[derive(Debug, Clone, Default)]
pub struct EpubConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<u32>,
}

/// EPUB format exporter.
///
/// # Example
///
/// ```
/// use chatbind::export::{Document, EpubExporter, Exporter};
/// use chatbind::{ExportConfig, RenderRecord};
///
/// let records = vec![RenderRecord {
///     sequence_index: 0,
///     speaker_name: "Bot".into(),
///     is_user_authored: false,
///     rendered_html: "<p>Once upon a time<br>...</p>".into(),
///     plain_text: "Once upon a time\n...".into(),
/// }];
/// let config = ExportConfig::default();
///
/// let artifact = EpubExporter::new().export(&Document::new(&records, &config))?;
/// assert_eq!(artifact.media_type, "application/epub+zip");
/// # Ok::<(), chatbind::Error>(())
/// ```
pub struct EpubExporter {
    config: EpubConfig,
}

impl EpubExporter {
    /// Create a new exporter with default configuration.
    pub fn new() -> Self {
        Self {
            config: EpubConfig::default(),
        }
    }

    /// Configure the exporter with custom settings.
    pub fn with_config(mut self, config: EpubConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for EpubExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// A chapter page ready to be packaged.
struct ChapterPage {
    id: String,
    file_name: String,
    title: String,
    content: String,
}

impl Exporter for EpubExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Epub
    }

    fn export(&self, document: &Document<'_>) -> Result<Artifact> {
        let identifier = format!("urn:uuid:{}", uuid::Uuid::new_v4());
        let pages = chapter_pages(document)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let compression_level = self.config.compression_level.unwrap_or(6);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(compression_level.min(9))));

        // mimetype must be first and uncompressed
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML)?;

        zip.start_file("OEBPS/cover.xhtml", deflated)?;
        zip.write_all(cover_page(document)?.as_bytes())?;

        zip.start_file("OEBPS/info.xhtml", deflated)?;
        zip.write_all(info_page(document)?.as_bytes())?;

        for page in &pages {
            zip.start_file(format!("OEBPS/{}", page.file_name), deflated)?;
            zip.write_all(page.content.as_bytes())?;
        }

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(package_document(document, &identifier, &pages)?.as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(navigation_document(document, &identifier, &pages)?.as_bytes())?;

        let bytes = zip.finish()?.into_inner();
        Ok(Artifact::new(
            document.file_name(ExportFormat::Epub.extension()),
            ExportFormat::Epub.media_type(),
            bytes,
        ))
    }
}

fn cover_page(document: &Document<'_>) -> io::Result<String> {
    let mut xml = XmlBuilder::new();
    xhtml_page_start(&mut xml, document.locale().cover(), document.locale().language_tag(), COVER_CSS)?;
    xml.element("h1", &[], document.title())?;
    xml.element("p", &[], document.author())?;
    xhtml_page_end(&mut xml)?;
    Ok(xml.into_string())
}

fn info_page(document: &Document<'_>) -> io::Result<String> {
    let locale = document.locale();
    let mut xml = XmlBuilder::new();
    xhtml_page_start(&mut xml, locale.info_page(), locale.language_tag(), INFO_CSS)?;
    xml.element("h2", &[], locale.book_info())?;
    for (label, value) in document.info_fields() {
        xml.start("p", &[])?;
        xml.element("strong", &[], &format!("{label}{}", locale.colon()))?;
        xml.text(&value)?;
        xml.end("p")?;
    }
    xhtml_page_end(&mut xml)?;
    Ok(xml.into_string())
}

fn chapter_pages(document: &Document<'_>) -> io::Result<Vec<ChapterPage>> {
    let locale = document.locale();
    let size = document.config.effective_chapter_size();

    chapters(document.records, size)
        .enumerate()
        .map(|(i, records)| {
            let number = i + 1;
            let title = locale.chapter_title(number);

            let mut xml = XmlBuilder::new();
            xhtml_page_start(&mut xml, &title, locale.language_tag(), CHAPTER_CSS)?;
            // Single-message chapters only get a heading on the first page
            if size > 1 || number == 1 {
                xml.element("h2", &[("class", "chapter")], &title)?;
                xml.empty("hr", &[])?;
            }
            for record in records {
                write_message(&mut xml, document, record)?;
            }
            xhtml_page_end(&mut xml)?;

            Ok(ChapterPage {
                id: format!("ch{number}"),
                file_name: format!("chapter{number}.xhtml"),
                title,
                content: xml.into_string(),
            })
        })
        .collect()
}

fn write_message(xml: &mut XmlBuilder, document: &Document<'_>, record: &RenderRecord) -> io::Result<()> {
    xml.start("div", &[("class", "msg")])?;
    if document.shows_speaker(record) {
        let style = format!("color:{}", speaker_color(record));
        xml.element(
            "strong",
            &[("class", "speaker"), ("style", &style)],
            &format!("{}:", record.speaker_name),
        )?;
    }
    xml.start("div", &[("class", "text")])?;
    xml.raw(&sanitize(&record.rendered_html, SanitizeMode::XhtmlStrict))?;
    xml.end("div")?.end("div")?;
    Ok(())
}

fn package_document(document: &Document<'_>, identifier: &str, pages: &[ChapterPage]) -> io::Result<String> {
    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start(
        "package",
        &[("xmlns", OPF_NS), ("unique-identifier", "BookID"), ("version", "2.0")],
    )?;

    xml.start("metadata", &[("xmlns:dc", DC_NS), ("xmlns:opf", OPF_NS)])?;
    xml.element("dc:title", &[], document.title())?;
    xml.element("dc:creator", &[("opf:role", "aut")], document.author())?;
    xml.element("dc:language", &[], document.locale().language_tag())?;
    xml.element("dc:identifier", &[("id", "BookID")], identifier)?;
    let date = document.front_matter.exported_at.format("%Y-%m-%d").to_string();
    xml.element("dc:date", &[], &date)?;
    xml.element("dc:publisher", &[], super::GENERATOR)?;
    xml.end("metadata")?;

    xml.start("manifest", &[])?;
    xml.empty(
        "item",
        &[("id", "ncx"), ("href", "toc.ncx"), ("media-type", "application/x-dtbncx+xml")],
    )?;
    xml.empty("item", &[("id", "cover"), ("href", "cover.xhtml"), ("media-type", XHTML_MEDIA_TYPE)])?;
    xml.empty("item", &[("id", "info"), ("href", "info.xhtml"), ("media-type", XHTML_MEDIA_TYPE)])?;
    for page in pages {
        xml.empty(
            "item",
            &[("id", &page.id), ("href", &page.file_name), ("media-type", XHTML_MEDIA_TYPE)],
        )?;
    }
    xml.end("manifest")?;

    xml.start("spine", &[("toc", "ncx")])?;
    for id in ["cover", "info"].into_iter().chain(pages.iter().map(|p| p.id.as_str())) {
        xml.empty("itemref", &[("idref", id)])?;
    }
    xml.end("spine")?;

    xml.start("guide", &[])?;
    xml.empty(
        "reference",
        &[("type", "cover"), ("title", document.locale().cover()), ("href", "cover.xhtml")],
    )?;
    xml.end("guide")?;

    xml.end("package")?;
    Ok(xml.into_string())
}

fn navigation_document(document: &Document<'_>, identifier: &str, pages: &[ChapterPage]) -> io::Result<String> {
    let locale = document.locale();
    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start("ncx", &[("xmlns", NCX_NS), ("version", "2005-1")])?;

    xml.start("head", &[])?;
    xml.empty("meta", &[("name", "dtb:uid"), ("content", identifier)])?;
    xml.empty("meta", &[("name", "dtb:depth"), ("content", "1")])?;
    xml.empty("meta", &[("name", "dtb:totalPageCount"), ("content", "0")])?;
    xml.empty("meta", &[("name", "dtb:maxPageNumber"), ("content", "0")])?;
    xml.end("head")?;

    xml.start("docTitle", &[])?.element("text", &[], document.title())?.end("docTitle")?;
    xml.start("docAuthor", &[])?.element("text", &[], document.author())?.end("docAuthor")?;

    xml.start("navMap", &[])?;
    // Front pages share play order 0 so chapter numbers match play order
    nav_point(&mut xml, "nav_cover", "0", locale.cover(), "cover.xhtml")?;
    nav_point(&mut xml, "nav_info", "0", locale.info_page(), "info.xhtml")?;
    for (i, page) in pages.iter().enumerate() {
        let order = (i + 1).to_string();
        nav_point(&mut xml, &format!("nav{order}"), &order, &page.title, &page.file_name)?;
    }
    xml.end("navMap")?;

    xml.end("ncx")?;
    Ok(xml.into_string())
}

fn nav_point(xml: &mut XmlBuilder, id: &str, order: &str, label: &str, src: &str) -> io::Result<()> {
    xml.start("navPoint", &[("id", id), ("playOrder", order)])?;
    xml.start("navLabel", &[])?.element("text", &[], label)?.end("navLabel")?;
    xml.empty("content", &[("src", src)])?;
    xml.end("navPoint")?;
    Ok(())
}
