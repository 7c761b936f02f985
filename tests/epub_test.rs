//! EPUB container tests: archive layout, package document and navigation.

use std::io::{Cursor, Read};

use chatbind::export::{self, ExportFormat};
use chatbind::markdown::CmarkRenderer;
use chatbind::{ExportConfig, Transcript};
use zip::{CompressionMethod, ZipArchive};

fn transcript(count: usize) -> Transcript {
    let mut transcript = Transcript::new();
    for i in 0..count {
        transcript.push(i % 2 == 0, if i % 2 == 0 { "Ada" } else { "Bot" }, format!("Message *{i}*"));
    }
    transcript
}

fn export_epub(transcript: &Transcript, config: &ExportConfig) -> ZipArchive<Cursor<Vec<u8>>> {
    let artifact = export::export(ExportFormat::Epub, transcript, &[], &CmarkRenderer::new(), config).unwrap();
    assert_eq!(artifact.media_type, "application/epub+zip");
    ZipArchive::new(Cursor::new(artifact.bytes)).unwrap()
}

fn read(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut content = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}

fn all_messages() -> ExportConfig {
    ExportConfig {
        include_user: true,
        ..ExportConfig::default()
    }
}

#[test]
fn test_mimetype_first_and_stored() {
    let mut archive = export_epub(&transcript(2), &all_messages());

    let mut first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), CompressionMethod::Stored);
    let mut content = String::new();
    first.read_to_string(&mut content).unwrap();
    assert_eq!(content, "application/epub+zip");
}

#[test]
fn test_container_points_at_package() {
    let mut archive = export_epub(&transcript(2), &all_messages());
    let container = read(&mut archive, "META-INF/container.xml");
    assert!(container.contains(r#"full-path="OEBPS/content.opf""#));
    assert!(archive.by_name("OEBPS/content.opf").is_ok());
}

#[test]
fn test_chapter_grouping() {
    let config = ExportConfig {
        chapter_size: 3,
        ..all_messages()
    };
    let mut archive = export_epub(&transcript(10), &config);

    for n in 1..=4 {
        assert!(archive.by_name(&format!("OEBPS/chapter{n}.xhtml")).is_ok(), "chapter {n}");
    }
    assert!(archive.by_name("OEBPS/chapter5.xhtml").is_err());

    let last = read(&mut archive, "OEBPS/chapter4.xhtml");
    assert_eq!(last.matches("class=\"msg\"").count(), 1);
    assert!(last.contains("<em>9</em>"));
}

#[test]
fn test_package_and_navigation_reference_every_chapter() {
    let config = ExportConfig {
        chapter_size: 3,
        ..all_messages()
    };
    let mut archive = export_epub(&transcript(10), &config);
    let opf = read(&mut archive, "OEBPS/content.opf");
    let ncx = read(&mut archive, "OEBPS/toc.ncx");

    for n in 1..=4 {
        let href = format!("href=\"chapter{n}.xhtml\"");
        assert!(opf.contains(&href), "manifest misses chapter {n}");
        assert!(opf.contains(&format!("idref=\"ch{n}\"")), "spine misses chapter {n}");
        assert!(ncx.contains(&format!("src=\"chapter{n}.xhtml\"")), "ncx misses chapter {n}");
    }
    assert!(opf.contains(r#"<spine toc="ncx">"#));
    assert!(opf.contains("<dc:identifier id=\"BookID\">urn:uuid:"));
    assert!(ncx.contains(r#"<navPoint id="nav_cover" playOrder="0">"#));
}

#[test]
fn test_metadata_is_escaped() {
    let config = ExportConfig {
        title: "Tom <&> Jerry".to_string(),
        author: "A & B".to_string(),
        ..all_messages()
    };
    let artifact = export::export(ExportFormat::Epub, &transcript(1), &[], &CmarkRenderer::new(), &config).unwrap();
    assert_eq!(artifact.file_name, "Tom _&_ Jerry.epub");

    let mut archive = ZipArchive::new(Cursor::new(artifact.bytes)).unwrap();
    let opf = read(&mut archive, "OEBPS/content.opf");
    assert!(opf.contains("<dc:title>Tom &lt;&amp;&gt; Jerry</dc:title>"));
    assert!(opf.contains(">A &amp; B</dc:creator>"));
    assert!(read(&mut archive, "OEBPS/cover.xhtml").contains("Tom &lt;&amp;&gt; Jerry"));
}

#[test]
fn test_unsafe_markup_is_well_formed() {
    let mut transcript = Transcript::new();
    transcript.push(false, "Bot", "<div onclick=\"x()\">open<br>line<img src=\"a.png\"></div><script>alert(1)</script>&nbsp;end");
    let mut archive = export_epub(&transcript, &ExportConfig::default());
    let page = read(&mut archive, "OEBPS/chapter1.xhtml");

    assert!(page.contains("<br />"));
    assert!(page.contains("<img src=\"a.png\" />"));
    assert!(!page.contains("onclick"));
    assert!(!page.contains("<script"));
    assert!(!page.contains("&nbsp;"));
}
