//! Small wrapper over `quick_xml::Writer` for building EPUB parts.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

pub(crate) const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

pub(crate) const XHTML11_DOCTYPE: &str =
    r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#;

fn io_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::other(e)
}

/// XML document builder. Text and attribute values are escaped; only
/// [`raw`](Self::raw) writes markup verbatim.
pub(crate) struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    /// Write `<?xml version="1.0" encoding="utf-8"?>` and a newline.
    pub fn declaration(&mut self) -> io::Result<&mut Self> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(io_error)?;
        self.raw("\n")
    }

    /// Append pre-serialized markup.
    pub fn raw(&mut self, markup: &str) -> io::Result<&mut Self> {
        self.writer.get_mut().write_all(markup.as_bytes())?;
        Ok(self)
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> io::Result<&mut Self> {
        let mut start = BytesStart::new(name);
        for &attr in attrs {
            start.push_attribute(attr);
        }
        self.writer.write_event(Event::Start(start)).map_err(io_error)?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> io::Result<&mut Self> {
        self.writer.write_event(Event::End(BytesEnd::new(name))).map_err(io_error)?;
        Ok(self)
    }

    /// A self-closing element.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> io::Result<&mut Self> {
        let mut start = BytesStart::new(name);
        for &attr in attrs {
            start.push_attribute(attr);
        }
        self.writer.write_event(Event::Empty(start)).map_err(io_error)?;
        Ok(self)
    }

    pub fn text(&mut self, text: &str) -> io::Result<&mut Self> {
        self.writer.write_event(Event::Text(BytesText::new(text))).map_err(io_error)?;
        Ok(self)
    }

    /// `<name attrs>text</name>`.
    pub fn element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> io::Result<&mut Self> {
        self.start(name, attrs)?.text(text)?.end(name)
    }

    pub fn into_string(self) -> String {
        // Only &str input is ever written
        String::from_utf8(self.writer.into_inner()).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }
}

/// Open an XHTML page: declaration, doctype, `<html>`, `<head>` and `<body>`.
pub(crate) fn xhtml_page_start(xml: &mut XmlBuilder, title: &str, language: &str, css: &str) -> io::Result<()> {
    xml.declaration()?.raw(XHTML11_DOCTYPE)?.raw("\n")?;
    xml.start("html", &[("xmlns", XHTML_NS), ("xml:lang", language)])?;
    xml.start("head", &[])?;
    xml.empty("meta", &[("http-equiv", "Content-Type"), ("content", "application/xhtml+xml; charset=utf-8")])?;
    xml.element("title", &[], title)?;
    xml.element("style", &[("type", "text/css")], css)?;
    xml.end("head")?.start("body", &[])?;
    Ok(())
}

/// Close the page opened by [`xhtml_page_start`].
pub(crate) fn xhtml_page_end(xml: &mut XmlBuilder) -> io::Result<()> {
    xml.end("body")?.end("html")?;
    Ok(())
}
