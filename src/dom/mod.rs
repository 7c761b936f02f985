//! HTML parsing and serialization for message fragments.
//!
//! Fragments are parsed with html5ever into an arena [`Dom`] and written
//! back out as HTML or as well-formed XHTML.

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, Children, Dom, Node, NodeData, NodeId};
pub use serialize::{Syntax, is_void, serialize_children};
pub use tree_sink::{ArenaSink, NodeHandle};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

/// A parsed HTML fragment.
///
/// The fragment is wrapped in a full document before parsing, so
/// `<title>`, `<meta>` and friends stay inside `<body>` where they can be
/// found and removed.
pub struct Fragment {
    dom: Dom,
    root: NodeId,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
        let dom = parse_document(ArenaSink::new(), ParseOpts::default())
            .from_utf8()
            .one(wrapped.as_bytes())
            .into_dom();
        let root = dom.find_by_tag("body").unwrap_or(dom.document());
        Self { dom, root }
    }

    /// The node whose children are the fragment's content.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn to_html(&self) -> String {
        serialize_children(&self.dom, self.root, Syntax::Html)
    }

    pub fn to_xhtml(&self) -> String {
        serialize_children(&self.dom, self.root, Syntax::Xml)
    }
}
