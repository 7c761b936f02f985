//! Serializers for [`Dom`] subtrees.
//!
//! [`Syntax::Html`] writes ordinary HTML5. [`Syntax::Xml`] writes markup
//! that an XML parser accepts: void elements self-close, every attribute
//! has a quoted value, and names XML cannot represent are dropped.

use super::arena::{Attribute, Dom, NodeData, NodeId};

/// Output syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Html,
    Xml,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
    // obsolete but still void to the parser
    "basefont", "bgsound", "frame", "keygen", "param",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext"];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "compact", "controls", "default", "defer",
    "disabled", "formnovalidate", "hidden", "inert", "ismap", "itemscope", "loop", "multiple", "muted",
    "noshade", "novalidate", "nowrap", "open", "playsinline", "readonly", "required", "reversed", "selected",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Serialize the children of `node` (not `node` itself).
pub fn serialize_children(dom: &Dom, node: NodeId, syntax: Syntax) -> String {
    let mut out = String::new();
    let raw = syntax == Syntax::Html && dom.tag_name(node).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t.as_ref()));
    for child in dom.children(node) {
        write_node(dom, child, syntax, raw, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, syntax: Syntax, raw_parent: bool, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Text(text) if raw_parent => out.push_str(text),
        NodeData::Text(text) => escape_text(text, syntax, out),
        NodeData::Comment(text) => {
            if syntax == Syntax::Html {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
        NodeData::Doctype | NodeData::Document => {}
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();

            if syntax == Syntax::Xml && !is_xml_name(tag) {
                // Unrepresentable element: keep its content
                out.push_str(&serialize_children(dom, id, syntax));
                return;
            }

            out.push('<');
            out.push_str(tag);
            for attr in attrs {
                write_attr(attr, syntax, out);
            }

            if is_void(tag) {
                out.push_str(if syntax == Syntax::Xml { " />" } else { ">" });
                return;
            }

            out.push('>');
            out.push_str(&serialize_children(dom, id, syntax));
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn write_attr(attr: &Attribute, syntax: Syntax, out: &mut String) {
    let local = attr.name.local.as_ref();
    let qualified = match &attr.name.prefix {
        Some(prefix) => format!("{}:{local}", prefix.as_ref()),
        None => local.to_string(),
    };

    if syntax == Syntax::Xml {
        // Namespace declarations would rebind the XHTML namespace, and
        // other prefixes are undeclared in the output document
        let prefixed = qualified.contains(':') && !qualified.starts_with("xml:");
        if !is_xml_name(&qualified) || qualified == "xmlns" || prefixed {
            return;
        }
    }

    out.push(' ');
    out.push_str(&qualified);
    out.push_str("=\"");

    let value = if syntax == Syntax::Xml && attr.value.is_empty() && BOOLEAN_ATTRIBUTES.contains(&local) {
        local
    } else {
        attr.value.as_str()
    };
    escape_attr(value, syntax, out);
    out.push('"');
}

fn escape_text(text: &str, syntax: Syntax, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' if syntax == Syntax::Html => out.push_str("&nbsp;"),
            c if syntax == Syntax::Xml && !is_xml_char(c) => {}
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, syntax: Syntax, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' if syntax == Syntax::Html => out.push_str("&nbsp;"),
            '<' if syntax == Syntax::Xml => out.push_str("&lt;"),
            '>' if syntax == Syntax::Xml => out.push_str("&gt;"),
            c if syntax == Syntax::Xml && !is_xml_char(c) => {}
            c => out.push(c),
        }
    }
}

/// XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Conservative XML `Name` check: ASCII names plus any non-ASCII letter.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_ascii_alphabetic() || first == '_' || first == ':' || (!first.is_ascii() && first.is_alphabetic());
    start_ok
        && chars.all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.') || (!c.is_ascii() && c.is_alphanumeric())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Fragment;

    fn html(input: &str) -> String {
        Fragment::parse(input).to_html()
    }

    fn xml(input: &str) -> String {
        Fragment::parse(input).to_xhtml()
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(html("a<br>b<hr>"), "a<br>b<hr>");
        assert_eq!(xml("a<br>b<hr>"), "a<br />b<hr />");
        assert_eq!(xml(r#"<img src="x.png" alt="">"#), r#"<img src="x.png" alt="" />"#);
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(html("1 &lt; 2 &amp;&amp; 3 &gt; 2"), "1 &lt; 2 &amp;&amp; 3 &gt; 2");
        assert_eq!(xml("a&nbsp;b"), "a\u{a0}b");
        assert_eq!(html("a&nbsp;b"), "a&nbsp;b");
    }

    #[test]
    fn test_attribute_quoting() {
        assert_eq!(xml("<p title='say \"hi\" <now>'>x</p>"), r#"<p title="say &quot;hi&quot; &lt;now&gt;">x</p>"#);
        assert_eq!(xml("<p class=plain>x</p>"), r#"<p class="plain">x</p>"#);
    }

    #[test]
    fn test_boolean_attributes_expand_in_xml() {
        assert_eq!(xml("<details open><summary>s</summary></details>"), r#"<details open="open"><summary>s</summary></details>"#);
        assert_eq!(html("<details open></details>"), r#"<details open=""></details>"#);
    }

    #[test]
    fn test_unrepresentable_names_dropped_in_xml() {
        assert_eq!(xml(r#"<p "odd"="1" ok="2">x</p>"#), r#"<p ok="2">x</p>"#);
        assert_eq!(xml(r#"<div xmlns="urn:other">x</div>"#), "<div>x</div>");
    }

    #[test]
    fn test_unclosed_markup_is_closed() {
        assert_eq!(xml("<p><b>bold"), "<p><b>bold</b></p>");
        assert_eq!(xml("<ul><li>one<li>two</ul>"), "<ul><li>one</li><li>two</li></ul>");
    }
}
