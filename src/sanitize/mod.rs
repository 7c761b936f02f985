//! Per-format cleanup of rendered message HTML.
//!
//! Every mode first drops elements that carry no readable content
//! (scripts, styles, embedded objects, ...), comments, event-handler
//! attributes and script URLs. The mode then decides what comes out:
//!
//! - [`SanitizeMode::PlainText`]: the visible text, laid out the way a
//!   browser's `innerText` would.
//! - [`SanitizeMode::Markup`]: the remaining HTML, attributes intact.
//! - [`SanitizeMode::RichTextPortable`]: HTML without `style`, `class` or
//!   `id`, for targets that ignore or mangle them.
//! - [`SanitizeMode::XhtmlStrict`]: well-formed XHTML for EPUB pages.

mod text;

pub use text::inner_text;

use crate::dom::{Dom, Fragment, NodeData, NodeId};

/// What [`sanitize`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanitizeMode {
    PlainText,
    Markup,
    RichTextPortable,
    XhtmlStrict,
}

/// Elements removed together with their content.
const NON_CONTENT_ELEMENTS: &[&str] = &[
    "style", "script", "link", "meta", "title", "object", "embed", "iframe", "svg", "canvas", "noscript",
    "template", "base", "applet",
];

/// Attributes that hold a URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href"];

const SCRIPT_URL_SCHEMES: &[&str] = &["javascript:", "vbscript:"];

/// Attributes removed in [`SanitizeMode::RichTextPortable`].
const PRESENTATION_ATTRIBUTES: &[&str] = &["style", "class", "id"];

/// Clean `html` for the given output mode.
///
/// Never fails: malformed markup is repaired by the HTML parser and empty
/// input gives an empty string.
///
/// ```
/// use chatbind::sanitize::{SanitizeMode, sanitize};
///
/// let html = r#"<p onclick="x()">Hi<script>evil()</script></p><style>p{}</style>"#;
/// assert_eq!(sanitize(html, SanitizeMode::Markup), "<p>Hi</p>");
/// assert_eq!(sanitize(html, SanitizeMode::PlainText), "Hi");
/// ```
pub fn sanitize(html: &str, mode: SanitizeMode) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let mut fragment = Fragment::parse(html);
    let root = fragment.root();
    remove_non_content(fragment.dom_mut(), root);

    match mode {
        SanitizeMode::PlainText => inner_text(fragment.dom(), root),
        SanitizeMode::Markup => fragment.to_html(),
        SanitizeMode::RichTextPortable => {
            strip_attributes(fragment.dom_mut(), root, PRESENTATION_ATTRIBUTES);
            fragment.to_html()
        }
        SanitizeMode::XhtmlStrict => fragment.to_xhtml(),
    }
}

fn remove_non_content(dom: &mut Dom, root: NodeId) {
    for id in dom.descendants(root) {
        let remove = match dom.get(id).map(|n| &n.data) {
            Some(NodeData::Element { name, .. }) => NON_CONTENT_ELEMENTS.contains(&name.local.as_ref()),
            Some(NodeData::Comment(_) | NodeData::Doctype) => true,
            _ => false,
        };

        if remove {
            dom.detach(id);
        } else if dom.is_element(id) {
            dom.retain_attrs(id, |attr| {
                let name = attr.name.local.as_ref();
                if name.len() > 2 && name[..2].eq_ignore_ascii_case("on") {
                    return false;
                }
                !(URL_ATTRIBUTES.contains(&name) && is_script_url(&attr.value))
            });
        }
    }
}

fn strip_attributes(dom: &mut Dom, root: NodeId, names: &[&str]) {
    for id in dom.descendants(root) {
        dom.retain_attrs(id, |attr| !names.contains(&attr.name.local.as_ref()));
    }
}

fn is_script_url(value: &str) -> bool {
    // Browsers ignore embedded whitespace and control characters in schemes
    let scheme: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(12)
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_URL_SCHEMES.iter().any(|s| scheme.starts_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_non_content_elements() {
        let html = concat!(
            "<p>keep</p>",
            "<script>alert(1)</script><style>p{}</style><link rel=x><meta charset=utf-8>",
            "<title>t</title><object>o</object><embed src=x><iframe src=x></iframe>",
            "<svg><circle/></svg><canvas>c</canvas><noscript>n</noscript>",
            "<template>tp</template><base href=x><applet>ap</applet>",
            "<!-- comment -->",
        );
        assert_eq!(sanitize(html, SanitizeMode::Markup), "<p>keep</p>");
    }

    #[test]
    fn test_removes_event_handlers_and_script_urls() {
        let html = r#"<a href="java&#10;script:alert(1)" onmouseover="x()" title="t">a</a><a href="https://example.com" ONCLICK="y()">b</a>"#;
        assert_eq!(
            sanitize(html, SanitizeMode::Markup),
            r#"<a title="t">a</a><a href="https://example.com">b</a>"#
        );
    }

    #[test]
    fn test_markup_keeps_attributes() {
        let html = r#"<span class="speech" style="color:red" id="m1">hi</span>"#;
        assert_eq!(sanitize(html, SanitizeMode::Markup), html);
    }

    #[test]
    fn test_portable_strips_presentation() {
        let html = r#"<p class="a" style="b" id="c" title="d">hi</p>"#;
        assert_eq!(sanitize(html, SanitizeMode::RichTextPortable), r#"<p title="d">hi</p>"#);
    }

    #[test]
    fn test_xhtml_strict() {
        let html = "<p>line<br>next<img src=a.png></p>";
        assert_eq!(sanitize(html, SanitizeMode::XhtmlStrict), r#"<p>line<br />next<img src="a.png" /></p>"#);
    }

    #[test]
    fn test_xhtml_closes_unbalanced_markup() {
        assert_eq!(sanitize("<div><p>open", SanitizeMode::XhtmlStrict), "<div><p>open</p></div>");
        assert_eq!(sanitize("stray</b> close", SanitizeMode::XhtmlStrict), "stray close");
    }

    #[test]
    fn test_empty_input() {
        for mode in [
            SanitizeMode::PlainText,
            SanitizeMode::Markup,
            SanitizeMode::RichTextPortable,
            SanitizeMode::XhtmlStrict,
        ] {
            assert_eq!(sanitize("", mode), "");
            assert_eq!(sanitize("  \n", mode), "");
        }
    }

    #[test]
    fn test_only_non_content_gives_empty() {
        assert_eq!(sanitize("<style>x</style>", SanitizeMode::XhtmlStrict), "");
        assert_eq!(sanitize("<script>x</script>", SanitizeMode::PlainText), "");
    }
}
