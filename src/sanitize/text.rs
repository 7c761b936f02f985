//! Visible-text extraction in the manner of `HTMLElement.innerText`.

use crate::dom::{Dom, NodeData, NodeId};

/// Elements laid out as blocks: one line break before and after.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "center", "dd", "details", "dialog", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "menu", "nav", "ol", "pre", "section", "summary", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

/// Elements whose whitespace is preserved.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea", "listing", "plaintext"];

#[derive(Debug)]
enum Piece {
    /// Text with whitespace already collapsed to single spaces.
    Collapsible(String),
    /// Text copied verbatim.
    Preserved(String),
    /// A `<br>`.
    LineBreak,
    /// A required line break count.
    Break(usize),
}

/// Visible text below `root`.
///
/// Whitespace runs collapse to one space and are trimmed at line edges,
/// `<br>` becomes a newline, blocks are separated by a newline, paragraphs
/// by a blank line, adjacent table cells by a tab, and `<pre>` content is
/// kept as written. The result is trimmed.
pub fn inner_text(dom: &Dom, root: NodeId) -> String {
    let mut pieces = Vec::new();
    for child in dom.children(root) {
        collect(dom, child, false, &mut pieces);
    }
    assemble(&pieces)
}

fn collect(dom: &Dom, id: NodeId, preformatted: bool, pieces: &mut Vec<Piece>) {
    let Some(node) = dom.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Text(text) if preformatted => pieces.push(Piece::Preserved(text.clone())),
        NodeData::Text(text) => pieces.push(Piece::Collapsible(collapse_whitespace(text))),
        NodeData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            if attrs.iter().any(|a| a.name.local.as_ref() == "hidden") {
                return;
            }
            if tag == "br" {
                pieces.push(Piece::LineBreak);
                return;
            }

            let breaks = match tag {
                "p" => 2,
                t if BLOCK_ELEMENTS.contains(&t) => 1,
                _ => 0,
            };
            if breaks > 0 {
                pieces.push(Piece::Break(breaks));
            }

            let inner_pre = preformatted || PREFORMATTED_ELEMENTS.contains(&tag);
            for child in dom.children(id) {
                collect(dom, child, inner_pre, pieces);
            }

            if matches!(tag, "td" | "th") && next_cell(dom, id) {
                pieces.push(Piece::Preserved("\t".to_string()));
            }
            if breaks > 0 {
                pieces.push(Piece::Break(breaks));
            }
        }
        _ => {}
    }
}

/// Whether a table cell is followed by another cell in its row.
fn next_cell(dom: &Dom, cell: NodeId) -> bool {
    let mut next = dom.get(cell).map_or(NodeId::NONE, |n| n.next_sibling);
    while next.is_some() {
        if dom.tag_name(next).is_some_and(|t| matches!(t.as_ref(), "td" | "th")) {
            return true;
        }
        next = dom.get(next).map_or(NodeId::NONE, |n| n.next_sibling);
    }
    false
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{c}') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn assemble(pieces: &[Piece]) -> String {
    let mut out = String::new();
    let mut pending = 0usize;

    for piece in pieces {
        match piece {
            Piece::Break(n) => pending = pending.max(*n),
            Piece::LineBreak => {
                flush_breaks(&mut out, &mut pending);
                trim_trailing_spaces(&mut out);
                out.push('\n');
            }
            Piece::Preserved(text) => {
                if text.is_empty() {
                    continue;
                }
                flush_breaks(&mut out, &mut pending);
                out.push_str(text);
            }
            Piece::Collapsible(text) => {
                let at_line_start = out.is_empty() || out.ends_with('\n') || pending > 0;
                let mut text = text.as_str();
                if at_line_start || out.ends_with(' ') {
                    text = text.trim_start_matches(' ');
                }
                if text.is_empty() {
                    continue;
                }
                flush_breaks(&mut out, &mut pending);
                out.push_str(text);
            }
        }
    }

    out.trim().to_string()
}

fn flush_breaks(out: &mut String, pending: &mut usize) {
    if *pending > 0 && !out.is_empty() {
        trim_trailing_spaces(out);
        let have = out.chars().rev().take_while(|&c| c == '\n').count();
        for _ in have..*pending {
            out.push('\n');
        }
    }
    *pending = 0;
}

fn trim_trailing_spaces(out: &mut String) {
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
}
