//! Message markup rendering.
//!
//! Rewritten message text is Markdown. The pipeline only depends on the
//! [`MarkdownRenderer`] trait; [`CmarkRenderer`] is the bundled
//! implementation on top of `pulldown-cmark`.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

/// Converts message text to an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// Options for [`CmarkRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Render single newlines as `<br />` instead of a space.
    pub line_breaks: bool,
    pub strikethrough: bool,
    pub tables: bool,
    /// Replace `:shortcode:` emoji outside code.
    pub emoji_shortcodes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            line_breaks: true,
            strikethrough: true,
            tables: true,
            emoji_shortcodes: true,
        }
    }
}

/// `pulldown-cmark` backed renderer.
///
/// # Example
///
/// ```
/// use chatbind::markdown::{CmarkRenderer, MarkdownRenderer};
///
/// let html = CmarkRenderer::new().render("Hello **world** :wave:");
/// assert_eq!(html, "<p>Hello <strong>world</strong> 👋</p>\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CmarkRenderer {
    options: MarkdownOptions,
}

impl CmarkRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.options.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.options.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        options
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let opts = self.options;
        let mut in_code_block = false;

        let events = Parser::new_ext(text, self.parser_options()).map(|event| match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                Event::Start(Tag::CodeBlock(kind))
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                Event::End(TagEnd::CodeBlock)
            }
            Event::SoftBreak if opts.line_breaks => Event::HardBreak,
            Event::Text(chunk) if opts.emoji_shortcodes && !in_code_block && chunk.contains(':') => {
                Event::Text(CowStr::from(replace_shortcodes(&chunk)))
            }
            other => other,
        });

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}

/// Replace `:name:` shortcodes with their emoji; unknown codes are kept.
pub fn replace_shortcodes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(':') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let code_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
            .unwrap_or(after.len());

        if code_len > 0
            && after[code_len..].starts_with(':')
            && let Some(emoji) = emojis::get_by_shortcode(&after[..code_len])
        {
            result.push_str(emoji.as_str());
            rest = &after[code_len + 1..];
        } else {
            result.push(':');
            rest = after;
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold() {
        let html = CmarkRenderer::new().render("Hello **world**");
        assert!(html.contains("<strong>world</strong>"));
    }

    #[test]
    fn test_single_newline_is_line_break() {
        let html = CmarkRenderer::new().render("line one\nline two");
        assert_eq!(html, "<p>line one<br />\nline two</p>\n");

        let plain = CmarkRenderer::new().with_options(MarkdownOptions {
            line_breaks: false,
            ..MarkdownOptions::default()
        });
        assert_eq!(plain.render("a\nb"), "<p>a\nb</p>\n");
    }

    #[test]
    fn test_strikethrough_and_tables() {
        let renderer = CmarkRenderer::new();
        assert!(renderer.render("~~gone~~").contains("<del>gone</del>"));

        let table = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(table.contains("<table>"));
        assert!(table.contains("<td>2</td>"));
    }

    #[test]
    fn test_shortcodes() {
        assert_eq!(replace_shortcodes("hot :fire: take"), "hot 🔥 take");
        assert_eq!(replace_shortcodes("time 12:30:00"), "time 12:30:00");
        assert_eq!(replace_shortcodes(":not_a_real_emoji_code:"), ":not_a_real_emoji_code:");
        assert_eq!(replace_shortcodes("trailing:"), "trailing:");
    }

    #[test]
    fn test_no_shortcodes_in_code() {
        let html = CmarkRenderer::new().render("```\n:fire:\n```\n\n`:fire:`");
        assert!(!html.contains('🔥'));
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = CmarkRenderer::new().render("<span class=\"x\">hi</span>");
        assert!(html.contains("<span class=\"x\">hi</span>"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(CmarkRenderer::new().render(""), "");
    }
}
