//! Fixed wording used by the document assemblers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language of the generated front matter and chapter titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en", alias = "en-US", alias = "en-us")]
    En,
    #[serde(rename = "zh-cn", alias = "zh-CN", alias = "zh")]
    ZhCn,
}

impl Locale {
    /// BCP 47 tag written to `dc:language` and `xml:lang`.
    pub fn language_tag(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::ZhCn => "zh-CN",
        }
    }

    pub fn book_info(self) -> &'static str {
        match self {
            Locale::En => "Book Info",
            Locale::ZhCn => "书籍信息",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Locale::En => "Title",
            Locale::ZhCn => "书名",
        }
    }

    pub fn author(self) -> &'static str {
        match self {
            Locale::En => "Author",
            Locale::ZhCn => "作者",
        }
    }

    pub fn chapters(self) -> &'static str {
        match self {
            Locale::En => "Chapters",
            Locale::ZhCn => "章节数",
        }
    }

    pub fn length(self) -> &'static str {
        match self {
            Locale::En => "Length",
            Locale::ZhCn => "总字数",
        }
    }

    pub fn exported(self) -> &'static str {
        match self {
            Locale::En => "Exported",
            Locale::ZhCn => "导出时间",
        }
    }

    pub fn generator(self) -> &'static str {
        match self {
            Locale::En => "Generator",
            Locale::ZhCn => "生成工具",
        }
    }

    pub fn cover(self) -> &'static str {
        match self {
            Locale::En => "Cover",
            Locale::ZhCn => "封面",
        }
    }

    pub fn info_page(self) -> &'static str {
        match self {
            Locale::En => "Info",
            Locale::ZhCn => "信息页",
        }
    }

    pub fn body_start(self) -> &'static str {
        match self {
            Locale::En => "Begin",
            Locale::ZhCn => "正文开始",
        }
    }

    /// Separator between a field label and its value.
    pub fn colon(self) -> &'static str {
        match self {
            Locale::En => ": ",
            Locale::ZhCn => "：",
        }
    }

    /// A section marker in plain text output.
    pub fn bracketed(self, label: &str) -> String {
        match self {
            Locale::En => format!("[{label}]"),
            Locale::ZhCn => format!("【{label}】"),
        }
    }

    pub fn chapter_title(self, number: usize) -> String {
        match self {
            Locale::En => format!("Chapter {number}"),
            Locale::ZhCn => format!("第 {number} 章"),
        }
    }

    pub fn chapter_summary(self, chapters: usize, messages: usize) -> String {
        match self {
            Locale::En => format!("{chapters} chapters ({messages} messages)"),
            Locale::ZhCn => format!("共 {chapters} 章 ({messages} 条对话)"),
        }
    }

    pub fn length_summary(self, chars: usize) -> String {
        match self {
            Locale::En => format!("about {chars} characters"),
            Locale::ZhCn => format!("约 {chars} 字"),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::En => "en",
            Locale::ZhCn => "zh-cn",
        })
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" => Ok(Locale::En),
            "zh" | "zh-cn" => Ok(Locale::ZhCn),
            other => Err(format!("unknown locale '{other}' (expected en or zh-cn)")),
        }
    }
}
