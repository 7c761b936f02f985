//! Chat transcripts as read by the exporter.
//!
//! The host application owns the transcript; this module only models the
//! read-only view the pipeline needs ([`TranscriptSource`]) and provides an
//! in-memory [`Transcript`] that can be loaded from the host's JSON Lines
//! chat files.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::util::decode_text;

/// Author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn from_is_user(is_user: bool) -> Self {
        if is_user { Role::User } else { Role::Agent }
    }
}

/// One recorded chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub sequence_index: usize,
    pub is_user_authored: bool,
    pub author_name: String,
    pub raw_text: String,
}

impl RawMessage {
    pub fn new(
        sequence_index: usize,
        is_user_authored: bool,
        author_name: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            sequence_index,
            is_user_authored,
            author_name: author_name.into(),
            raw_text: raw_text.into(),
        }
    }

    pub fn role(&self) -> Role {
        Role::from_is_user(self.is_user_authored)
    }
}

/// Read-only access to a host transcript.
pub trait TranscriptSource {
    /// All recorded messages, in ascending sequence order.
    fn messages(&self) -> &[RawMessage];

    /// Number of messages the host currently has materialized for display.
    ///
    /// Hosts that lazily render long chats report fewer messages here than
    /// [`messages`](Self::messages) holds. Defaults to all of them.
    fn materialized_count(&self) -> usize {
        self.messages().len()
    }
}

/// An owned, in-memory transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<RawMessage>,
    materialized: Option<usize>,
    /// Display name of the human participant, if the chat file records one.
    pub user_name: Option<String>,
    /// Display name of the character the chat is held with.
    pub character_name: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transcript from messages, renumbering them in order.
    pub fn from_messages(messages: impl IntoIterator<Item = RawMessage>) -> Self {
        let mut transcript = Self::new();
        for message in messages {
            transcript.push(message.is_user_authored, message.author_name, message.raw_text);
        }
        transcript
    }

    /// Append a message; its sequence index is its position.
    pub fn push(
        &mut self,
        is_user_authored: bool,
        author_name: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> &mut Self {
        let index = self.messages.len();
        self.messages
            .push(RawMessage::new(index, is_user_authored, author_name, raw_text));
        self
    }

    pub fn with_materialized_count(mut self, count: usize) -> Self {
        self.materialized = Some(count);
        self
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Load a chat file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_jsonl(&decode_text(&bytes, None)))
    }

    /// Parse the host's JSON Lines chat format.
    ///
    /// The first line may be a metadata header carrying `user_name` and
    /// `character_name`; every other line is a message. Lines that are not
    /// valid JSON are skipped.
    pub fn from_jsonl(content: &str) -> Self {
        let mut transcript = Self::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "skipping unreadable chat line");
                    continue;
                }
            };

            if is_header(&value) {
                let header: ChatHeader = serde_json::from_value(value).unwrap_or_default();
                transcript.user_name = header.user_name.filter(|s| !s.is_empty());
                transcript.character_name = header.character_name.filter(|s| !s.is_empty());
                continue;
            }

            match serde_json::from_value::<ChatLine>(value) {
                Ok(msg) => {
                    transcript.push(msg.is_user, msg.name, msg.mes);
                }
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "skipping malformed chat message");
                }
            }
        }

        transcript
    }
}

impl TranscriptSource for Transcript {
    fn messages(&self) -> &[RawMessage] {
        &self.messages
    }

    fn materialized_count(&self) -> usize {
        self.materialized.unwrap_or(self.messages.len())
    }
}

fn is_header(value: &Value) -> bool {
    value.get("mes").is_none()
        && (value.get("user_name").is_some()
            || value.get("character_name").is_some()
            || value.get("chat_metadata").is_some())
}

#[derive(Debug, Default, Deserialize)]
struct ChatHeader {
    user_name: Option<String>,
    character_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_user: bool,
    mes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: &str = r#"{"user_name":"Ada","character_name":"Lovelace","chat_metadata":{}}
{"name":"Ada","is_user":true,"mes":"Hi there"}
not json at all
{"name":"Lovelace","is_user":false,"mes":"Hello **Ada**","extra":{"swipes":[]}}
"#;

    #[test]
    fn test_parse_jsonl() {
        let transcript = Transcript::from_jsonl(CHAT);

        assert_eq!(transcript.user_name.as_deref(), Some("Ada"));
        assert_eq!(transcript.character_name.as_deref(), Some("Lovelace"));
        assert_eq!(transcript.len(), 2);

        let messages = transcript.messages();
        assert_eq!(messages[0].sequence_index, 0);
        assert!(messages[0].is_user_authored);
        assert_eq!(messages[1].sequence_index, 1);
        assert_eq!(messages[1].raw_text, "Hello **Ada**");
        assert_eq!(messages[1].role(), Role::Agent);
    }

    #[test]
    fn test_line_without_text_is_skipped() {
        let chat = r#"{"name":"Ada","is_user":true,"mes":"one"}
{"foo":1}
{"name":"Lovelace","is_user":false}
{"name":"Lovelace","is_user":false,"mes":""}
{"name":"Ada","is_user":true,"mes":"two"}
"#;
        let transcript = Transcript::from_jsonl(chat);
        let texts: Vec<_> = transcript.messages().iter().map(|m| m.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["one", "", "two"]);

        let indices: Vec<_> = transcript.messages().iter().map(|m| m.sequence_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_materialized_count_defaults_to_len() {
        let mut transcript = Transcript::new();
        transcript.push(true, "u", "a").push(false, "c", "b");
        assert_eq!(transcript.materialized_count(), 2);

        let partial = transcript.with_materialized_count(1);
        assert_eq!(partial.materialized_count(), 1);
    }

    #[test]
    fn test_from_messages_renumbers() {
        let transcript = Transcript::from_messages(vec![
            RawMessage::new(7, false, "c", "x"),
            RawMessage::new(3, true, "u", "y"),
        ]);
        let indices: Vec<_> = transcript.messages().iter().map(|m| m.sequence_index).collect();
        assert_eq!(indices, vec![0, 1]);
    }
}
