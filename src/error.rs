//! Error types for chatbind operations.

use thiserror::Error;

use crate::rules::RuleTier;

/// Errors that can occur while exporting a transcript.
///
/// Per-rule and per-tier failures ([`Error::RuleCompilation`],
/// [`Error::SourceUnavailable`]) are contained by the pipeline: they are
/// logged and recorded as diagnostics, never returned from an export.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule '{rule}' does not compile: {source}")]
    RuleCompilation {
        rule: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("{tier} rules unavailable: {reason}")]
    SourceUnavailable { tier: RuleTier, reason: String },

    #[error("{capability} is not available: {reason}")]
    CapabilityUnavailable {
        capability: &'static str,
        reason: String,
    },

    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("nothing to export: the selected range contains no messages")]
    EmptySelection,
}

pub type Result<T> = std::result::Result<T, Error>;
