//! # chatbind
//!
//! Export chat transcripts to EPUB, standalone HTML, Word and plain text.
//!
//! ## Pipeline
//!
//! 1. Rewrite rules are collected from three tiers (global, character,
//!    preset), normalized and ordered ([`rules`]).
//! 2. The selected messages are rewritten, rendered from Markdown and
//!    reduced to plain text ([`extract`]).
//! 3. An exporter assembles the records into one in-memory
//!    [`Artifact`] ([`export`]).
//! 4. A [`Delivery`] writes the artifact out ([`deliver`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use chatbind::export::{self, ExportFormat};
//! use chatbind::markdown::CmarkRenderer;
//! use chatbind::rules::{JsonRuleSource, RuleTier};
//! use chatbind::{Delivery, DirectoryDelivery, ExportConfig, Transcript};
//!
//! let transcript = Transcript::open("chat.jsonl")?;
//! let global = JsonRuleSource::new(RuleTier::Global, "settings.json");
//! let config = ExportConfig { chapter_size: 10, ..ExportConfig::default() };
//!
//! let artifact = export::export(ExportFormat::Epub, &transcript, &[&global], &CmarkRenderer::new(), &config)?;
//! DirectoryDelivery::new("out").deliver(&artifact)?;
//! # Ok::<(), chatbind::Error>(())
//! ```

pub mod capability;
pub mod deliver;
pub mod dom;
pub mod error;
pub mod export;
pub mod extract;
pub mod markdown;
pub mod rules;
pub mod sanitize;
pub mod transcript;
pub(crate) mod util;

pub use capability::{CapabilityCell, CapabilityState};
pub use deliver::{Delivery, DirectoryDelivery};
pub use error::{Error, Result};
pub use export::{Artifact, Document, ExportFormat, Exporter, Locale};
pub use extract::{ExportConfig, Extraction, Extractor, RenderRecord};
pub use transcript::{RawMessage, Role, Transcript, TranscriptSource};
