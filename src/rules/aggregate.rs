//! Rule collection across provenance tiers.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{RewriteRule, RuleTier, normalize_rule};
use crate::error::{Error, Result};
use crate::util::decode_text;

/// A read-only store of raw rule records for one tier.
pub trait RuleSource {
    fn tier(&self) -> RuleTier;

    /// Load the raw records. An error means the tier is unavailable, which
    /// the aggregator treats as "no rules from this tier".
    fn load(&self) -> Result<Vec<Value>>;
}

/// Rule records held in memory.
#[derive(Debug, Clone)]
pub struct StaticRuleSource {
    tier: RuleTier,
    records: Vec<Value>,
}

impl StaticRuleSource {
    pub fn new(tier: RuleTier, records: Vec<Value>) -> Self {
        Self { tier, records }
    }
}

impl RuleSource for StaticRuleSource {
    fn tier(&self) -> RuleTier {
        self.tier
    }

    fn load(&self) -> Result<Vec<Value>> {
        Ok(self.records.clone())
    }
}

/// Rule records read from a JSON file.
///
/// Accepts a bare array of records or any of the documents the host stores
/// rules in: settings (`extension_settings.regex`), character cards
/// (`data.extensions.regex_scripts`) and presets (`extensions.regex_scripts`).
#[derive(Debug, Clone)]
pub struct JsonRuleSource {
    tier: RuleTier,
    path: PathBuf,
}

impl JsonRuleSource {
    pub fn new<P: AsRef<Path>>(tier: RuleTier, path: P) -> Self {
        Self {
            tier,
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Places a rule array can live in a host document, most specific first.
const RULE_ARRAY_PATHS: &[&[&str]] = &[
    &["data", "extensions", "regex_scripts"],
    &["extensions", "regex_scripts"],
    &["extension_settings", "regex"],
    &["regex_scripts"],
    &["regex"],
];

impl RuleSource for JsonRuleSource {
    fn tier(&self) -> RuleTier {
        self.tier
    }

    fn load(&self) -> Result<Vec<Value>> {
        let bytes = std::fs::read(&self.path).map_err(|e| Error::SourceUnavailable {
            tier: self.tier,
            reason: format!("{}: {e}", self.path.display()),
        })?;
        let document: Value = serde_json::from_str(&decode_text(&bytes, None))?;
        locate_rules(document).ok_or_else(|| Error::SourceUnavailable {
            tier: self.tier,
            reason: format!("{}: no rule list found", self.path.display()),
        })
    }
}

fn locate_rules(document: Value) -> Option<Vec<Value>> {
    if let Value::Array(records) = document {
        return Some(records);
    }

    RULE_ARRAY_PATHS.iter().find_map(|path| {
        let mut node = &document;
        for key in *path {
            node = node.get(key)?;
        }
        node.as_array().cloned()
    })
}

/// Collect, normalize and order rules from every source.
///
/// Output order is Global → Character → Preset, keeping source order within
/// a tier. Disabled rules and rules without a pattern are dropped. A source
/// that fails to load contributes nothing. Rules with the same name in
/// different tiers are all kept.
pub fn aggregate(sources: &[&dyn RuleSource]) -> Vec<RewriteRule> {
    let mut rules = Vec::new();

    for source in sources {
        let tier = source.tier();
        let records = match source.load() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(%tier, error = %e, "rule tier unavailable, continuing without it");
                continue;
            }
        };

        let before = rules.len();
        rules.extend(
            records
                .iter()
                .map(|record| normalize_rule(record, tier))
                .filter(RewriteRule::is_active),
        );
        tracing::debug!(%tier, loaded = records.len(), active = rules.len() - before, "rules aggregated");
    }

    // Stable: source order survives within a tier
    rules.sort_by_key(|rule| rule.source_tier);
    rules
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    struct Unavailable;

    impl RuleSource for Unavailable {
        fn tier(&self) -> RuleTier {
            RuleTier::Preset
        }

        fn load(&self) -> Result<Vec<Value>> {
            Err(Error::SourceUnavailable {
                tier: RuleTier::Preset,
                reason: "no preset selected".to_string(),
            })
        }
    }

    #[test]
    fn test_tier_order_and_filtering() {
        let preset = StaticRuleSource::new(RuleTier::Preset, vec![json!({ "scriptName": "p", "findRegex": "p" })]);
        let global = StaticRuleSource::new(
            RuleTier::Global,
            vec![
                json!({ "scriptName": "g1", "findRegex": "a" }),
                json!({ "scriptName": "off", "findRegex": "b", "disabled": true }),
                json!({ "scriptName": "empty", "findRegex": "" }),
                json!({ "scriptName": "g2", "findRegex": "c" }),
            ],
        );
        let character = StaticRuleSource::new(RuleTier::Character, vec![json!({ "scriptName": "c", "findRegex": "d" })]);

        let rules = aggregate(&[&preset, &global, &character]);
        let names: Vec<_> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["g1", "g2", "c", "p"]);
    }

    #[test]
    fn test_unavailable_tier_is_skipped() {
        let global = StaticRuleSource::new(RuleTier::Global, vec![json!({ "findRegex": "a" })]);
        let rules = aggregate(&[&global, &Unavailable]);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_same_name_is_not_deduplicated() {
        let record = json!({ "scriptName": "dup", "findRegex": "a" });
        let global = StaticRuleSource::new(RuleTier::Global, vec![record.clone()]);
        let character = StaticRuleSource::new(RuleTier::Character, vec![record]);
        assert_eq!(aggregate(&[&global, &character]).len(), 2);
    }

    #[test]
    fn test_json_source_locates_character_card_rules() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let card = json!({
            "spec": "chara_card_v2",
            "data": { "extensions": { "regex_scripts": [ { "scriptName": "card", "findRegex": "x" } ] } }
        });
        write!(file, "{card}").unwrap();

        let source = JsonRuleSource::new(RuleTier::Character, file.path());
        let records = source.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["scriptName"], "card");
    }

    #[test]
    fn test_json_source_missing_file() {
        let source = JsonRuleSource::new(RuleTier::Global, "/nonexistent/rules.json");
        assert!(matches!(source.load(), Err(Error::SourceUnavailable { .. })));
        assert!(aggregate(&[&source]).is_empty());
    }

    #[test]
    fn test_locate_bare_array_and_settings() {
        assert_eq!(locate_rules(json!([{ "a": 1 }])).map(|r| r.len()), Some(1));
        let settings = json!({ "extension_settings": { "regex": [{}, {}] } });
        assert_eq!(locate_rules(settings).map(|r| r.len()), Some(2));
        assert!(locate_rules(json!({ "unrelated": true })).is_none());
    }
}
