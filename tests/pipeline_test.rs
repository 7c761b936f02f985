//! End-to-end extraction tests: transcript file, rule tiers and settings.

use chatbind::markdown::CmarkRenderer;
use chatbind::rules::{JsonRuleSource, RuleSource, RuleTier, StaticRuleSource};
use chatbind::{ExportConfig, Extractor, Transcript, TranscriptSource};
use serde_json::json;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

fn transcript() -> Transcript {
    Transcript::open(fixture_path("chat.jsonl")).unwrap()
}

fn settings() -> ExportConfig {
    ExportConfig::open(fixture_path("settings.json")).unwrap()
}

#[test]
fn test_transcript_header_and_messages() {
    let transcript = transcript();
    assert_eq!(transcript.user_name.as_deref(), Some("Ada"));
    assert_eq!(transcript.character_name.as_deref(), Some("Seraphina"));
    assert_eq!(transcript.messages().len(), 5);

    let indices: Vec<_> = transcript.messages().iter().map(|m| m.sequence_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_settings_document() {
    let config = settings();
    assert_eq!(config.title, "The Glade");
    assert_eq!(config.range_end, 4);
    assert!(config.include_user);
    assert!(!config.hide_agent_name);
    assert_eq!(config.chapter_size, 2);
}

#[test]
fn test_blank_author_defaults_to_user_name() {
    let transcript = transcript();
    let config = ExportConfig::default().with_default_author(transcript.user_name.as_deref());
    assert_eq!(config.display_author(), "Ada");

    let named = ExportConfig {
        author: "Grace".to_string(),
        ..ExportConfig::default()
    }
    .with_default_author(transcript.user_name.as_deref());
    assert_eq!(named.display_author(), "Grace");

    let anonymous = ExportConfig::default().with_default_author(Transcript::new().user_name.as_deref());
    assert_eq!(anonymous.display_author(), "SillyTavern");
}

#[test]
fn test_all_tiers_apply() {
    let transcript = transcript();
    let global = JsonRuleSource::new(RuleTier::Global, fixture_path("global_rules.json"));
    let character = JsonRuleSource::new(RuleTier::Character, fixture_path("character_card.json"));
    let renderer = CmarkRenderer::new();

    let extraction = Extractor::new(&renderer).extract(&transcript, &[&global, &character], &settings());
    let records = &extraction.records;
    assert_eq!(records.len(), 5);

    // character tier
    assert!(records[0].rendered_html.contains("<strong>forest</strong>"));
    assert_eq!(records[0].plain_text, "She smiles. Welcome to the forest, traveler.");

    // global tier, both roles
    assert_eq!(records[1].plain_text, "Where am I?");
    assert!(!records[4].rendered_html.contains("think"));
    assert_eq!(records[4].plain_text, "Rest now, Ada.");

    assert!(records[2].rendered_html.contains("<li>eat</li>"));
    assert_eq!(records[3].plain_text, "Thank you \u{2764}\u{fe0f}");

    // the uncompilable rule is reported, not fatal
    assert_eq!(extraction.diagnostics.len(), 1);
    assert_eq!(extraction.diagnostics[0].rule, "Broken");
}

#[test]
fn test_missing_tier_contributes_nothing() {
    let transcript = transcript();
    let missing = JsonRuleSource::new(RuleTier::Preset, fixture_path("no_such_preset.json"));
    let character = JsonRuleSource::new(RuleTier::Character, fixture_path("character_card.json"));
    let renderer = CmarkRenderer::new();

    let extraction = Extractor::new(&renderer).extract(&transcript, &[&missing, &character], &settings());
    assert_eq!(extraction.records.len(), 5);
    assert!(extraction.records[0].plain_text.contains("forest"));
    assert!(extraction.records[1].rendered_html.contains("<think>"));
}

#[test]
fn test_tier_order_is_global_character_preset() {
    let mut transcript = Transcript::new();
    transcript.push(false, "Bot", "a");
    let preset = StaticRuleSource::new(
        RuleTier::Preset,
        vec![json!({ "scriptName": "p", "findRegex": "/b/g", "replaceString": "c" })],
    );
    let global = StaticRuleSource::new(
        RuleTier::Global,
        vec![json!({ "scriptName": "g", "findRegex": "/a/g", "replaceString": "b" })],
    );
    let renderer = CmarkRenderer::new();

    // preset listed first, still runs last
    let sources: [&dyn RuleSource; 2] = [&preset, &global];
    let extraction = Extractor::new(&renderer).extract(&transcript, &sources, &ExportConfig::default());
    assert_eq!(extraction.records[0].plain_text, "c");
}

#[test]
fn test_depth_is_measured_from_newest_message() {
    let transcript = transcript();
    let recent_only = StaticRuleSource::new(
        RuleTier::Global,
        vec![json!({
            "scriptName": "shout",
            "findRegex": "/\\w+/g",
            "replaceString": "X",
            "placement": [2],
            "maxDepth": 0
        })],
    );
    let renderer = CmarkRenderer::new();

    // range ends before the newest message; depth still counts from it
    let config = ExportConfig {
        range_end: 2,
        ..settings()
    };
    let extraction = Extractor::new(&renderer).extract(&transcript, &[&recent_only], &config);
    assert_eq!(extraction.records.len(), 3);
    assert!(extraction.records.iter().all(|r| !r.plain_text.contains('X')));

    let extraction = Extractor::new(&renderer).extract(&transcript, &[&recent_only], &settings());
    assert_eq!(extraction.records[4].plain_text, "X X, X.");
}

#[test]
fn test_role_filter_and_range() {
    let transcript = transcript();
    let renderer = CmarkRenderer::new();
    let config = ExportConfig {
        range_start: 1,
        range_end: 3,
        include_user: true,
        include_agent: false,
        ..ExportConfig::default()
    };

    let extraction = Extractor::new(&renderer).extract(&transcript, &[], &config);
    let indices: Vec<_> = extraction.records.iter().map(|r| r.sequence_index).collect();
    assert_eq!(indices, vec![1, 3]);
    assert!(extraction.records.iter().all(|r| r.speaker_name == "Ada"));
}
