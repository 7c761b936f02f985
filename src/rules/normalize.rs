//! Rule record normalization.
//!
//! Rule records come from several stores that disagree on field names
//! (`findRegex` vs `pattern`, `placement` codes vs role names, ...). Each
//! concept has a priority list of field names; the first one present wins.

use serde_json::Value;

use super::{RewriteRule, RoleSet, RuleTier};
use crate::transcript::Role;

/// Flags used when a record supplies none.
pub const DEFAULT_FLAGS: &str = "g";

const NAME_FIELDS: &[&str] = &["scriptName", "name", "id"];
const PATTERN_FIELDS: &[&str] = &["findRegex", "regex", "pattern", "find"];
const REPLACEMENT_FIELDS: &[&str] = &["replaceString", "replacement", "replace", "with"];
const FLAGS_FIELDS: &[&str] = &["flags", "regexFlags"];
const PLACEMENT_FIELDS: &[&str] = &["placement", "targetRoles", "roles"];
const LEGACY_USER_FIELDS: &[&str] = &["applyToUser", "user_input"];
const LEGACY_AGENT_FIELDS: &[&str] = &["applyToAgent", "applyToAI", "ai_output"];
const MIN_DEPTH_FIELDS: &[&str] = &["minDepth", "min_depth"];
const MAX_DEPTH_FIELDS: &[&str] = &["maxDepth", "max_depth"];
const TRIM_FIELDS: &[&str] = &["trimStrings", "trim_strings"];

/// Host placement code for user input.
const PLACEMENT_USER_INPUT: i64 = 1;
/// Host placement code for agent output.
const PLACEMENT_AGENT_OUTPUT: i64 = 2;

/// Characters accepted after the closing slash of a `/pattern/flags` literal.
const LITERAL_FLAGS: &str = "dgimsuvy";

/// Convert one raw rule record into a [`RewriteRule`].
///
/// Never fails: a record that is not an object, or has no usable pattern,
/// yields a rule with an empty pattern, which aggregation drops.
pub fn normalize_rule(record: &Value, tier: RuleTier) -> RewriteRule {
    let name = first_string(record, NAME_FIELDS).unwrap_or_default();
    let raw_pattern = first_string(record, PATTERN_FIELDS).unwrap_or_default();
    let replacement = first_string(record, REPLACEMENT_FIELDS).unwrap_or_default();
    let supplied_flags = first_string(record, FLAGS_FIELDS);

    let (pattern, flags) = match split_regex_literal(&raw_pattern) {
        Some((body, literal_flags)) => (body.to_string(), literal_flags.to_string()),
        None => (
            raw_pattern,
            supplied_flags.unwrap_or_else(|| DEFAULT_FLAGS.to_string()),
        ),
    };

    let (target_roles, placement_matches_chat) = placement(record);

    let mut enabled = match first(record, &["disabled"]) {
        Some(Value::Bool(disabled)) => !disabled,
        _ => !matches!(first(record, &["enabled"]), Some(Value::Bool(false))),
    };

    if !placement_matches_chat {
        tracing::debug!(rule = %name, "rule targets no chat placement; disabling");
        enabled = false;
    }

    if matches!(first(record, &["promptOnly"]), Some(Value::Bool(true))) {
        tracing::debug!(rule = %name, "prompt-only rule does not affect displayed text");
        enabled = false;
    }

    RewriteRule {
        source_tier: tier,
        name,
        pattern,
        flags,
        replacement,
        target_roles,
        min_depth: first(record, MIN_DEPTH_FIELDS).and_then(depth_value),
        max_depth: first(record, MAX_DEPTH_FIELDS).and_then(depth_value),
        enabled,
        trim_strings: first(record, TRIM_FIELDS)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Split `/body/flags` into its parts.
///
/// Returns `None` when the text is not in literal notation, including when
/// the trailing segment contains characters that are not regex flags.
fn split_regex_literal(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);

    if body.is_empty() || !flags.chars().all(|c| LITERAL_FLAGS.contains(c)) {
        return None;
    }
    Some((body, flags))
}

/// Resolve the role targeting of a record.
///
/// The second value is `false` when a non-empty placement list names only
/// placements outside the chat (prompt or world-info slots).
fn placement(record: &Value) -> (RoleSet, bool) {
    let mut roles = RoleSet::ANY;

    if let Some(list) = first(record, PLACEMENT_FIELDS).and_then(Value::as_array) {
        for item in list {
            if let Some(role) = placement_role(item) {
                roles.insert(role);
            }
        }
        let chat_placement = list.is_empty() || !roles.is_empty();
        return (roles, chat_placement);
    }

    if first(record, LEGACY_USER_FIELDS).is_some_and(truthy) {
        roles.insert(Role::User);
    }
    if first(record, LEGACY_AGENT_FIELDS).is_some_and(truthy) {
        roles.insert(Role::Agent);
    }
    (roles, true)
}

fn placement_role(item: &Value) -> Option<Role> {
    match item {
        Value::Number(n) => match n.as_i64()? {
            PLACEMENT_USER_INPUT => Some(Role::User),
            PLACEMENT_AGENT_OUTPUT => Some(Role::Agent),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "user" | "user_input" | "1" => Some(Role::User),
            "assistant" | "ai" | "agent" | "char" | "character" | "ai_output" | "2" => {
                Some(Role::Agent)
            }
            _ => None,
        },
        _ => None,
    }
}

fn depth_value(value: &Value) -> Option<usize> {
    let depth = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    usize::try_from(depth).ok()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn first<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    let object = record.as_object()?;
    fields
        .iter()
        .filter_map(|field| object.get(*field))
        .find(|value| !value.is_null())
}

fn first_string(record: &Value, fields: &[&str]) -> Option<String> {
    let object = record.as_object()?;
    fields.iter().find_map(|field| match object.get(*field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
