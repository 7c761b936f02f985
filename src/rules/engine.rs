//! Rule application.
//!
//! Patterns are written in the host's JavaScript dialect, so they are
//! compiled with `fancy_regex`: look-around and backreferences work, and
//! patterns without them run on the plain `regex` engine underneath.

use fancy_regex::Regex;

use super::{RewriteRule, expand_replacement};
use crate::error::Error;
use crate::transcript::Role;

/// A rule that was dropped because it could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiagnostic {
    pub rule: String,
    pub message: String,
}

struct CompiledRule {
    rule: RewriteRule,
    regex: Regex,
}

/// Applies an ordered rule list to message text.
///
/// Every rule is compiled once up front; rules that fail to compile are
/// logged, recorded in [`diagnostics`](Self::diagnostics) and never applied.
pub struct Rewriter {
    rules: Vec<CompiledRule>,
    diagnostics: Vec<RuleDiagnostic>,
}

impl Rewriter {
    pub fn new(rules: &[RewriteRule]) -> Self {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut diagnostics = Vec::new();

        for rule in rules.iter().filter(|r| r.is_active()) {
            match compile(rule) {
                Ok(regex) => compiled.push(CompiledRule {
                    rule: rule.clone(),
                    regex,
                }),
                Err(e) => {
                    tracing::warn!(rule = %rule.name, tier = %rule.source_tier, error = %e, "skipping rule");
                    diagnostics.push(RuleDiagnostic {
                        rule: rule.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Self {
            rules: compiled,
            diagnostics,
        }
    }

    /// A rewriter with no rules; [`render`](Self::render) is the identity.
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Rewrite one message.
    ///
    /// `depth` is the message's distance from the newest message in the
    /// transcript (0 = newest). Rules run in order, each replacing every
    /// match in the output of the previous one.
    pub fn render(&self, raw_text: &str, is_user_authored: bool, depth: usize) -> String {
        if raw_text.is_empty() {
            return String::new();
        }

        let role = Role::from_is_user(is_user_authored);
        let mut text = raw_text.to_string();

        for compiled in &self.rules {
            let rule = &compiled.rule;
            if !rule.applies_to(role, depth) {
                continue;
            }

            if let Some(next) = replace_all(compiled, &text) {
                text = next;
            }
        }

        text
    }

    /// Number of rules that will be applied.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules dropped because their pattern or flags were invalid.
    pub fn diagnostics(&self) -> &[RuleDiagnostic] {
        &self.diagnostics
    }
}

/// Replace every match of `compiled` in `text`.
///
/// Returns `None` when nothing matched. A match that fails at run time
/// (backtracking limit) leaves the text untouched for this rule.
fn replace_all(compiled: &CompiledRule, text: &str) -> Option<String> {
    let rule = &compiled.rule;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut matched = false;

    for caps in compiled.regex.captures_iter(text) {
        let caps = match caps {
            Ok(caps) => caps,
            Err(e) => {
                tracing::warn!(rule = %rule.name, error = %e, "rule failed while matching; message left as is");
                return None;
            }
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&expand_replacement(&rule.replacement, &caps, text, &rule.trim_strings));
        last = whole.end();
        matched = true;
    }

    if !matched {
        return None;
    }
    out.push_str(&text[last..]);
    Some(out)
}

/// Compile a rule's pattern with its flags.
///
/// `i`, `m` and `s` become inline flags; `g`, `u`, `y`, `d` and `v` have no
/// counterpart (replacement is always global) and unknown flags are
/// ignored.
fn compile(rule: &RewriteRule) -> Result<Regex, Error> {
    // Repeated inline flags are a syntax error
    let inline: String = ['i', 'm', 's'].into_iter().filter(|f| rule.flags.contains(*f)).collect();
    let pattern = if inline.is_empty() {
        rule.pattern.clone()
    } else {
        format!("(?{inline}){}", rule.pattern)
    };

    Regex::new(&pattern).map_err(|source| Error::RuleCompilation {
        rule: rule.name.clone(),
        source: Box::new(source),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::rules::{RoleSet, RuleTier};

    #[test]
    fn test_replaces_every_occurrence() {
        let rewriter = Rewriter::new(&[RewriteRule::new("foo", "foo", "bar")]);
        assert_eq!(rewriter.render("foo foo", false, 0), "bar bar");
        assert_eq!(rewriter.render("foo foo", true, 0), "bar bar");
    }

    #[test]
    fn test_role_targeting() {
        let rule = RewriteRule::new("agent", "a", "b").with_roles(RoleSet::only(Role::Agent));
        let rewriter = Rewriter::new(&[rule]);
        assert_eq!(rewriter.render("aaa", true, 0), "aaa");
        assert_eq!(rewriter.render("aaa", false, 0), "bbb");
    }

    #[test]
    fn test_min_depth_boundary() {
        let rule = RewriteRule::new("old", "x", "y").with_depth(Some(5), None);
        let rewriter = Rewriter::new(&[rule]);
        assert_eq!(rewriter.render("x", false, 3), "x");
        assert_eq!(rewriter.render("x", false, 5), "y");
        assert_eq!(rewriter.render("x", false, 50), "y");
    }

    #[test]
    fn test_max_depth_boundary() {
        let rule = RewriteRule::new("recent", "x", "y").with_depth(None, Some(1));
        let rewriter = Rewriter::new(&[rule]);
        assert_eq!(rewriter.render("x", false, 1), "y");
        assert_eq!(rewriter.render("x", false, 2), "x");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let rules = vec![
            RewriteRule::new("broken", "(", "z"),
            RewriteRule::new("ok", "a", "b"),
        ];
        let rewriter = Rewriter::new(&rules);
        assert_eq!(rewriter.render("(a)", false, 0), "(b)");
        assert_eq!(rewriter.len(), 1);
        assert_eq!(rewriter.diagnostics().len(), 1);
        assert_eq!(rewriter.diagnostics()[0].rule, "broken");
    }

    #[test]
    fn test_rules_chain_in_order() {
        let rules = vec![
            RewriteRule::new("first", "cat", "dog"),
            RewriteRule::new("second", "dog", "wolf").with_tier(RuleTier::Preset),
        ];
        assert_eq!(Rewriter::new(&rules).render("cat", false, 0), "wolf");
    }

    #[test]
    fn test_substitution_is_not_rescanned() {
        // Output of one pass is not matched again by the same rule
        let rewriter = Rewriter::new(&[RewriteRule::new("grow", "a", "aa")]);
        assert_eq!(rewriter.render("a", false, 0), "aa");
    }

    #[test]
    fn test_flags() {
        let insensitive = RewriteRule::new("i", "hello", "bye").with_flags("gi");
        assert_eq!(Rewriter::new(&[insensitive]).render("HeLLo", false, 0), "bye");

        let sensitive = RewriteRule::new("plain", "hello", "bye").with_flags("g");
        assert_eq!(Rewriter::new(&[sensitive]).render("HeLLo", false, 0), "HeLLo");

        let dotall = RewriteRule::new("s", "<think>.*</think>", "").with_flags("gs");
        assert_eq!(Rewriter::new(&[dotall]).render("<think>a\nb</think>ok", false, 0), "ok");

        let multiline = RewriteRule::new("m", "^- ", "* ").with_flags("gm");
        assert_eq!(Rewriter::new(&[multiline]).render("- a\n- b", false, 0), "* a\n* b");
    }

    #[test]
    fn test_look_around() {
        let ahead = RewriteRule::new("ahead", "foo(?=bar)", "X");
        let behind = RewriteRule::new("behind", "(?<!a)b", "B");
        let rewriter = Rewriter::new(&[ahead, behind]);
        assert!(rewriter.diagnostics().is_empty());
        assert_eq!(rewriter.render("foobar foobaz", false, 0), "Xbar foobaz");
        assert_eq!(rewriter.render("ab cb", false, 0), "ab cB");
    }

    #[test]
    fn test_backreference() {
        let rewriter = Rewriter::new(&[RewriteRule::new("double", r"(a)\1", "B")]);
        assert!(rewriter.diagnostics().is_empty());
        assert_eq!(rewriter.render("foobar aa a", false, 0), "foobar B a");
    }

    #[test]
    fn test_repeated_flags() {
        let rule = RewriteRule::new("twice", "x", "y").with_flags("gii");
        let rewriter = Rewriter::new(&[rule]);
        assert!(rewriter.diagnostics().is_empty());
        assert_eq!(rewriter.render("X", false, 0), "y");
    }

    #[test]
    fn test_capture_groups() {
        let rule = RewriteRule::new("quote", r#""([^"]+)""#, "“$1”");
        assert_eq!(Rewriter::new(&[rule]).render(r#"she said "hi""#, false, 0), "she said “hi”");
    }

    #[test]
    fn test_empty_text_skips_rules() {
        let rewriter = Rewriter::new(&[RewriteRule::new("anything", "^$", "filled")]);
        assert_eq!(rewriter.render("", false, 0), "");
    }

    proptest! {
        #[test]
        fn prop_no_rules_is_identity(text in ".*", is_user in any::<bool>(), depth in 0usize..100) {
            prop_assert_eq!(Rewriter::empty().render(&text, is_user, depth), text);
        }

        #[test]
        fn prop_disabled_rules_are_identity(text in "[a-z ]*", depth in 0usize..100) {
            let rules = vec![
                RewriteRule::new("a", "a", "b").disabled(),
                RewriteRule::new("e", "e", "").disabled(),
            ];
            prop_assert_eq!(Rewriter::new(&rules).render(&text, false, depth), text);
        }

        #[test]
        fn prop_agent_rule_never_touches_user(text in "[a-z ]*", depth in 0usize..100) {
            let rule = RewriteRule::new("agent", "[a-z]", "#").with_roles(RoleSet::only(Role::Agent));
            prop_assert_eq!(Rewriter::new(&[rule]).render(&text, true, depth), text);
        }
    }
}
