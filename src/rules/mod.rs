//! User-configurable regex rewrite rules.
//!
//! Rules arrive from three provenance tiers as loosely-shaped JSON records.
//! The pipeline is:
//!
//! - [`normalize_rule`]: one raw record → one canonical [`RewriteRule`]
//! - [`aggregate`]: all tiers → one ordered, filtered rule list
//! - [`Rewriter`]: compiled rules applied to a single message's text
//!
//! # Example
//!
//! ```
//! use chatbind::rules::{Rewriter, RuleTier, StaticRuleSource, aggregate};
//! use serde_json::json;
//!
//! let global = StaticRuleSource::new(
//!     RuleTier::Global,
//!     vec![json!({ "scriptName": "censor", "findRegex": "/darn/gi", "replaceString": "d**n" })],
//! );
//! let rules = aggregate(&[&global]);
//! let rewriter = Rewriter::new(&rules);
//!
//! assert_eq!(rewriter.render("Darn it, darn it", false, 0), "d**n it, d**n it");
//! ```

mod aggregate;
mod engine;
mod normalize;
mod template;

use std::fmt;

pub use aggregate::{JsonRuleSource, RuleSource, StaticRuleSource, aggregate};
pub use engine::{RuleDiagnostic, Rewriter};
pub use normalize::{DEFAULT_FLAGS, normalize_rule};
pub use template::expand_replacement;

use crate::transcript::Role;

/// Provenance of a rule. Variants are declared in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleTier {
    Global,
    Character,
    Preset,
}

impl fmt::Display for RuleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleTier::Global => "global",
            RuleTier::Character => "character",
            RuleTier::Preset => "preset",
        })
    }
}

/// A subset of `{User, Agent}`. The empty set means "both roles".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct RoleSet {
    user: bool,
    agent: bool,
}

impl RoleSet {
    /// The empty set, which targets every role.
    pub const ANY: RoleSet = RoleSet {
        user: false,
        agent: false,
    };

    pub fn only(role: Role) -> Self {
        let mut set = Self::ANY;
        set.insert(role);
        set
    }

    pub fn insert(&mut self, role: Role) {
        match role {
            Role::User => self.user = true,
            Role::Agent => self.agent = true,
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::User => self.user,
            Role::Agent => self.agent,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.user && !self.agent
    }

    /// Whether a rule with this target set applies to `role`.
    pub fn targets(&self, role: Role) -> bool {
        self.is_empty() || self.contains(role)
    }
}

/// Canonical rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub source_tier: RuleTier,
    pub name: String,
    /// Regex body, without `/…/` delimiters.
    pub pattern: String,
    pub flags: String,
    /// Replacement template in `$1` / `$<name>` / `{{match}}` syntax.
    pub replacement: String,
    pub target_roles: RoleSet,
    pub min_depth: Option<usize>,
    pub max_depth: Option<usize>,
    pub enabled: bool,
    /// Substrings removed from every captured value before substitution.
    pub trim_strings: Vec<String>,
}

impl RewriteRule {
    /// A global-tier rule that replaces every match of `pattern`.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            source_tier: RuleTier::Global,
            name: name.into(),
            pattern: pattern.into(),
            flags: DEFAULT_FLAGS.to_string(),
            replacement: replacement.into(),
            target_roles: RoleSet::ANY,
            min_depth: None,
            max_depth: None,
            enabled: true,
            trim_strings: Vec::new(),
        }
    }

    pub fn with_tier(mut self, tier: RuleTier) -> Self {
        self.source_tier = tier;
        self
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }

    pub fn with_roles(mut self, roles: RoleSet) -> Self {
        self.target_roles = roles;
        self
    }

    pub fn with_depth(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_depth = min;
        self.max_depth = max;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this rule should run on a message with the given role and depth.
    ///
    /// `min_depth` is inclusive; `max_depth` is inclusive.
    pub fn applies_to(&self, role: Role, depth: usize) -> bool {
        if !self.target_roles.targets(role) {
            return false;
        }
        if self.min_depth.is_some_and(|min| depth < min) {
            return false;
        }
        if self.max_depth.is_some_and(|max| depth > max) {
            return false;
        }
        true
    }

    /// Whether aggregation keeps this rule.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.pattern.is_empty()
    }
}
