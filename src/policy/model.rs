//! Policy rules, rule sets and decisions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::condition::PolicyCondition;

/// Wildcard accepted by subject and resource patterns.
pub const WILDCARD: &str = "*";

/// Outcome a rule produces when it matches.
///
/// Deserializes leniently: `allow` in any case is [`PolicyEffect::Allow`],
/// every other string is [`PolicyEffect::Deny`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyEffect {
    /// Permit the request.
    Allow,
    /// Refuse the request.
    #[default]
    Deny,
}

impl<'de> Deserialize<'de> for PolicyEffect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let effect = String::deserialize(deserializer)?;
        if effect.eq_ignore_ascii_case("allow") {
            Ok(Self::Allow)
        } else {
            Ok(Self::Deny)
        }
    }
}

impl fmt::Display for PolicyEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        })
    }
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

/// A single authorization rule.
///
/// Matches on subject (exact or `*`), action (exact) and resource (exact,
/// `*`, or `prefix*`), then on every attached condition.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRule {
    /// Rule identifier, reported in decisions.
    pub id: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Exact subject or `*`.
    #[serde(default = "wildcard")]
    pub subject_match: String,
    /// Exact action string, e.g. `tool.invoke`.
    pub action: String,
    /// Exact resource id, `*`, or a `prefix*` pattern.
    #[serde(default = "wildcard")]
    pub resource_match: String,
    /// Effect when the rule matches.
    #[serde(default)]
    pub effect: PolicyEffect,
    /// Extra predicates over the decision context.
    #[serde(default)]
    pub conditions: Vec<PolicyCondition>,
    /// Reserved. Rules are evaluated in list order regardless.
    #[serde(default)]
    pub priority: i32,
}

impl PolicyRule {
    /// A rule with the given effect that matches any subject and resource.
    pub fn new(id: impl Into<String>, action: impl Into<String>, effect: PolicyEffect) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            subject_match: wildcard(),
            action: action.into(),
            resource_match: wildcard(),
            effect,
            conditions: Vec::new(),
            priority: 0,
        }
    }

    /// An allow rule for `action`.
    pub fn allow(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(id, action, PolicyEffect::Allow)
    }

    /// A deny rule for `action`.
    pub fn deny(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(id, action, PolicyEffect::Deny)
    }

    /// Sets the subject pattern.
    #[must_use]
    pub fn subject(mut self, subject_match: impl Into<String>) -> Self {
        self.subject_match = subject_match.into();
        self
    }

    /// Sets the resource pattern.
    #[must_use]
    pub fn resource(mut self, resource_match: impl Into<String>) -> Self {
        self.resource_match = resource_match.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a condition.
    #[must_use]
    pub fn when(mut self, condition: PolicyCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns `true` if subject, action and resource all match.
    /// Conditions are not consulted.
    #[must_use]
    pub fn matches_request(&self, subject: &str, action: &str, resource: &str) -> bool {
        self.matches_subject(subject) && self.action == action && self.matches_resource(resource)
    }

    fn matches_subject(&self, subject: &str) -> bool {
        self.subject_match == WILDCARD || self.subject_match == subject
    }

    fn matches_resource(&self, resource: &str) -> bool {
        let pattern = self.resource_match.as_str();
        if pattern == WILDCARD {
            return true;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) => resource.starts_with(prefix),
            None => pattern == resource,
        }
    }
}

fn default_set_name() -> String {
    "default".to_string()
}

/// Ordered collection of rules. The first matching rule wins.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySet {
    /// Set name.
    #[serde(default = "default_set_name")]
    pub name: String,
    /// Version reported in every decision.
    #[serde(default)]
    pub version: Option<String>,
    /// Rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::new(default_set_name())
    }
}

impl PolicySet {
    /// Creates an empty, unversioned set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            rules: Vec::new(),
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Appends a rule.
    #[must_use]
    pub fn rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends the rules of `other` after this set's rules.
    ///
    /// Name and version are kept from `self`, or taken from `other` when
    /// `self` has no version yet.
    #[must_use]
    pub fn merge(mut self, other: PolicySet) -> Self {
        if self.version.is_none() {
            self.version = other.version;
        }
        self.rules.extend(other.rules);
        self
    }
}

/// Result of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Deciding rule; `None` only for the fail-closed default.
    pub rule_id: Option<String>,
    /// Version of the set that decided.
    pub policy_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_patterns() {
        let exact = PolicyRule::allow("r", "tool.invoke").resource("tool:multiply");
        let prefix = PolicyRule::allow("r", "tool.invoke").resource("tool:*");
        let any = PolicyRule::allow("r", "tool.invoke");

        assert!(exact.matches_request("u", "tool.invoke", "tool:multiply"));
        assert!(!exact.matches_request("u", "tool.invoke", "tool:multiply2"));
        assert!(prefix.matches_request("u", "tool.invoke", "tool:anything"));
        assert!(!prefix.matches_request("u", "tool.invoke", "model:x"));
        assert!(any.matches_request("u", "tool.invoke", "model:x"));
    }

    #[test]
    fn subject_and_action_are_exact() {
        let rule = PolicyRule::deny("r", "model.invoke").subject("agent:planner");

        assert!(rule.matches_request("agent:planner", "model.invoke", "model:x"));
        assert!(!rule.matches_request("agent:worker", "model.invoke", "model:x"));
        assert!(!rule.matches_request("agent:planner", "model.invoke.extra", "model:x"));
    }

    #[test]
    fn merge_keeps_rule_order() {
        let base = PolicySet::new("base").rule(PolicyRule::allow("a", "x"));
        let extra = PolicySet::new("extra")
            .version("v2")
            .rule(PolicyRule::deny("b", "x"));

        let merged = base.merge(extra);

        let ids: Vec<&str> = merged.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(merged.name, "base");
        assert_eq!(merged.version.as_deref(), Some("v2"));
    }
}
