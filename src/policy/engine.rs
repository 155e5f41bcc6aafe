//! Fail-closed, first-match-wins policy evaluation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use super::condition::PolicyCondition;
use super::context::DecisionContext;
use super::model::{PolicyDecision, PolicyEffect, PolicyRule, PolicySet};

/// Reason reported when no rule matched.
pub const DEFAULT_DENY_REASON: &str = "No matching rule (fail-closed)";

/// Evaluates authorization requests against an ordered [`PolicySet`].
///
/// Rules are tried in declaration order and the first full match decides.
/// When nothing matches the request is denied. Conditions that return an
/// error or panic are treated as failing, which skips their rule.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    policy_set: PolicySet,
}

impl PolicyEngine {
    /// Creates an engine over the given rule set.
    #[must_use]
    pub fn new(policy_set: PolicySet) -> Self {
        Self { policy_set }
    }

    /// The rule set being evaluated.
    #[must_use]
    pub fn policy_set(&self) -> &PolicySet {
        &self.policy_set
    }

    /// Decides whether `subject` may perform `action` on `resource`.
    #[must_use]
    pub fn evaluate(
        &self,
        subject: &str,
        action: &str,
        resource: &str,
        context: &DecisionContext,
    ) -> PolicyDecision {
        let version = self.policy_set.version.clone();

        for rule in &self.policy_set.rules {
            if !rule.matches_request(subject, action, resource) {
                continue;
            }
            if !conditions_pass(rule, context) {
                continue;
            }

            debug!(
                rule = %rule.id,
                %subject,
                %action,
                %resource,
                effect = %rule.effect,
                "policy rule matched"
            );
            let (allowed, verb) = match rule.effect {
                PolicyEffect::Allow => (true, "Allowed"),
                PolicyEffect::Deny => (false, "Denied"),
            };
            return PolicyDecision {
                allowed,
                reason: format!("{verb} by rule {}", rule.id),
                rule_id: Some(rule.id.clone()),
                policy_version: version,
            };
        }

        debug!(%subject, %action, %resource, "no policy rule matched, denying");
        PolicyDecision {
            allowed: false,
            reason: DEFAULT_DENY_REASON.to_string(),
            rule_id: None,
            policy_version: version,
        }
    }
}

fn conditions_pass(rule: &PolicyRule, context: &DecisionContext) -> bool {
    rule.conditions
        .iter()
        .all(|condition| condition_holds(rule, condition, context))
}

fn condition_holds(
    rule: &PolicyRule,
    condition: &PolicyCondition,
    context: &DecisionContext,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| condition.evaluate(context))) {
        Ok(Ok(holds)) => holds,
        Ok(Err(e)) => {
            warn!(
                rule = %rule.id,
                condition = %condition.name(),
                error = %e,
                "policy condition failed"
            );
            false
        }
        Err(_) => {
            warn!(rule = %rule.id, condition = %condition.name(), "policy condition panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ConditionExpr;
    use serde_json::json;

    fn ctx() -> DecisionContext {
        DecisionContext::new()
    }

    fn allow_multiply() -> PolicyRule {
        PolicyRule::allow("allow-multiply", "tool.invoke")
            .subject("user:alice")
            .resource("tool:multiply")
    }

    #[test]
    fn allow_and_deny_by_matching_rules() {
        let allow_iris = PolicyRule::allow("allow-iris-models", "model.invoke")
            .subject("agent:planner")
            .resource("model:iris*");
        let deny_multiply =
            PolicyRule::deny("deny-multiply-tool", "tool.invoke").resource("tool:multiply");
        let engine = PolicyEngine::new(
            PolicySet::new("test")
                .version("v1")
                .rule(allow_iris)
                .rule(deny_multiply),
        );

        let allowed = engine.evaluate("agent:planner", "model.invoke", "model:iris_rf", &ctx());
        assert!(allowed.allowed);
        assert_eq!(allowed.rule_id.as_deref(), Some("allow-iris-models"));
        assert_eq!(allowed.reason, "Allowed by rule allow-iris-models");
        assert_eq!(allowed.policy_version.as_deref(), Some("v1"));

        let denied = engine.evaluate("user:demo", "tool.invoke", "tool:multiply", &ctx());
        assert!(!denied.allowed);
        assert_eq!(denied.rule_id.as_deref(), Some("deny-multiply-tool"));
    }

    #[test]
    fn empty_set_fails_closed_for_any_request() {
        let engine = PolicyEngine::default();
        for (subject, action, resource) in [
            ("user:someone", "model.invoke", "model:unknown"),
            ("*", "*", "*"),
            ("", "", ""),
            ("agent:a", "workspace.access", "workspace:lab"),
        ] {
            let decision = engine.evaluate(subject, action, resource, &ctx());
            assert!(!decision.allowed);
            assert_eq!(decision.rule_id, None);
            assert!(decision.reason.contains("No matching rule"));
        }
    }

    #[test]
    fn earlier_rule_wins_over_more_specific_later_rule() {
        let deny_all = PolicyRule::deny("deny-all-tools", "tool.invoke");
        let engine = PolicyEngine::new(
            PolicySet::new("order")
                .rule(deny_all.clone())
                .rule(allow_multiply()),
        );
        let decision = engine.evaluate("user:alice", "tool.invoke", "tool:multiply", &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.rule_id.as_deref(), Some("deny-all-tools"));

        let reversed = PolicyEngine::new(
            PolicySet::new("order")
                .rule(allow_multiply())
                .rule(deny_all),
        );
        let decision = reversed.evaluate("user:alice", "tool.invoke", "tool:multiply", &ctx());
        assert!(decision.allowed);
    }

    #[test]
    fn failing_condition_skips_to_next_rule() {
        let untrusted_domain = PolicyCondition::expr(
            "untrusted-domain",
            ConditionExpr::Equals {
                key: "domain".into(),
                value: json!("untrusted.example.com"),
            },
        );
        let deny_untrusted = PolicyRule::deny("deny-untrusted", "tool.invoke")
            .resource("tool:http*")
            .when(untrusted_domain);
        let allow_http = PolicyRule::allow("allow-http", "tool.invoke").resource("tool:http*");
        let engine = PolicyEngine::new(
            PolicySet::new("conditions")
                .rule(deny_untrusted)
                .rule(allow_http),
        );

        let trusted = DecisionContext::new().with("domain", "example.com");
        let untrusted = DecisionContext::new().with("domain", "untrusted.example.com");

        let decision = engine.evaluate("u", "tool.invoke", "tool:http_get", &trusted);
        assert_eq!(decision.rule_id.as_deref(), Some("allow-http"));
        let decision = engine.evaluate("u", "tool.invoke", "tool:http_get", &untrusted);
        assert_eq!(decision.rule_id.as_deref(), Some("deny-untrusted"));
    }

    #[test]
    fn erroring_condition_counts_as_failed() {
        let broken = PolicyCondition::custom("broken", |_| Err("lookup exploded".into()));
        let rule = PolicyRule::allow("allow-if", "tool.invoke").when(broken);
        let engine = PolicyEngine::new(PolicySet::new("errors").rule(rule));

        let decision = engine.evaluate("u", "tool.invoke", "tool:x", &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.rule_id, None);
    }

    #[test]
    fn panicking_condition_counts_as_failed() {
        let boom = PolicyCondition::check("boom", |_| panic!("predicate bug"));
        let engine = PolicyEngine::new(
            PolicySet::new("panics")
                .rule(PolicyRule::allow("allow-if", "tool.invoke").when(boom))
                .rule(PolicyRule::deny("fallback", "tool.invoke")),
        );

        let decision = engine.evaluate("u", "tool.invoke", "tool:x", &ctx());
        assert!(!decision.allowed);
        assert_eq!(decision.rule_id.as_deref(), Some("fallback"));
    }

    #[test]
    fn all_conditions_must_hold() {
        let rule = PolicyRule::allow("both", "agent.invoke")
            .when(PolicyCondition::check("yes", |_| true))
            .when(PolicyCondition::check("no", |_| false));
        let engine = PolicyEngine::new(PolicySet::new("all").rule(rule));

        let decision = engine.evaluate("u", "agent.invoke", "agent:a", &ctx());
        assert!(!decision.allowed);
    }
}
