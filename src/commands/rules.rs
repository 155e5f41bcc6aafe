//! `capgate rules` command.

use std::fmt::Write;

use crate::kernel::Kernel;
use crate::policy::PolicyEngine;

/// Execute the `rules` command.
///
/// # Errors
///
/// Never fails today; the signature matches the other handlers.
pub fn run(kernel: &Kernel) -> Result<(), String> {
    print!("{}", render(kernel.policy.as_ref()));
    Ok(())
}

fn render(engine: Option<&PolicyEngine>) -> String {
    let Some(engine) = engine else {
        return "No policy loaded; every request is allowed.\n".to_string();
    };
    let set = engine.policy_set();
    let mut out = format!("Policy set: {}", set.name);
    if let Some(version) = &set.version {
        let _ = write!(out, " ({version})");
    }
    out.push('\n');
    if set.rules.is_empty() {
        out.push_str("No rules; every request is denied.\n");
        return out;
    }
    for (i, rule) in set.rules.iter().enumerate() {
        let _ = write!(
            out,
            "  {}. {} [{}] subject={} action={} resource={}",
            i + 1,
            rule.id,
            rule.effect,
            rule.subject_match,
            rule.action,
            rule.resource_match,
        );
        if !rule.conditions.is_empty() {
            let names: Vec<&str> = rule.conditions.iter().map(|c| c.name()).collect();
            let _ = write!(out, " when {}", names.join(", "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::policy::{PolicyCondition, PolicyRule, PolicySet};

    #[test]
    fn renders_rules_in_order() {
        let engine = PolicyEngine::new(
            PolicySet::new("base")
                .version("v1")
                .rule(PolicyRule::allow("allow-models", "model.invoke").resource("model:*"))
                .rule(
                    PolicyRule::deny("deny-http", "tool.invoke")
                        .subject("bob")
                        .when(PolicyCondition::check("always", |_| true)),
                ),
        );

        assert_eq!(
            render(Some(&engine)),
            "Policy set: base (v1)\n\
             \x20 1. allow-models [allow] subject=* action=model.invoke resource=model:*\n\
             \x20 2. deny-http [deny] subject=bob action=tool.invoke resource=* when always\n"
        );
    }

    #[test]
    fn renders_missing_and_empty_policy() {
        assert!(render(None).starts_with("No policy loaded"));
        let empty = PolicyEngine::new(PolicySet::new("empty"));
        assert!(render(Some(&empty)).ends_with("every request is denied.\n"));
    }
}
