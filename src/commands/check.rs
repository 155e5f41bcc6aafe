//! `capgate check` command.

use serde_json::Value;

use crate::kernel::Kernel;
use crate::policy::{DecisionContext, PolicyDecision};

/// Reason printed when no policy is loaded.
pub const UNCHECKED_REASON: &str = "No policy loaded (unchecked)";

/// Execute the `check` command.
///
/// Prints the decision as JSON. A denial is reported as an error so the
/// process exits non-zero.
///
/// # Errors
///
/// Returns an error string for malformed `--context` entries or a denial.
pub fn run(
    kernel: &Kernel,
    subject: &str,
    action: &str,
    resource: &str,
    context: &[String],
) -> Result<(), String> {
    let context = parse_context(context)?;
    let decision = decide(kernel, subject, action, resource, &context);
    let rendered = serde_json::to_string_pretty(&decision).map_err(|e| e.to_string())?;
    println!("{rendered}");
    if decision.allowed {
        Ok(())
    } else {
        Err(format!("denied: {}", decision.reason))
    }
}

fn decide(
    kernel: &Kernel,
    subject: &str,
    action: &str,
    resource: &str,
    context: &DecisionContext,
) -> PolicyDecision {
    kernel
        .executor()
        .authorise(Some(subject), action, resource, context)
        .unwrap_or_else(|| PolicyDecision {
            allowed: true,
            reason: UNCHECKED_REASON.to_string(),
            rule_id: None,
            policy_version: None,
        })
}

/// Parses `key=value` pairs. Values are read as JSON when possible and
/// kept as strings otherwise.
///
/// # Errors
///
/// Returns an error string for an entry without `=` or with an empty key.
pub fn parse_context(entries: &[String]) -> Result<DecisionContext, String> {
    let mut context = DecisionContext::new();
    for entry in entries {
        let (key, raw) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid --context '{entry}': expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("invalid --context '{entry}': empty key"));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        context.insert(key, value);
    }
    Ok(context)
}
