//! `capgate run` command.

use serde_json::Value;

use super::check::parse_context;
use crate::execution::TaskResult;
use crate::kernel::Kernel;

/// Per-task options collected from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunRequest<'a> {
    /// Subject for policy checks.
    pub subject: Option<&'a str>,
    /// Workspace label.
    pub workspace: Option<&'a str>,
    /// Task input as a JSON document.
    pub input: &'a str,
    /// Raw `key=value` decision-context entries.
    pub context: &'a [String],
}

/// Execute the `run` command.
///
/// Prints the task result as JSON. A failed task is reported as an error
/// so the process exits non-zero.
///
/// # Errors
///
/// Returns an error string if the input or context is malformed or the
/// task fails.
pub fn run(kernel: &Kernel, target: &str, request: &RunRequest<'_>) -> Result<(), String> {
    let result = execute(kernel, target, request)?;
    let rendered = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
    println!("{rendered}");
    if result.is_completed() {
        Ok(())
    } else {
        Err(format!(
            "task {} failed: {}",
            result.task_id,
            result.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

fn execute(kernel: &Kernel, target: &str, request: &RunRequest<'_>) -> Result<TaskResult, String> {
    let input: Value = serde_json::from_str(request.input)
        .map_err(|e| format!("invalid --input JSON: {e}"))?;
    let context = parse_context(request.context)?;
    let mut task = kernel.new_task(request.subject, target, input);
    task.workspace = request.workspace.map(str::to_string);
    task.context = context.into();
    Ok(kernel.executor().run(&mut task))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::execution::FailureKind;
    use crate::policy::{ConditionExpr, PolicyCondition, PolicyEngine, PolicyRule, PolicySet};
    use crate::registry::Spec;

    fn kernel() -> Kernel {
        let kernel = Kernel::new();
        let spec = Spec::tool("tool:http_get", "HTTP get", "http")
            .with_metadata("method", "POST");
        kernel.registry.register(spec).unwrap();
        kernel
    }

    fn request(input: &str) -> RunRequest<'_> {
        RunRequest {
            input,
            ..RunRequest::default()
        }
    }

    #[test]
    fn runs_http_tool() {
        let request = RunRequest {
            workspace: Some("lab"),
            ..request(r#"{"q": "rust"}"#)
        };

        let result = execute(&kernel(), "tool:http_get", &request).unwrap();

        assert!(result.is_completed());
        let output = result.output.unwrap();
        assert_eq!(output["method"], json!("POST"));
        assert_eq!(output["payload"], json!({"q": "rust"}));
    }

    #[test]
    fn invalid_input_is_rejected_before_running() {
        let kernel = kernel();
        let err = execute(&kernel, "tool:http_get", &request("{not json"))
            .unwrap_err();
        assert!(err.starts_with("invalid --input JSON"));
        assert!(kernel.events.list_events(None).unwrap().is_empty());
    }

    #[test]
    fn context_entries_reach_the_policy() {
        let trusted = PolicyCondition::expr(
            "trusted",
            ConditionExpr::Equals {
                key: "domain".into(),
                value: json!("trusted.example.com"),
            },
        );
        let rule = PolicyRule::allow("trusted", "tool.invoke").when(trusted);
        let engine = PolicyEngine::new(PolicySet::new("s").rule(rule));
        let kernel = kernel().with_policy(engine);
        let trusted_context = ["domain=trusted.example.com".to_string()];
        let other_context = ["domain=untrusted.example.com".to_string()];

        let allowed = RunRequest {
            context: &trusted_context,
            ..request("{}")
        };
        let denied = RunRequest {
            context: &other_context,
            ..request("{}")
        };

        let completed = execute(&kernel, "tool:http_get", &allowed).unwrap();
        let refused = execute(&kernel, "tool:http_get", &denied).unwrap();

        assert!(completed.is_completed(), "{:?}", completed.error);
        assert_eq!(refused.failure, Some(FailureKind::PolicyDenied));
    }

    #[test]
    fn malformed_context_is_rejected() {
        let context = ["no-equals".to_string()];
        let request = RunRequest {
            context: &context,
            ..request("{}")
        };
        assert!(execute(&kernel(), "tool:http_get", &request).is_err());
    }

    #[test]
    fn unknown_target_fails() {
        let kernel = kernel();
        let result = execute(&kernel, "tool:nope", &request("{}")).unwrap();
        assert_eq!(result.failure, Some(FailureKind::NotFound));
        assert!(run(&kernel, "tool:nope", &request("{}")).is_err());
    }
}
