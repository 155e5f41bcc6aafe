//! Policy subsystem: rules, decision contexts and the fail-closed engine.
//!
//! The executor consults the engine before any runtime is invoked. Absence
//! of a matching rule is a deny.

mod condition;
mod context;
mod engine;
mod loader;
mod model;

pub use condition::{ConditionExpr, ConditionFn, PolicyCondition};
pub use context::{ContextError, DecisionContext};
pub use engine::{PolicyEngine, DEFAULT_DENY_REASON};
pub use loader::{
    load_policy_files, load_policy_set_from_path, load_policy_set_from_str, PolicyLoadError,
};
pub use model::{PolicyDecision, PolicyEffect, PolicyRule, PolicySet, WILDCARD};
