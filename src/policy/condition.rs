//! Named predicates attached to policy rules.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::context::DecisionContext;
use crate::ports::BoxError;

/// Signature of a caller-supplied condition.
pub type ConditionFn = dyn Fn(&DecisionContext) -> Result<bool, BoxError> + Send + Sync;

/// Declarative condition over a dotted context path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConditionExpr {
    /// The value at `key` equals `value`.
    Equals {
        /// Dotted context path.
        key: String,
        /// Expected value.
        value: Value,
    },
    /// The value at `key` is missing or differs from `value`.
    NotEquals {
        /// Dotted context path.
        key: String,
        /// Rejected value.
        value: Value,
    },
    /// `key` is present and not null.
    Present {
        /// Dotted context path.
        key: String,
    },
    /// `key` is missing or null.
    Absent {
        /// Dotted context path.
        key: String,
    },
    /// The value at `key` is one of `values`.
    OneOf {
        /// Dotted context path.
        key: String,
        /// Accepted values.
        values: Vec<Value>,
    },
}

impl ConditionExpr {
    /// Evaluates the expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be traversed.
    pub fn evaluate(&self, ctx: &DecisionContext) -> Result<bool, BoxError> {
        Ok(match self {
            Self::Equals { key, value } => non_null(ctx, key)? == Some(value),
            Self::NotEquals { key, value } => non_null(ctx, key)? != Some(value),
            Self::Present { key } => non_null(ctx, key)?.is_some(),
            Self::Absent { key } => non_null(ctx, key)?.is_none(),
            Self::OneOf { key, values } => non_null(ctx, key)?.is_some_and(|v| values.contains(v)),
        })
    }
}

fn non_null<'a>(ctx: &'a DecisionContext, key: &str) -> Result<Option<&'a Value>, BoxError> {
    Ok(ctx.lookup(key)?.filter(|v| !v.is_null()))
}

#[derive(Clone)]
enum Predicate {
    Expr(ConditionExpr),
    Custom(Arc<ConditionFn>),
}

/// A named predicate over the decision context.
///
/// A rule only matches when all of its conditions hold. A condition that
/// errors counts as not holding.
#[derive(Clone, Deserialize)]
#[serde(from = "ConditionDef")]
pub struct PolicyCondition {
    name: String,
    predicate: Predicate,
}

#[derive(Deserialize)]
struct ConditionDef {
    name: String,
    when: ConditionExpr,
}

impl From<ConditionDef> for PolicyCondition {
    fn from(def: ConditionDef) -> Self {
        Self::expr(def.name, def.when)
    }
}

impl PolicyCondition {
    /// Wraps a declarative expression.
    pub fn expr(name: impl Into<String>, expr: ConditionExpr) -> Self {
        Self {
            name: name.into(),
            predicate: Predicate::Expr(expr),
        }
    }

    /// Wraps a fallible closure.
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&DecisionContext) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Predicate::Custom(Arc::new(predicate)),
        }
    }

    /// Wraps an infallible closure.
    pub fn check<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&DecisionContext) -> bool + Send + Sync + 'static,
    {
        Self::custom(name, move |ctx| Ok(predicate(ctx)))
    }

    /// Condition name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the predicate.
    ///
    /// # Errors
    ///
    /// Propagates whatever the predicate reports.
    pub fn evaluate(&self, ctx: &DecisionContext) -> Result<bool, BoxError> {
        match &self.predicate {
            Predicate::Expr(expr) => expr.evaluate(ctx),
            Predicate::Custom(f) => f(ctx),
        }
    }
}

impl fmt::Debug for PolicyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("PolicyCondition");
        out.field("name", &self.name);
        match &self.predicate {
            Predicate::Expr(expr) => out.field("expr", expr),
            Predicate::Custom(_) => out.field("expr", &"<custom>"),
        };
        out.finish()
    }
}
