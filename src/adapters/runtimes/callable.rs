//! Runtime for specs bound to in-process closures.
//!
//! Input shape is decided here, at the adapter boundary: a JSON object is
//! handed to the closure as named arguments, any other value as a single
//! positional argument.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::ports::{BoxError, Runtime};
use crate::registry::Spec;

/// Arguments passed to a [`Callable`].
#[derive(Debug, Clone, Copy)]
pub enum CallArgs<'a> {
    /// The task input was an object; keys are argument names.
    Named(&'a Map<String, Value>),
    /// The task input was any other value.
    Single(&'a Value),
}

impl<'a> CallArgs<'a> {
    /// Splits a task input into named or single arguments.
    #[must_use]
    pub fn from_input(input: &'a Value) -> Self {
        match input {
            Value::Object(map) => Self::Named(map),
            other => Self::Single(other),
        }
    }

    /// A named argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the input was not an object or lacks `name`.
    pub fn arg(&self, name: &str) -> Result<&'a Value, BoxError> {
        match self {
            Self::Named(map) => map
                .get(name)
                .ok_or_else(|| format!("missing argument '{name}'").into()),
            Self::Single(_) => Err(format!("expected named argument '{name}'").into()),
        }
    }

    /// A named integer argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or not an integer.
    pub fn i64(&self, name: &str) -> Result<i64, BoxError> {
        self.arg(name)?
            .as_i64()
            .ok_or_else(|| format!("argument '{name}' is not an integer").into())
    }

    /// A named numeric argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or not a number.
    pub fn f64(&self, name: &str) -> Result<f64, BoxError> {
        self.arg(name)?
            .as_f64()
            .ok_or_else(|| format!("argument '{name}' is not a number").into())
    }

    /// A named string argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is missing or not a string.
    pub fn str(&self, name: &str) -> Result<&'a str, BoxError> {
        self.arg(name)?
            .as_str()
            .ok_or_else(|| format!("argument '{name}' is not a string").into())
    }
}

type CallableFn = dyn Fn(CallArgs<'_>) -> Result<Value, BoxError> + Send + Sync;

/// A closure usable as a spec binding under the `callable` runtime.
#[derive(Clone)]
pub struct Callable(Arc<CallableFn>);

impl Callable {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(CallArgs<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Calls the closure with a task input.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn call(&self, input: &Value) -> Result<Value, BoxError> {
        (self.0)(CallArgs::from_input(input))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// Executes specs whose binding is a [`Callable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CallableRuntime;

impl Runtime for CallableRuntime {
    fn invoke(&self, spec: &Spec, input: &Value) -> Result<Value, BoxError> {
        let Some(callable) = spec.binding_as::<Callable>() else {
            let message = format!("Spec {} has a non-callable binding.", spec.id());
            return Err(message.into());
        };
        callable
            .call(input)
            .map_err(|e| format!("CallableRuntime failed: {e}").into())
    }
}
