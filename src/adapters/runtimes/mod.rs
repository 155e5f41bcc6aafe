//! Built-in runtimes and the names they register under.

pub mod callable;
pub mod http;

pub use callable::{CallArgs, Callable, CallableRuntime};
pub use http::HttpRuntime;

use std::sync::Arc;

use crate::ports::Runtime;

/// Runtime name for in-process closures.
pub const CALLABLE: &str = "callable";
/// Runtime name for the network-free HTTP descriptor.
pub const HTTP: &str = "http";

/// Every built-in runtime with its registration name.
#[must_use]
pub fn builtin() -> Vec<(&'static str, Arc<dyn Runtime>)> {
    vec![
        (CALLABLE, Arc::new(CallableRuntime)),
        (HTTP, Arc::new(HttpRuntime)),
    ]
}
