//! HTTP descriptor runtime.
//!
//! Performs no network I/O. It answers with a description of the request
//! the spec would make, so that policy around HTTP tools can be exercised
//! safely.

use serde_json::{json, Value};

use crate::ports::{BoxError, Runtime};
use crate::registry::Spec;

const DEFAULT_URL: &str = "https://example.local";
const DEFAULT_METHOD: &str = "GET";
const DEFAULT_DOMAIN: &str = "example.local";

/// Describes the HTTP request a spec stands for.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRuntime;

impl Runtime for HttpRuntime {
    fn invoke(&self, spec: &Spec, input: &Value) -> Result<Value, BoxError> {
        let field = |key: &str, default: &str| -> String {
            spec.metadata()
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Ok(json!({
            "status": "ok",
            "url": field("url", DEFAULT_URL),
            "method": field("method", DEFAULT_METHOD),
            "domain": field("domain", DEFAULT_DOMAIN),
            "payload": input,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_request_from_metadata() {
        let spec = Spec::tool("tool:http_get", "HTTP get", "http")
            .with_metadata("url", "https://untrusted.example.com/data")
            .with_metadata("method", "POST")
            .with_metadata("domain", "untrusted.example.com");

        let output = HttpRuntime.invoke(&spec, &json!({"q": 1})).unwrap();

        assert_eq!(
            output,
            json!({
                "status": "ok",
                "url": "https://untrusted.example.com/data",
                "method": "POST",
                "domain": "untrusted.example.com",
                "payload": {"q": 1},
            })
        );
    }

    #[test]
    fn falls_back_to_defaults() {
        let spec = Spec::tool("tool:http_get", "HTTP get", "http");
        let output = HttpRuntime.invoke(&spec, &Value::Null).unwrap();
        assert_eq!(output["url"], json!(DEFAULT_URL));
        assert_eq!(output["method"], json!("GET"));
    }
}
