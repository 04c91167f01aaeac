//! Tool contract and the outcome adapter
//!
//! A tool is any unit exposing one operation: given a mapping of named
//! parameters and an execution context, produce a result mapping. Tools
//! report results in one of two raw conventions:
//!
//! - `{"error": "..."}` on failure
//! - `{"success": bool, "result": value, "energy_gain": number}` otherwise
//!
//! [`Outcome::from_raw`] normalizes both into the single shape the rest of
//! the engine consumes. The adapter ([`run_tool`]) additionally guarantees
//! that nothing escapes the boundary: panics are caught and every call runs
//! under a timeout, so the orchestrator only ever sees [`Outcome`]s.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, warn};

use crate::context::ExecutionContext;

/// Named parameter mapping passed to every tool invocation.
pub type ParamMap = serde_json::Map<String, Value>;

/// Declared interface of a tool: name, description, and a JSON-schema-like
/// object describing its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, unique within the owning agent's namespace
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// Parameter schema (`{"type": "object", "properties": {...}}`)
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Names of the declared parameters, in schema order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any declared parameter is a compound shape (object or array).
    pub fn has_compound_parameters(&self) -> bool {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props.values().any(|p| {
                    matches!(
                        p.get("type").and_then(Value::as_str),
                        Some("object") | Some("array")
                    ) || p.get("properties").is_some()
                        || p.get("items").is_some()
                })
            })
            .unwrap_or(false)
    }
}

/// The one operation every tool exposes.
///
/// Implementations return a raw result mapping; they should not panic, but a
/// panic is still contained by the adapter rather than propagated. Nested
/// calls go through [`ExecutionContext::call_tool`], which is what makes
/// composition observable.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's declared interface
    fn spec(&self) -> &ToolSpec;

    /// Execute with named parameters and the execution context.
    async fn execute(&self, params: &ParamMap, ctx: &ExecutionContext) -> Value;
}

/// Normalized result of one tool invocation.
///
/// This is the only shape the orchestrator and the composition tracker ever
/// branch on; raw tool conventions and failures are folded in by
/// [`Outcome::from_raw`] and [`run_tool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    /// Tool payload (the `result` value on success, `Null` on failure)
    pub payload: Value,
    /// Energy granted to the acting agent (zero on failure)
    pub energy_delta: f64,
    pub error: Option<String>,
}

impl Outcome {
    pub fn ok(payload: Value, energy_delta: f64) -> Self {
        Self {
            success: true,
            payload,
            energy_delta,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: Value::Null,
            energy_delta: 0.0,
            error: Some(message.into()),
        }
    }

    /// Normalize a raw tool result mapping into an `Outcome`.
    ///
    /// Recognizes both accepted conventions. Anything else is treated as a
    /// bare success payload with zero energy, so loosely-written tools still
    /// round-trip without granting rewards they never declared.
    pub fn from_raw(raw: Value) -> Self {
        if let Some(obj) = raw.as_object() {
            if let Some(err) = obj.get("error").and_then(Value::as_str) {
                return Self::failure(err.to_string());
            }
            if let Some(success) = obj.get("success").and_then(Value::as_bool) {
                let payload = obj.get("result").cloned().unwrap_or(Value::Null);
                let energy = obj
                    .get("energy_gain")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                if success {
                    return Self::ok(payload, energy);
                }
                let message = match &payload {
                    Value::String(s) => s.clone(),
                    Value::Null => "tool reported failure".to_string(),
                    other => other.to_string(),
                };
                return Self::failure(message);
            }
        }
        Self::ok(raw, 0.0)
    }
}

/// Execute a tool through the contract adapter.
///
/// Guarantees: never panics past this boundary, never exceeds `limit`, and
/// always returns a normalized [`Outcome`]. Side effects of the wrapped tool
/// itself are not restricted.
pub async fn run_tool(
    tool: &dyn Tool,
    params: &ParamMap,
    ctx: &ExecutionContext,
    limit: Duration,
) -> Outcome {
    let name = tool.spec().name.clone();
    debug!(tool = %name, timeout_ms = limit.as_millis() as u64, "executing tool");

    let guarded = AssertUnwindSafe(tool.execute(params, ctx)).catch_unwind();
    match tokio::time::timeout(limit, guarded).await {
        Err(_) => {
            warn!(tool = %name, timeout_ms = limit.as_millis() as u64, "tool timed out");
            Outcome::failure(format!(
                "tool '{}' timed out after {}ms",
                name,
                limit.as_millis()
            ))
        }
        Ok(Err(_panic)) => {
            warn!(tool = %name, "tool panicked; contained at adapter boundary");
            Outcome::failure(format!("tool '{}' panicked during execution", name))
        }
        Ok(Ok(raw)) => Outcome::from_raw(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ToolExchange;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoTool {
        spec: ToolSpec,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                spec: ToolSpec::new("echo", "Echo the parameters back"),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn execute(&self, params: &ParamMap, _ctx: &ExecutionContext) -> Value {
            json!({"success": true, "result": Value::Object(params.clone()), "energy_gain": 1.0})
        }
    }

    struct PanicTool {
        spec: ToolSpec,
    }

    #[async_trait]
    impl Tool for PanicTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn execute(&self, _params: &ParamMap, _ctx: &ExecutionContext) -> Value {
            panic!("intentional");
        }
    }

    struct SlowTool {
        spec: ToolSpec,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn execute(&self, _params: &ParamMap, _ctx: &ExecutionContext) -> Value {
            tokio::time::sleep(Duration::from_secs(30)).await;
            json!({"success": true, "result": null, "energy_gain": 0.0})
        }
    }

    fn test_ctx() -> ExecutionContext {
        ExecutionContext::root(Arc::new(ToolExchange::new()), "agent_1", 1, 5, Duration::from_secs(5))
    }

    #[test]
    fn normalizes_error_shape() {
        let out = Outcome::from_raw(json!({"error": "boom"}));
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("boom"));
        assert_eq!(out.energy_delta, 0.0);
    }

    #[test]
    fn normalizes_success_shape() {
        let out = Outcome::from_raw(json!({"success": true, "result": 16, "energy_gain": 12.0}));
        assert!(out.success);
        assert_eq!(out.payload, json!(16));
        assert_eq!(out.energy_delta, 12.0);
    }

    #[test]
    fn normalizes_declared_failure() {
        let out = Outcome::from_raw(json!({"success": false, "result": "no such thing", "energy_gain": 5.0}));
        assert!(!out.success);
        assert_eq!(out.energy_delta, 0.0);
        assert_eq!(out.error.as_deref(), Some("no such thing"));
    }

    #[test]
    fn unrecognized_shape_is_zero_energy_success() {
        let out = Outcome::from_raw(json!([1, 2, 3]));
        assert!(out.success);
        assert_eq!(out.energy_delta, 0.0);
    }

    #[tokio::test]
    async fn adapter_runs_tool() {
        let tool = EchoTool::new();
        let mut params = ParamMap::new();
        params.insert("message".into(), json!("hi"));
        let out = run_tool(&tool, &params, &test_ctx(), Duration::from_secs(1)).await;
        assert!(out.success);
        assert_eq!(out.payload["message"], json!("hi"));
        assert_eq!(out.energy_delta, 1.0);
    }

    #[tokio::test]
    async fn adapter_contains_panics() {
        let tool = PanicTool {
            spec: ToolSpec::new("panicky", "Always panics"),
        };
        let out = run_tool(&tool, &ParamMap::new(), &test_ctx(), Duration::from_secs(1)).await;
        assert!(!out.success);
        assert!(out.error.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn adapter_enforces_timeout() {
        let tool = SlowTool {
            spec: ToolSpec::new("slow", "Sleeps forever"),
        };
        let out = run_tool(&tool, &ParamMap::new(), &test_ctx(), Duration::from_millis(20)).await;
        assert!(!out.success);
        assert!(out.error.unwrap().contains("timed out"));
    }

    #[test]
    fn spec_parameter_introspection() {
        let spec = ToolSpec::new("t", "d").with_parameters(json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "opts": {"type": "object", "properties": {"deep": {"type": "string"}}}
            }
        }));
        assert_eq!(spec.parameter_names().len(), 2);
        assert!(spec.has_compound_parameters());
    }
}
