//! Tool implementation factories
//!
//! The toolkit is the explicit plugin-registration surface: a created tool
//! names an implementation, and settlement binds that name through this
//! table. No reflection, no code loading — an unknown implementation name
//! leaves the tool metadata-only.
//!
//! Ships a small set of built-ins for demos and tests; real tool business
//! logic lives with whoever embeds the engine.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use cambrian_core::context::ExecutionContext;
use cambrian_core::tool::{ParamMap, Tool, ToolSpec};

type Factory = Box<dyn Fn(ToolSpec) -> Arc<dyn Tool> + Send + Sync>;

/// Named factory table mapping implementation names to constructors.
#[derive(Default)]
pub struct ToolKit {
    factories: HashMap<String, Factory>,
}

impl ToolKit {
    pub fn new() -> Self {
        Self::default()
    }

    /// A toolkit preloaded with the built-in implementations.
    pub fn with_builtins() -> Self {
        let mut kit = Self::new();
        kit.register("echo", |spec| Arc::new(EchoTool { spec }));
        kit.register("add", |spec| Arc::new(AddTool { spec }));
        kit.register("multiply", |spec| Arc::new(MultiplyTool { spec }));
        kit.register("square", |spec| Arc::new(SquareTool { spec }));
        kit.register("draft", |spec| Arc::new(DraftTool { spec }));
        kit
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(ToolSpec) -> Arc<dyn Tool> + Send + Sync + 'static,
    {
        debug!(implementation = name, "registered tool factory");
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Build an implementation under the given spec. `None` means the name
    /// is unknown and the tool stays metadata-only.
    pub fn build(&self, implementation: &str, spec: ToolSpec) -> Option<Arc<dyn Tool>> {
        self.factories.get(implementation).map(|f| f(spec))
    }

    pub fn implementation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

fn number(params: &ParamMap, key: &str) -> Result<f64, String> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("missing or non-numeric parameter '{key}'"))
}

/// Echoes its parameters back. Gain 1.
pub struct EchoTool {
    spec: ToolSpec,
}

impl EchoTool {
    pub fn with_default_spec() -> Self {
        Self {
            spec: ToolSpec::new("echo", "Echo the given parameters back"),
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

/// Adds `a` and `b`. Gain 2.
pub struct AddTool {
    spec: ToolSpec,
}

#[async_trait]
impl Tool for AddTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, params: &ParamMap, _ctx: &ExecutionContext) -> Value {
        match (number(params, "a"), number(params, "b")) {
            (Ok(a), Ok(b)) => json!({"success": true, "result": a + b, "energy_gain": 2.0}),
            (Err(e), _) | (_, Err(e)) => json!({"error": e}),
        }
    }
}

/// Multiplies `a` and `b`. Gain 2.
pub struct MultiplyTool {
    spec: ToolSpec,
}

impl MultiplyTool {
    pub fn with_default_spec() -> Self {
        Self {
            spec: ToolSpec::new("multiply", "Multiply two numbers").with_parameters(json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}}
            })),
        }
    }
}

#[async_trait]
impl Tool for MultiplyTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, params: &ParamMap, _ctx: &ExecutionContext) -> Value {
        match (number(params, "a"), number(params, "b")) {
            (Ok(a), Ok(b)) => json!({"success": true, "result": a * b, "energy_gain": 2.0}),
            (Err(e), _) | (_, Err(e)) => json!({"error": e}),
        }
    }
}

/// Squares `x` by composing `multiply`. Gain 10 plus the composed gain.
pub struct SquareTool {
    spec: ToolSpec,
}

impl SquareTool {
    pub fn with_default_spec() -> Self {
        Self {
            spec: ToolSpec::new("square", "Square a number via multiply").with_parameters(json!({
                "type": "object",
                "properties": {"number": {"type": "number"}}
            })),
        }
    }
}

#[async_trait]
impl Tool for SquareTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, params: &ParamMap, ctx: &ExecutionContext) -> Value {
        // `x` is accepted as a legacy alias for `number`.
        let x = match number(params, "number").or_else(|_| number(params, "x")) {
            Ok(x) => x,
            Err(_) => {
                return json!({"error": "missing or non-numeric parameter 'number'"});
            }
        };
        let mut inner = ParamMap::new();
        inner.insert("a".into(), json!(x));
        inner.insert("b".into(), json!(x));
        let outcome = ctx.call_tool("multiply", &inner).await;
        if !outcome.success {
            return json!({"error": outcome.error.unwrap_or_else(|| "multiply failed".into())});
        }
        json!({
            "success": true,
            "result": outcome.payload,
            "energy_gain": 10.0 + outcome.energy_delta,
        })
    }
}

/// Drafts a new tool: wraps its parameters in a `created_tool` payload that
/// settlement registers, scores, and binds. Gain 5.
pub struct DraftTool {
    spec: ToolSpec,
}

impl DraftTool {
    pub fn with_default_spec() -> Self {
        Self {
            spec: ToolSpec::new("draft_tool", "Draft a new tool for registration").with_parameters(
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "description": {"type": "string"},
                        "source": {"type": "string"},
                        "parameters": {"type": "object"},
                        "implementation": {"type": "string"}
                    }
                }),
            ),
        }
    }
}

#[async_trait]
impl Tool for DraftTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, params: &ParamMap, _ctx: &ExecutionContext) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return json!({"error": "a drafted tool needs a 'name'"});
        };
        let mut created = serde_json::Map::new();
        created.insert("name".into(), json!(name));
        for key in ["description", "source", "parameters", "implementation"] {
            if let Some(value) = params.get(key) {
                created.insert(key.to_string(), value.clone());
            }
        }
        json!({
            "success": true,
            "result": {"created_tool": Value::Object(created)},
            "energy_gain": 5.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambrian_core::exchange::ToolExchange;
    use cambrian_core::tool::run_tool;
    use std::time::Duration;

    fn ctx(exchange: Arc<ToolExchange>) -> ExecutionContext {
        ExecutionContext::root(exchange, "agent_1", 1, 5, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn square_composes_multiply_for_twelve() {
        let exchange = Arc::new(ToolExchange::new());
        exchange.register("agent_1", Arc::new(MultiplyTool::with_default_spec()));
        let square = SquareTool::with_default_spec();

        let mut params = ParamMap::new();
        params.insert("number".into(), json!(4));
        let ctx = ctx(exchange);
        let out = run_tool(&square, &params, &ctx, Duration::from_secs(2)).await;

        assert!(out.success);
        assert_eq!(out.payload, json!(16.0));
        assert_eq!(out.energy_delta, 12.0);
    }

    #[tokio::test]
    async fn square_accepts_the_legacy_x_alias() {
        let exchange = Arc::new(ToolExchange::new());
        exchange.register("agent_1", Arc::new(MultiplyTool::with_default_spec()));
        let square = SquareTool::with_default_spec();

        let mut params = ParamMap::new();
        params.insert("x".into(), json!(3));
        let ctx = ctx(exchange);
        let out = run_tool(&square, &params, &ctx, Duration::from_secs(2)).await;
        assert!(out.success);
        assert_eq!(out.payload, json!(9.0));
        assert_eq!(out.energy_delta, 12.0);
    }

    #[tokio::test]
    async fn square_without_multiply_fails_cleanly() {
        let square = SquareTool::with_default_spec();
        let mut params = ParamMap::new();
        params.insert("number".into(), json!(4));
        let ctx = ctx(Arc::new(ToolExchange::new()));
        let out = run_tool(&square, &params, &ctx, Duration::from_secs(2)).await;
        assert!(!out.success);
        assert!(out.error.unwrap().contains("not found"));
    }

    #[test]
    fn unknown_implementation_builds_nothing() {
        let kit = ToolKit::with_builtins();
        assert!(kit.build("teleport", ToolSpec::new("t", "d")).is_none());
        assert!(kit.build("multiply", ToolSpec::new("m", "d")).is_some());
        assert_eq!(
            kit.implementation_names(),
            vec!["add", "draft", "echo", "multiply", "square"]
        );
    }
}
