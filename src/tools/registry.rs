//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering tools and routing tool calls to handlers.
//! Every invocation produces a [`ToolCallResult`]; tool failures never
//! escape as `Err`.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;

use crate::core::{Result, ThreadkeepError, ToolCallResult, ToolDefinition, ToolsConfig};
use crate::tools::calculator::CalculatorTool;
use crate::tools::search::WebSearchTool;
use crate::tools::stock::StockPriceTool;
use crate::tools::validation::validate_arguments;

/// Default per-call timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A named capability the model may invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON schema advertised to the model
    fn definition(&self) -> &ToolDefinition;

    /// Run the tool with already-validated arguments
    async fn call(&self, args: Value) -> Result<Value>;
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;
type ToolHandler = dyn Fn(Value) -> ToolFuture + Send + Sync;

/// Closure-backed tool
pub struct FnTool {
    definition: ToolDefinition,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            definition: ToolDefinition::function(name, description, parameters),
            handler: Arc::new(move |args| -> ToolFuture { Box::pin(handler(args)) }),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Value) -> Result<Value> {
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.function.name)
            .finish()
    }
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a registry holding calculator, web search and stock price
    pub fn with_builtin_tools(config: &ToolsConfig) -> Result<Self> {
        let mut registry = Self::new().with_timeout(Duration::from_secs(config.timeout_secs));
        registry.register(CalculatorTool::new());
        registry.register(WebSearchTool::from_config(config)?);
        registry.register(StockPriceTool::from_config(config)?);
        Ok(registry)
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.definition().name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            tracing::debug!(tool = %name, "replaced registered tool");
        }
    }

    /// Register a plain async closure as a tool
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register(FnTool::new(name, description, parameters, handler));
    }

    /// Tool definitions sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| t.definition().clone())
            .collect();
        defs.sort_by(|a, b| a.name().cmp(b.name()));
        defs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// Unknown names, invalid arguments, tool errors, panics and timeouts
    /// all come back as an error result.
    pub async fn invoke(&self, name: &str, args: Value) -> ToolCallResult {
        let Some(tool) = self.tools.get(name).cloned() else {
            tracing::warn!(tool = %name, "model requested unknown tool");
            return ToolCallResult::error(format!("Unknown tool: {}", name));
        };

        if let Err(detail) = validate_arguments(&args, &tool.definition().function.parameters) {
            tracing::warn!(tool = %name, %detail, "rejected tool arguments");
            return ToolCallResult::error(format!("Invalid arguments for {}: {}", name, detail));
        }

        let call = AssertUnwindSafe(tool.call(args)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Ok(payload))) => ToolCallResult::success(payload),
            Ok(Ok(Err(e))) => {
                let message = error_text(e);
                tracing::warn!(tool = %name, error = %message, "tool failed");
                ToolCallResult::error(message)
            }
            Ok(Err(_)) => {
                tracing::error!(tool = %name, "tool panicked");
                ToolCallResult::error(format!("Tool '{}' panicked", name))
            }
            Err(_) => {
                tracing::warn!(tool = %name, timeout = ?self.timeout, "tool timed out");
                ToolCallResult::error(format!(
                    "Tool '{}' timed out after {}s",
                    name,
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Message recorded for a failed tool; tool errors carry their own wording
fn error_text(e: ThreadkeepError) -> String {
    match e {
        ThreadkeepError::ToolExecution(msg) => msg,
        other => other.to_string(),
    }
}
