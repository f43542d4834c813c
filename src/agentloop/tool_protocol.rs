//! Tool abstraction and the execution boundary between tools and the loop.
//!
//! A [`Tool`] provides its name, description, a JSON Schema for its
//! parameters, and an async `execute`.  The same schema is rendered into each
//! provider's declaration shape by the `to_*_schema` views, so a tool is
//! written once and works against all four wire protocols.
//!
//! [`execute_tool`] is the single trust boundary between arbitrary tool code
//! and the agent: a failing tool is converted into a structured
//! [`ToolResult`] and can never kill the loop.
//!
//! # Implementing a tool
//!
//! ```rust
//! use agentloop::{Tool, ToolResult};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Tool for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Repeats the provided text."
//!     }
//!
//!     fn parameters(&self) -> Value {
//!         json!({
//!             "type": "object",
//!             "properties": {"text": {"type": "string"}},
//!             "required": ["text"]
//!         })
//!     }
//!
//!     async fn execute(
//!         &self,
//!         args: Value,
//!     ) -> Result<ToolResult, Box<dyn std::error::Error + Send + Sync>> {
//!         let text = args["text"].as_str().unwrap_or_default();
//!         Ok(ToolResult::ok(text))
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// `true` when the tool ran to completion.
    pub success: bool,
    /// Textual payload on success, empty otherwise.
    pub content: String,
    /// Human-readable reason on failure, `None` on success.
    pub error: Option<String>,
}

impl ToolResult {
    /// A successful result carrying `content`.
    pub fn ok(content: impl Into<String>) -> Self {
        ToolResult {
            success: true,
            content: content.into(),
            error: None,
        }
    }

    /// A failed result carrying an error description.
    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            content: String::new(),
            error: Some(error.into()),
        }
    }
}

/// A callable tool exposed to the LLM.
///
/// The four `to_*_schema` views have default implementations deriving the
/// provider shape from `name`/`description`/`parameters`; tools only override
/// them when a provider needs a hand-tuned declaration.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as it appears in provider tool declarations.
    fn name(&self) -> &str;

    /// Description surfaced to the LLM to aid tool selection.
    fn description(&self) -> &str;

    /// JSON Schema object describing the accepted arguments.
    fn parameters(&self) -> Value;

    /// Run the tool. `args` is the parsed argument mapping from the model.
    ///
    /// Tools may report domain failures by returning
    /// [`ToolResult::failure`]; an `Err` is reserved for unexpected faults
    /// and is wrapped by [`execute_tool`].
    async fn execute(&self, args: Value) -> Result<ToolResult, Box<dyn Error + Send + Sync>>;

    /// Anthropic Messages declaration: `{name, description, input_schema}`.
    fn to_anthropic_schema(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "input_schema": self.parameters(),
        })
    }

    /// Chat Completions declaration, nested under a `function` object.
    fn to_openai_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.parameters(),
            },
        })
    }

    /// Responses declaration: flat form with an explicit null `strict`.
    fn to_responses_schema(&self) -> Value {
        json!({
            "type": "function",
            "name": self.name(),
            "description": self.description(),
            "parameters": self.parameters(),
            "strict": Value::Null,
        })
    }

    /// Gemini function declaration; the JSON Schema flows through unchanged
    /// via `parametersJsonSchema`.
    fn to_gemini_schema(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "parametersJsonSchema": self.parameters(),
        })
    }
}

/// Look up `name` in `tools` and invoke it with `args`.
///
/// Failures never propagate: an unknown name or a tool `Err` is wrapped into
/// a failed [`ToolResult`] so the model can react to it in the next turn.
pub async fn execute_tool(tools: &[Arc<dyn Tool>], name: &str, args: Value) -> ToolResult {
    let Some(tool) = tools.iter().find(|tool| tool.name() == name) else {
        return ToolResult::failure(format!("Unknown tool: {}", name));
    };

    if log::log_enabled!(log::Level::Debug) {
        log::debug!("execute_tool: dispatching {}", name);
    }

    match tool.execute(args).await {
        Ok(result) => result,
        Err(err) => ToolResult::failure(format!(
            "Tool execution failed: {}: {}\n\nTraceback:\n{:?}",
            name, err, err
        )),
    }
}
