//! Runs expression tools by name.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::error::ExpressionError;
use super::language;
use super::store::ExpressionToolStore;
use crate::domains::plugins::{Capability, CapabilityProvider, PluginError};

/// Evaluates stored expression tools against caller-supplied arguments.
pub struct ExpressionExecutor {
    store: Arc<ExpressionToolStore>,
    max_expression_len: usize,
}

impl ExpressionExecutor {
    /// Declaring type reported in the catalog.
    pub const DECLARING_TYPE: &'static str = "core::ExpressionExecutor";

    pub fn new(store: Arc<ExpressionToolStore>, max_expression_len: usize) -> Self {
        Self {
            store,
            max_expression_len,
        }
    }

    /// Execute the tool called `tool_name`.
    ///
    /// Every entry of `args` is bound as a variable. Extra entries are
    /// ignored; a variable the expression needs but `args` lacks fails
    /// evaluation.
    #[instrument(skip(self, args), fields(tool = %tool_name))]
    pub fn execute(&self, tool_name: &str, args: &Map<String, Value>) -> Result<Value, ExpressionError> {
        if tool_name.trim().is_empty() {
            return Err(ExpressionError::invalid_input("tool name is blank"));
        }

        let tool = self
            .store
            .get(tool_name)
            .ok_or_else(|| ExpressionError::not_found(tool_name))?;

        let Some(expression) = tool.runnable_expression() else {
            return Err(ExpressionError::unsupported(tool_name));
        };

        debug!("Evaluating '{}' with {} argument(s)", expression, args.len());
        let result = language::evaluate(expression, args, self.max_expression_len)
            .map_err(|e| ExpressionError::evaluation(tool_name, e))?;
        debug!("Expression tool '{}' returned {}", tool_name, result);

        Ok(result)
    }
}

#[async_trait]
impl CapabilityProvider for ExpressionExecutor {
    fn declaring_type(&self) -> &str {
        Self::DECLARING_TYPE
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new(
            "executeDynamic",
            "Execute a registered expression tool by name. Arguments: toolName (string), args (object of named values).",
            "execute_dynamic",
        )]
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, PluginError> {
        if operation != "execute_dynamic" {
            return Err(PluginError::unknown_operation(Self::DECLARING_TYPE, operation));
        }

        let tool_name = arguments
            .get("toolName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let args = match arguments.get("args") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(PluginError::invalid_input("'args' must be an object"));
            }
        };

        self.execute(tool_name, &args)
            .map_err(|e| PluginError::rejected(operation, e.kind(), e.to_string()))
    }
}
