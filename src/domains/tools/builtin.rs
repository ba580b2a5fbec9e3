//! Built-in core capabilities.

use async_trait::async_trait;
use chrono::Local;
use serde_json::{Value, json};

use crate::core::error::ErrorKind;
use crate::domains::plugins::{Capability, CapabilityProvider, PluginError};

/// Static capabilities that ship with the server.
pub struct BuiltinToolsProvider;

impl BuiltinToolsProvider {
    /// Declaring type reported in the catalog.
    pub const DECLARING_TYPE: &'static str = "core::BuiltinTools";

    /// Current local time as `HH:MM:SS`.
    pub fn current_time() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }

    /// Integer sum, failing on overflow.
    pub fn add_numbers(a: i64, b: i64) -> Result<i64, PluginError> {
        a.checked_add(b).ok_or_else(|| {
            PluginError::rejected("add_numbers", ErrorKind::InvalidInput, "sum overflows a 64-bit integer")
        })
    }
}

#[async_trait]
impl CapabilityProvider for BuiltinToolsProvider {
    fn declaring_type(&self) -> &str {
        Self::DECLARING_TYPE
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new(
                "getCurrentTime",
                "Returns the current local time as HH:MM:SS.",
                "current_time",
            ),
            Capability::new(
                "addNumbers",
                "Adds two integers. Arguments: a (integer), b (integer).",
                "add_numbers",
            ),
        ]
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, PluginError> {
        match operation {
            "current_time" => Ok(json!(Self::current_time())),
            "add_numbers" => {
                let a = integer_argument(&arguments, "a")?;
                let b = integer_argument(&arguments, "b")?;
                Ok(json!(Self::add_numbers(a, b)?))
            }
            _ => Err(PluginError::unknown_operation(Self::DECLARING_TYPE, operation)),
        }
    }
}

fn integer_argument(arguments: &Value, key: &str) -> Result<i64, PluginError> {
    arguments
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| PluginError::invalid_input(format!("'{key}' must be an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_numbers() {
        let result = BuiltinToolsProvider
            .invoke("add_numbers", json!({"a": 2, "b": 40}))
            .await
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn test_add_numbers_rejects_non_integers() {
        let err = BuiltinToolsProvider
            .invoke("add_numbers", json!({"a": 2.5, "b": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = BuiltinToolsProvider
            .invoke("add_numbers", json!({"a": i64::MAX, "b": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_current_time_format() {
        let value = BuiltinToolsProvider
            .invoke("current_time", Value::Null)
            .await
            .unwrap();
        let time = value.as_str().unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.as_bytes()[2], b':');
        assert_eq!(time.as_bytes()[5], b':');
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let err = BuiltinToolsProvider.invoke("nope", Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
