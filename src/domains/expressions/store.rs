//! In-memory store of user-declared expression tools.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ExpressionError;

/// A user-declared tool whose behavior is an expression over named
/// arguments.
///
/// `parameters` documents the expected argument names; it is not checked
/// against the expression. The `plugin_id`, `class_name` and `method_name`
/// fields describe an alternate binding that is stored but never executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExpressionTool {
    /// A tool with just a name and an expression.
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            expression: Some(expression.into()),
            parameters: Vec::new(),
            plugin_id: None,
            class_name: None,
            method_name: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder-style description setter.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder-style parameter list setter.
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// The expression text, if it is set and not blank.
    pub fn runnable_expression(&self) -> Option<&str> {
        self.expression.as_deref().filter(|e| !e.trim().is_empty())
    }
}

/// Keyed store of expression tools. Each operation is atomic per name.
#[derive(Debug, Default)]
pub struct ExpressionToolStore {
    tools: RwLock<HashMap<String, ExpressionTool>>,
}

impl ExpressionToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool whose name is not yet taken.
    pub fn add(&self, mut tool: ExpressionTool) -> Result<ExpressionTool, ExpressionError> {
        validate_name(&tool.name)?;

        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        if tools.contains_key(&tool.name) {
            return Err(ExpressionError::conflict(&tool.name));
        }

        let now = Utc::now();
        tool.created_at.get_or_insert(now);
        tool.updated_at.get_or_insert(now);
        tools.insert(tool.name.clone(), tool.clone());

        info!("Added expression tool '{}'", tool.name);
        Ok(tool)
    }

    /// Insert or replace a tool.
    ///
    /// The creation time is carried over from the stored tool unless the
    /// caller supplies one; the update time always moves forward.
    pub fn upsert(&self, mut tool: ExpressionTool) -> Result<ExpressionTool, ExpressionError> {
        validate_name(&tool.name)?;

        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        let previous = tools.get(&tool.name);
        let now = Utc::now();

        tool.created_at = tool
            .created_at
            .or_else(|| previous.and_then(|p| p.created_at))
            .or(Some(now));
        tool.updated_at = Some(match previous.and_then(|p| p.updated_at) {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        });

        let replaced = tools.insert(tool.name.clone(), tool.clone()).is_some();
        info!(
            "{} expression tool '{}'",
            if replaced { "Replaced" } else { "Added" },
            tool.name
        );
        Ok(tool)
    }

    /// Remove a tool, returning it if it was present.
    pub fn remove(&self, name: &str) -> Option<ExpressionTool> {
        let removed = self
            .tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_some() {
            info!("Removed expression tool '{}'", name);
        }
        removed
    }

    /// Snapshot of every stored tool, ordered by name.
    pub fn list(&self) -> Vec<ExpressionTool> {
        let mut tools: Vec<_> = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn get(&self, name: &str) -> Option<ExpressionTool> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

fn validate_name(name: &str) -> Result<(), ExpressionError> {
    if name.trim().is_empty() {
        return Err(ExpressionError::invalid_input("expression tool name is blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn test_add_then_list_contains_exactly_one() {
        let store = ExpressionToolStore::new();
        let stored = store.add(ExpressionTool::new("mul", "a * b")).unwrap();

        assert!(stored.created_at.is_some());
        assert_eq!(stored.created_at, stored.updated_at);

        let listed = store.list();
        assert_eq!(listed.iter().filter(|t| t.name == "mul").count(), 1);
        assert!(store.exists("mul"));
    }

    #[test]
    fn test_add_duplicate_conflicts_and_leaves_store_unchanged() {
        let store = ExpressionToolStore::new();
        let original = store.add(ExpressionTool::new("mul", "a * b")).unwrap();

        let err = store.add(ExpressionTool::new("mul", "a + b")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("mul"));
        assert_eq!(store.get("mul"), Some(original));
    }

    #[test]
    fn test_blank_name_is_invalid() {
        let store = ExpressionToolStore::new();
        let err = store.add(ExpressionTool::new("  ", "1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = store.upsert(ExpressionTool::new("", "1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_add_keeps_caller_timestamps() {
        let store = ExpressionToolStore::new();
        let created = Utc::now() - Duration::days(3);
        let mut tool = ExpressionTool::new("old", "1");
        tool.created_at = Some(created);

        let stored = store.add(tool).unwrap();
        assert_eq!(stored.created_at, Some(created));
        assert!(stored.updated_at.unwrap() > created);
    }

    #[test]
    fn test_upsert_preserves_created_at_and_advances_updated_at() {
        let store = ExpressionToolStore::new();
        let first = store.upsert(ExpressionTool::new("calc", "a + b")).unwrap();
        let mut last = first.clone();

        for expression in ["a - b", "a * b", "a / b"] {
            let next = store.upsert(ExpressionTool::new("calc", expression)).unwrap();
            assert_eq!(next.created_at, first.created_at);
            assert!(next.updated_at > last.updated_at);
            last = next;
        }
        assert_eq!(store.get("calc").unwrap().expression.as_deref(), Some("a / b"));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_upsert_honours_incoming_created_at() {
        let store = ExpressionToolStore::new();
        store.upsert(ExpressionTool::new("t", "1")).unwrap();

        let explicit = Utc::now() - Duration::hours(1);
        let mut tool = ExpressionTool::new("t", "2");
        tool.created_at = Some(explicit);
        assert_eq!(store.upsert(tool).unwrap().created_at, Some(explicit));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = ExpressionToolStore::new();
        store.add(ExpressionTool::new("keep", "1")).unwrap();

        assert!(store.remove("missing").is_none());
        assert_eq!(store.list().len(), 1);

        let removed = store.remove("keep").unwrap();
        assert_eq!(removed.name, "keep");
        assert!(!store.exists("keep"));
    }

    #[test]
    fn test_concurrent_adds_of_same_name_admit_one() {
        let store = Arc::new(ExpressionToolStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.add(ExpressionTool::new("race", format!("{i}"))).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let tool: ExpressionTool = serde_json::from_value(serde_json::json!({
            "name": "mul",
            "expression": "#a * #b",
            "parameters": ["a", "b"],
            "pluginId": "p-1"
        }))
        .unwrap();
        assert_eq!(tool.parameters, vec!["a", "b"]);
        assert_eq!(tool.plugin_id.as_deref(), Some("p-1"));
        assert!(tool.created_at.is_none());
    }
}
