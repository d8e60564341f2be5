use std::collections::BTreeMap;
use std::sync::Arc;

use crate::tool::{Tool, ToolDefinition};

/// Tools by unique name. Iteration is name-ordered, so the tool list sent to
/// the model is identical between runs.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.definition().name;
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Like [`get`](Self::get), but the error lists what is available.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::Unknown {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
    #[error("unknown tool '{name}'. Available: {available}")]
    Unknown { name: String, available: String },
}
