// ABOUTME: Toolbox - the name -> invocable mapping the agent loop dispatches through.
// ABOUTME: Built once from a filtered catalog; validates arguments before any call.

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::JSONSchema;

use super::{Tool, ToolResult};
use crate::catalog::ToolDescriptor;
use crate::error::{DiscoveryError, ToolError};
use crate::llm::ToolDefinition;
use crate::policy::{DenyList, FilteredCatalog};

/// Produces the invocable for a catalog entry.
///
/// Live MCP connections implement this; tests bind local tools.
pub trait ToolSource: Send + Sync {
    fn bind(&self, descriptor: &ToolDescriptor) -> Result<Arc<dyn Tool>, DiscoveryError>;
}

struct Binding {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
    validator: Option<JSONSchema>,
}

/// Immutable mapping from exposed tool name to invocable.
///
/// Can only be materialized from a [`FilteredCatalog`], so a denied name
/// never has a binding.
pub struct Toolbox {
    bindings: Vec<Binding>,
    index: HashMap<String, usize>,
    denylist: DenyList,
}

impl Toolbox {
    /// Bind every entry of `catalog` through `source`, compiling its input
    /// schema for argument validation.
    pub fn materialize(
        catalog: &FilteredCatalog,
        source: &dyn ToolSource,
    ) -> Result<Self, DiscoveryError> {
        let mut bindings = Vec::with_capacity(catalog.len());
        let mut index = HashMap::with_capacity(catalog.len());

        for descriptor in catalog.iter() {
            let tool = source.bind(descriptor)?;
            let validator = match JSONSchema::compile(&descriptor.input_schema) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    tracing::warn!(
                        tool = %descriptor.name,
                        error = %e,
                        "input schema does not compile, arguments will not be validated"
                    );
                    None
                }
            };

            index.insert(descriptor.name.clone(), bindings.len());
            bindings.push(Binding {
                descriptor: descriptor.clone(),
                tool,
                validator,
            });
        }

        Ok(Self {
            bindings,
            index,
            denylist: catalog.denylist().clone(),
        })
    }

    /// Get a tool by exposed name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.bindings[i].tool.clone())
    }

    /// Exposed names in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .map(|b| b.descriptor.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Tool definitions handed to the model, in catalog order.
    pub fn to_definitions(&self) -> Vec<ToolDefinition> {
        self.bindings
            .iter()
            .map(|b| ToolDefinition::from(&b.descriptor))
            .collect()
    }

    /// Check `arguments` against the tool's input schema.
    pub fn validate(&self, name: &str, arguments: &serde_json::Value) -> Result<(), ToolError> {
        let binding = self.lookup(name)?;
        let Some(validator) = &binding.validator else {
            return Ok(());
        };

        if let Err(errors) = validator.validate(arguments) {
            let reason = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            return Err(ToolError::Validation {
                tool: name.to_string(),
                reason,
            });
        }
        Ok(())
    }

    /// Resolve, validate and execute one call.
    ///
    /// Nothing reaches the tool unless the name is bound and the arguments
    /// pass validation.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let arguments = match arguments {
            serde_json::Value::Null => serde_json::json!({}),
            other => other,
        };

        self.validate(name, &arguments)?;
        let tool = self.lookup(name)?.tool.clone();

        tool.execute(arguments)
            .await
            .map_err(|source| ToolError::Execution {
                tool: name.to_string(),
                source,
            })
    }

    fn lookup(&self, name: &str) -> Result<&Binding, ToolError> {
        if self.denylist.contains(name) {
            return Err(ToolError::Denied(name.to_string()));
        }
        self.index
            .get(name)
            .map(|&i| &self.bindings[i])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }
}
