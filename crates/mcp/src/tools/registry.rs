// Tool trait and registry

use crate::context::AddonContext;
use crate::error::{McpError, McpResult};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::toolsets::Toolset;
use anyhow::Result;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Group the tool belongs to
    fn toolset(&self) -> Toolset;

    /// Whether the tool is visible and callable for this request
    fn is_enabled(&self, ctx: &AddonContext) -> bool {
        ctx.toolsets.is_enabled(self.toolset())
    }

    /// Execute the tool with given arguments
    async fn execute(&self, ctx: &AddonContext, arguments: serde_json::Value) -> Result<CallToolResult>;
}

/// Tool registry for managing available tools, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        self.tools.retain(|t| t.schema().name != name);
        self.tools.push(tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.schema().name == name).cloned()
    }

    /// Schemas of the tools enabled for this request
    pub fn list_schemas(&self, ctx: &AddonContext) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .filter(|t| t.is_enabled(ctx))
            .map(|t| t.schema())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool.
    ///
    /// Hidden and unknown tools are rejected. Handler failures become error
    /// results, except authentication failures which propagate so the
    /// transport can answer with a 401.
    pub async fn call(&self, ctx: &AddonContext, name: &str, arguments: serde_json::Value) -> McpResult<CallToolResult> {
        let tool = self
            .get(name)
            .filter(|t| t.is_enabled(ctx))
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        match tool.execute(ctx, arguments).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Some(McpError::Unauthorized(message)) =
                    e.chain().find_map(|cause| cause.downcast_ref::<McpError>())
                {
                    return Err(McpError::Unauthorized(message.clone()));
                }
                tracing::warn!(tool = %name, "Tool call failed: {:#}", e);
                Ok(CallToolResult::error(format!("{:#}", e)))
            }
        }
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: serde_json::Value, required: Vec<&str>) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_boolean(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "boolean",
        "description": description
    })
}

pub fn json_schema_array(items: serde_json::Value, description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "array",
        "items": items,
        "description": description
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HostConfig;
    use crate::toolsets::Toolsets;

    struct EchoTool {
        name: &'static str,
        toolset: Toolset,
    }

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name.to_string(),
                title: None,
                description: "Echo".to_string(),
                input_schema: json_schema_object(serde_json::json!({}), vec![]),
            }
        }

        fn toolset(&self) -> Toolset {
            self.toolset
        }

        async fn execute(&self, _ctx: &AddonContext, arguments: serde_json::Value) -> Result<CallToolResult> {
            match arguments.get("fail").and_then(|v| v.as_str()) {
                Some("auth") => Err(McpError::Unauthorized("token expired".to_string()).into()),
                Some(message) => anyhow::bail!("{}", message),
                None => Ok(CallToolResult::text("ok")),
            }
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "dev-tool", toolset: Toolset::Dev }));
        registry.register(Arc::new(EchoTool { name: "test-tool", toolset: Toolset::Test }));
        registry
    }

    fn ctx(header: Option<&str>) -> AddonContext {
        AddonContext::new("http://localhost:6006", Arc::new(HostConfig::default()))
            .with_toolsets(Toolsets::from_header(header, Toolsets::default()))
    }

    #[tokio::test]
    async fn test_hidden_tools_are_not_listed_or_callable() {
        let registry = registry();
        let names: Vec<String> = registry.list_schemas(&ctx(Some("dev"))).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["dev-tool"]);

        let err = registry
            .call(&ctx(Some("dev")), "test-tool", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_failures_become_error_results() {
        let registry = registry();
        let result = registry
            .call(&ctx(None), "dev-tool", serde_json::json!({ "fail": "boom" }))
            .await
            .unwrap();
        assert!(result.is_error());
        assert_eq!(result.text_content(), "Error: boom");

        let err = registry
            .call(&ctx(None), "dev-tool", serde_json::json!({ "fail": "auth" }))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Unauthorized(_)));
    }
}
