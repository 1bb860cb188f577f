// Component documentation tools backed by the manifests of every source

use crate::composition::{ManifestClient, Source};
use crate::context::AddonContext;
use crate::error::McpError;
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_boolean, json_schema_object, json_schema_string, Tool};
use crate::toolsets::Toolset;
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use storybook_mcp_core::manifest::{format_component, format_doc, format_manifest_list};

/// Manifest access shared by the documentation tools
#[derive(Clone)]
pub struct DocsSources {
    manifests: ManifestClient,
    sources: Arc<Vec<Source>>,
}

impl DocsSources {
    pub fn new(manifests: ManifestClient, sources: Arc<Vec<Source>>) -> Self {
        Self { manifests, sources }
    }

    fn is_composed(&self) -> bool {
        self.sources.len() > 1
    }

    fn source(&self, id: &str) -> Result<&Source> {
        self.sources.iter().find(|s| s.id == id).ok_or_else(|| {
            let known: Vec<&str> = self.sources.iter().map(|s| s.id.as_str()).collect();
            anyhow!("Unknown Storybook \"{}\". Available: {}", id, known.join(", "))
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentationArgs {
    #[serde(default)]
    with_story_ids: bool,
}

/// Tool listing every documented component and docs page
pub struct ListDocumentationTool {
    docs: DocsSources,
}

impl ListDocumentationTool {
    pub fn new(docs: DocsSources) -> Self {
        Self { docs }
    }
}

#[async_trait::async_trait]
impl Tool for ListDocumentationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list-all-documentation".to_string(),
            title: Some("List all documentation".to_string()),
            description: "List all documented UI components and documentation pages. \
                          Use the returned ids with get-documentation."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "withStoryIds": json_schema_boolean("Include the story ids of every component")
                }),
                vec![],
            ),
        }
    }

    fn toolset(&self) -> Toolset {
        Toolset::Docs
    }

    fn is_enabled(&self, ctx: &AddonContext) -> bool {
        ctx.docs_available()
    }

    async fn execute(&self, ctx: &AddonContext, arguments: Value) -> Result<CallToolResult> {
        let args: ListDocumentationArgs = if arguments.is_null() {
            ListDocumentationArgs::default()
        } else {
            serde_json::from_value(arguments).context("Invalid arguments")?
        };
        let token = ctx.bearer_token.as_deref();

        if !self.docs.is_composed() {
            let manifest = self.docs.manifests.fetch(&self.docs.sources[0], token).await?;
            return Ok(CallToolResult::text(format_manifest_list(&manifest, args.with_story_ids)));
        }

        // One unreachable source is reported in its own section
        let mut sections = Vec::with_capacity(self.docs.sources.len());
        let mut failed = 0;
        for source in self.docs.sources.iter() {
            let body = match self.docs.manifests.fetch(source, token).await {
                Ok(manifest) => format_manifest_list(&manifest, args.with_story_ids),
                Err(e @ McpError::Unauthorized(_)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(source = %source.id, "Failed to load documentation: {}", e);
                    failed += 1;
                    format!("Error: Failed to load documentation: {}", e)
                }
            };
            sections.push(format!("## {} (storybookId: {})\n\n{}", source.title, source.id, body));
        }
        if failed == sections.len() {
            bail!("No Storybook documentation could be loaded:\n\n{}", sections.join("\n\n"));
        }
        Ok(CallToolResult::text(sections.join("\n\n")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetDocumentationArgs {
    id: String,
    #[serde(default)]
    storybook_id: Option<String>,
}

/// Tool rendering the documentation of one component or docs page
pub struct GetDocumentationTool {
    docs: DocsSources,
}

impl GetDocumentationTool {
    pub fn new(docs: DocsSources) -> Self {
        Self { docs }
    }
}

#[async_trait::async_trait]
impl Tool for GetDocumentationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get-documentation".to_string(),
            title: Some("Get documentation".to_string()),
            description: "Get the documentation of a UI component or documentation page: description, \
                          import statement, usage examples and props."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "id": json_schema_string("Component or docs id, as returned by list-all-documentation"),
                    "storybookId": json_schema_string("Storybook the entry belongs to, when several are composed")
                }),
                vec!["id"],
            ),
        }
    }

    fn toolset(&self) -> Toolset {
        Toolset::Docs
    }

    fn is_enabled(&self, ctx: &AddonContext) -> bool {
        ctx.docs_available()
    }

    async fn execute(&self, ctx: &AddonContext, arguments: Value) -> Result<CallToolResult> {
        let args: GetDocumentationArgs = serde_json::from_value(arguments).context("Invalid arguments")?;
        let token = ctx.bearer_token.as_deref();

        let candidates: Vec<&Source> = match &args.storybook_id {
            Some(id) => vec![self.docs.source(id)?],
            None => self.docs.sources.iter().collect(),
        };

        for source in candidates {
            let manifest = self.docs.manifests.fetch(source, token).await?;
            if let Some(component) = manifest.component(&args.id) {
                return Ok(CallToolResult::text(format_component(&component)));
            }
            if let Some(doc) = manifest.doc(&args.id) {
                return Ok(CallToolResult::text(format_doc(&doc)));
            }
        }

        bail!(
            "No component or docs entry found with id \"{}\". Use list-all-documentation to see the available ids.",
            args.id
        )
    }
}
