// Story preview tools

use crate::context::AddonContext;
use crate::index::StoryIndexSource;
use crate::protocol::{CallToolResult, ToolContent, ToolSchema};
use crate::tools::{json_schema_array, json_schema_object, json_schema_string, Tool};
use crate::toolsets::Toolset;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write;
use std::sync::Arc;
use storybook_mcp_core::resolve::resolve_stories;
use storybook_mcp_core::urls::{iframe_url, preview_url};
use storybook_mcp_core::{ResolvedStory, StoryInput};

/// URI of the embedded preview resource
pub const PREVIEW_RESOURCE_URI: &str = "ui://storybook-mcp/preview-stories";

#[derive(Debug, Deserialize)]
pub(crate) struct StoriesArgs {
    pub stories: Vec<StoryInput>,
}

/// JSON schema of a single story reference
pub(crate) fn story_input_schema() -> Value {
    let props = json!({
        "type": "object",
        "description": "Optional args to render the story with",
        "additionalProperties": true
    });
    let globals = json!({
        "type": "object",
        "description": "Optional globals, e.g. theme or locale",
        "additionalProperties": true
    });
    json!({
        "anyOf": [
            {
                "type": "object",
                "properties": {
                    "exportName": json_schema_string("Name of the story export in the story file"),
                    "absoluteStoryPath": json_schema_string("Absolute path of the story file"),
                    "explicitStoryName": json_schema_string(
                        "Display name of the story, when it is set explicitly with `name`"
                    ),
                    "props": props,
                    "globals": globals
                },
                "required": ["exportName", "absoluteStoryPath"]
            },
            {
                "type": "object",
                "properties": {
                    "storyId": json_schema_string("Story id, e.g. `button--primary`"),
                    "props": props,
                    "globals": globals
                },
                "required": ["storyId"]
            }
        ]
    })
}

fn stories_schema(description: &str) -> Value {
    json_schema_object(
        json!({ "stories": json_schema_array(story_input_schema(), description) }),
        vec!["stories"],
    )
}

/// Resolves story references against a fresh index snapshot
#[derive(Clone)]
pub struct StoryLookup {
    index: Arc<dyn StoryIndexSource>,
    cwd: String,
}

impl StoryLookup {
    pub fn new(index: Arc<dyn StoryIndexSource>, cwd: impl Into<String>) -> Self {
        Self {
            index,
            cwd: cwd.into(),
        }
    }

    pub async fn resolve(&self, inputs: &[StoryInput]) -> Result<Vec<ResolvedStory>> {
        let index = self.index.fetch().await.context("Failed to fetch the story index")?;
        Ok(resolve_stories(&index, inputs, &self.cwd))
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn preview_html(origin: &str, resolved: &[ResolvedStory]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\
         body{font-family:sans-serif;margin:0;padding:8px}\
         section{margin-bottom:16px}\
         h2{font-size:14px;margin:4px 0}\
         iframe{width:100%;height:400px;border:1px solid #ddd;border-radius:4px}\
         </style>\n</head>\n<body>\n",
    );
    for story in resolved.iter().filter_map(ResolvedStory::found) {
        let _ = write!(
            html,
            "<section>\n<h2>{} / {}</h2>\n<iframe src=\"{}\" title=\"{}\"></iframe>\n</section>\n",
            escape_html(&story.title),
            escape_html(&story.name),
            escape_html(&iframe_url(origin, story)),
            escape_html(&story.id),
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Tool returning preview links plus an embeddable preview of each story
pub struct PreviewStoriesTool {
    lookup: StoryLookup,
}

impl PreviewStoriesTool {
    pub fn new(lookup: StoryLookup) -> Self {
        Self { lookup }
    }
}

#[async_trait::async_trait]
impl Tool for PreviewStoriesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "preview-stories".to_string(),
            title: Some("Preview stories".to_string()),
            description: "Use this tool to preview one or more stories, rendering them as an \
                          interactive preview and returning a link to each one. Always include the \
                          returned URLs in your response so the user can open them."
                .to_string(),
            input_schema: stories_schema("Stories to preview"),
        }
    }

    fn toolset(&self) -> Toolset {
        Toolset::Dev
    }

    async fn execute(&self, ctx: &AddonContext, arguments: Value) -> Result<CallToolResult> {
        let args: StoriesArgs = serde_json::from_value(arguments).context("Invalid arguments")?;
        let resolved = self.lookup.resolve(&args.stories).await?;

        let mut lines = Vec::with_capacity(resolved.len());
        let mut structured = Vec::with_capacity(resolved.len());
        for story in &resolved {
            match story {
                ResolvedStory::Found(found) => {
                    let url = preview_url(&ctx.origin, found);
                    lines.push(format!("{} - {}: {}", found.title, found.name, url));
                    structured.push(json!({
                        "title": found.title,
                        "name": found.name,
                        "previewUrl": url,
                    }));
                }
                ResolvedStory::Missing { input, error } => {
                    lines.push(error.clone());
                    structured.push(json!({ "input": input, "error": error }));
                }
            }
        }

        let found = resolved.iter().filter(|s| s.is_found()).count();
        tracing::debug!(requested = resolved.len(), found, "Resolved stories for preview");

        let mut result = CallToolResult::text(lines.join("\n")).with_structured(json!({ "stories": structured }));
        if found > 0 {
            result = result.with_content(ToolContent::resource(
                PREVIEW_RESOURCE_URI,
                "text/html",
                preview_html(&ctx.origin, &resolved),
            ));
        }
        Ok(result)
    }
}

/// Text-only variant of [`PreviewStoriesTool`]
pub struct GetStoryUrlsTool {
    lookup: StoryLookup,
}

impl GetStoryUrlsTool {
    pub fn new(lookup: StoryLookup) -> Self {
        Self { lookup }
    }
}

#[async_trait::async_trait]
impl Tool for GetStoryUrlsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get-story-urls".to_string(),
            title: Some("Get story URLs".to_string()),
            description: "Get the URLs of one or more stories so the user can open them in Storybook."
                .to_string(),
            input_schema: stories_schema("Stories to link to"),
        }
    }

    fn toolset(&self) -> Toolset {
        Toolset::Dev
    }

    async fn execute(&self, ctx: &AddonContext, arguments: Value) -> Result<CallToolResult> {
        let args: StoriesArgs = serde_json::from_value(arguments).context("Invalid arguments")?;
        let resolved = self.lookup.resolve(&args.stories).await?;

        let lines: Vec<String> = resolved
            .iter()
            .map(|story| match story {
                ResolvedStory::Found(found) => preview_url(&ctx.origin, found),
                ResolvedStory::Missing { error, .. } => error.clone(),
            })
            .collect();
        Ok(CallToolResult::text(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HostConfig;
    use crate::error::McpResult;
    use storybook_mcp_core::{EntryType, StoryIndex, StoryIndexEntry};

    struct FixedIndex(StoryIndex);

    #[async_trait::async_trait]
    impl StoryIndexSource for FixedIndex {
        async fn fetch(&self) -> McpResult<StoryIndex> {
            Ok(self.0.clone())
        }
    }

    fn lookup() -> StoryLookup {
        let index = StoryIndex::new(vec![StoryIndexEntry {
            id: "button--primary".to_string(),
            title: "Button".to_string(),
            name: "Primary".to_string(),
            import_path: "./src/Button.stories.tsx".to_string(),
            tags: vec![],
            entry_type: EntryType::Story,
        }]);
        StoryLookup::new(Arc::new(FixedIndex(index)), "/repo")
    }

    fn ctx() -> AddonContext {
        AddonContext::new("http://localhost:6006", Arc::new(HostConfig::default()))
    }

    #[tokio::test]
    async fn test_preview_stories() {
        let tool = PreviewStoriesTool::new(lookup());
        let result = tool
            .execute(
                &ctx(),
                json!({
                    "stories": [
                        { "exportName": "Primary", "absoluteStoryPath": "/repo/src/Button.stories.tsx" },
                        { "storyId": "button--missing" }
                    ]
                }),
            )
            .await
            .unwrap();

        assert!(!result.is_error());
        let structured = result.structured_content.as_ref().unwrap();
        assert_eq!(
            structured["stories"][0],
            json!({
                "title": "Button",
                "name": "Primary",
                "previewUrl": "http://localhost:6006/?path=/story/button--primary"
            })
        );
        assert_eq!(structured["stories"][1]["input"]["storyId"], "button--missing");
        assert!(structured["stories"][1]["error"].as_str().unwrap().contains("button--missing"));

        match &result.content[1] {
            ToolContent::Resource { resource } => {
                assert_eq!(resource.uri, PREVIEW_RESOURCE_URI);
                assert!(resource
                    .text
                    .contains("http://localhost:6006/iframe.html?id=button--primary&amp;viewMode=story"));
            }
            other => panic!("expected resource, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_story_urls_with_args() {
        let tool = GetStoryUrlsTool::new(lookup());
        let result = tool
            .execute(
                &ctx(),
                json!({ "stories": [{ "storyId": "button--primary", "props": { "label": "Hi there" } }] }),
            )
            .await
            .unwrap();
        assert_eq!(
            result.text_content(),
            "http://localhost:6006/?path=/story/button--primary&args=label:Hi+there"
        );
        assert_eq!(result.content.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail() {
        let tool = GetStoryUrlsTool::new(lookup());
        assert!(tool.execute(&ctx(), json!({})).await.is_err());
    }
}
