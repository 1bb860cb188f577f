// Guidance for agents writing stories

use crate::context::{AddonContext, TEST_ADDON};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, Tool};
use crate::toolsets::Toolset;
use anyhow::Result;
use serde_json::Value;

const WRITING_STORIES: &str = "\
# Writing stories

- Stories live next to their component in a `*.stories.tsx` (or `.ts`, `.jsx`, `.js`) file.
- Use Component Story Format 3: a default export with `component` and `title`, and one named export per story.
- Prefer `args` over hand-written render functions, so controls and URL args keep working.
- Name exports in PascalCase. Storybook derives the display name from the export, so `WithLongLabel` is shown as \"With Long Label\". Set `name` explicitly only when the derived name is wrong.
- Cover the meaningful states of the component (default, disabled, loading, error, empty) with one story each.
- Use `play` functions with `storybook/test` for interactions and assertions instead of separate test files.
- Do not fetch real data in stories. Mock network and module dependencies.
";

const PREVIEWING: &str = "\
# Previewing stories

After creating or changing a story or the component it renders, call `preview-stories` with every affected story. \
Reference stories by `exportName` and `absoluteStoryPath`, or by `storyId` when you know it. \
Always share the returned preview URLs with the user. Use `get-story-urls` when only links are needed.
";

const TESTING: &str = "\
# Testing stories

Run `run-story-tests` with the stories you changed to execute their component tests in the browser. \
Omit `stories` to run every story. Fix failing stories before finishing your task and run the tests again.
";

const ACCESSIBILITY: &str = "\
Accessibility checks run together with the component tests. Treat reported violations as failures: \
fix the markup, labels, or contrast of the component rather than disabling the rule.
";

const DOCUMENTATION: &str = "\
# Component documentation

Before using a component you did not write, call `list-all-documentation` to find it and \
`get-documentation` to read its props, import path, and usage examples. Prefer existing components over new ones.
";

/// Tool returning guidance for writing, previewing and testing stories
pub struct StoryInstructionsTool;

impl StoryInstructionsTool {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the instructions for the capabilities of this request
    pub fn instructions(ctx: &AddonContext) -> String {
        let mut sections = vec![WRITING_STORIES.to_string(), PREVIEWING.to_string()];

        if ctx.toolsets.test {
            if ctx.host.test_addon_installed() {
                let mut testing = TESTING.to_string();
                if ctx.host.a11y_addon_installed() {
                    testing.push('\n');
                    testing.push_str(ACCESSIBILITY);
                }
                sections.push(testing);
            } else {
                tracing::debug!("Test instructions omitted, {} is not installed", TEST_ADDON);
            }
        }

        if ctx.docs_available() {
            sections.push(DOCUMENTATION.to_string());
        }

        sections.join("\n")
    }
}

impl Default for StoryInstructionsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for StoryInstructionsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get-storybook-story-instructions".to_string(),
            title: Some("Storybook story instructions".to_string()),
            description: "Get instructions for writing, previewing and testing Storybook stories. \
                          Call this before creating or editing any story or UI component."
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    fn toolset(&self) -> Toolset {
        Toolset::Dev
    }

    async fn execute(&self, ctx: &AddonContext, _arguments: Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(Self::instructions(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{HostConfig, A11Y_ADDON};
    use crate::toolsets::Toolsets;
    use std::sync::Arc;

    fn ctx(addons: &[&str], header: Option<&str>) -> AddonContext {
        let host = HostConfig {
            addons: addons.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        };
        AddonContext::new("http://localhost:6006", Arc::new(host))
            .with_toolsets(Toolsets::from_header(header, Toolsets::default()))
    }

    #[test]
    fn test_testing_section_requires_addon_and_toolset() {
        let text = StoryInstructionsTool::instructions(&ctx(&[], None));
        assert!(text.contains("# Writing stories"));
        assert!(!text.contains("run-story-tests"));

        let text = StoryInstructionsTool::instructions(&ctx(&[TEST_ADDON, A11Y_ADDON], None));
        assert!(text.contains("run-story-tests"));
        assert!(text.contains("Accessibility checks"));

        let text = StoryInstructionsTool::instructions(&ctx(&[TEST_ADDON], Some("dev")));
        assert!(!text.contains("run-story-tests"));
    }

    #[test]
    fn test_documentation_section_requires_manifest_feature() {
        let text = StoryInstructionsTool::instructions(&ctx(&[], None));
        assert!(!text.contains("list-all-documentation"));
    }
}
