mod docs;
mod instructions;
mod preview;
mod registry;

pub use docs::{DocsSources, GetDocumentationTool, ListDocumentationTool};
pub use instructions::StoryInstructionsTool;
pub use preview::{GetStoryUrlsTool, PreviewStoriesTool, StoryLookup, PREVIEW_RESOURCE_URI};
pub use registry::{
    json_schema_array, json_schema_boolean, json_schema_object, json_schema_string, Tool,
    ToolRegistry,
};
pub use run_tests::RunStoryTestsTool;

use std::sync::Arc;
use storybook_mcp_core::channel::EventChannel;
use storybook_mcp_core::test_run::TestRunCoordinator;

/// Collaborators the built-in tools are constructed from
#[derive(Clone)]
pub struct ToolServices {
    pub stories: StoryLookup,
    pub channel: Option<Arc<dyn EventChannel>>,
    pub coordinator: Arc<TestRunCoordinator>,
    pub docs: DocsSources,
}

impl ToolRegistry {
    /// Registry with every built-in tool, in listing order
    pub fn with_builtin_tools(services: ToolServices) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PreviewStoriesTool::new(services.stories.clone())));
        registry.register(Arc::new(GetStoryUrlsTool::new(services.stories.clone())));
        registry.register(Arc::new(StoryInstructionsTool::new()));
        registry.register(Arc::new(RunStoryTestsTool::new(
            services.stories,
            services.channel,
            services.coordinator,
        )));
        registry.register(Arc::new(ListDocumentationTool::new(services.docs.clone())));
        registry.register(Arc::new(GetDocumentationTool::new(services.docs)));
        tracing::debug!("Registered {} tools", registry.len());
        registry
    }
}
