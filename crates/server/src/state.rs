// Application state and the lazily built MCP runtime

use crate::config::ServerConfig;
use crate::websocket::HostChannel;
use anyhow::{Context, Result};
use std::sync::Arc;
use storybook_mcp::composition::{build_sources, CompositionAuth, ManifestClient};
use storybook_mcp::context::{AddonContext, HostConfig};
use storybook_mcp::index::HttpStoryIndex;
use storybook_mcp::tools::{DocsSources, StoryLookup, ToolRegistry, ToolServices};
use storybook_mcp::toolsets::{Toolsets, TOOLSETS_HEADER};
use storybook_mcp::{McpHttpRequest, McpServer};
use storybook_mcp_core::channel::EventChannel;
use storybook_mcp_core::test_run::TestRunCoordinator;
use tokio::sync::OnceCell;
use url::Url;

/// Everything built once on the first protocol request
pub struct McpRuntime {
    pub server: McpServer,
    pub origin: String,
    pub host: Arc<HostConfig>,
    pub auth: Arc<CompositionAuth>,
    default_toolsets: Toolsets,
    disable_telemetry: bool,
}

impl McpRuntime {
    async fn build(config: &ServerConfig, channel: Arc<HostChannel>, client: reqwest::Client) -> Result<Self> {
        let origin = Url::parse(&config.origin).context("Invalid Storybook origin")?;
        let sources = build_sources(&config.title, &config.refs);

        let auth = if sources.len() > 1 {
            tracing::info!("Discovering authentication of {} composed sources", sources.len() - 1);
            CompositionAuth::discover(&client, &sources).await
        } else {
            CompositionAuth::none()
        };
        let auth = Arc::new(auth);

        let index = HttpStoryIndex::new(client.clone(), &origin)?;
        let channel: Arc<dyn EventChannel> = channel;
        let services = ToolServices {
            stories: StoryLookup::new(Arc::new(index), config.project_root()?),
            channel: Some(channel),
            coordinator: Arc::new(TestRunCoordinator::new(config.test_run_timeout())),
            docs: DocsSources::new(
                ManifestClient::new(client, &origin, auth.clone()),
                Arc::new(sources),
            ),
        };

        let server = McpServer::new(ToolRegistry::with_builtin_tools(services)).with_auth(auth.clone());
        tracing::info!(
            origin = %config.origin,
            tools = server.registry().len(),
            auth_required = auth.requires_auth(),
            "MCP server initialized"
        );

        Ok(Self {
            server,
            origin: config.origin.trim_end_matches('/').to_string(),
            host: Arc::new(config.host_config()),
            auth,
            default_toolsets: config.toolsets,
            disable_telemetry: config.disable_telemetry,
        })
    }

    /// Fresh per-request context
    pub fn context_for(&self, request: &McpHttpRequest) -> AddonContext {
        AddonContext::new(self.origin.clone(), self.host.clone())
            .with_toolsets(Toolsets::from_header(request.header(TOOLSETS_HEADER), self.default_toolsets))
            .with_telemetry_disabled(self.disable_telemetry)
            .with_bearer_token(request.bearer_token())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub channel: Arc<HostChannel>,
    client: reqwest::Client,
    runtime: Arc<OnceCell<Arc<McpRuntime>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            channel: Arc::new(HostChannel::default()),
            client: reqwest::Client::new(),
            runtime: Arc::new(OnceCell::new()),
        }
    }

    /// The MCP runtime, built on first use. Concurrent first callers await
    /// the same construction; a failed build is retried by the next caller.
    pub async fn runtime(&self) -> Result<Arc<McpRuntime>> {
        let runtime = self
            .runtime
            .get_or_try_init(|| async {
                McpRuntime::build(&self.config, self.channel.clone(), self.client.clone())
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(runtime.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runtime_is_built_once() {
        let state = AppState::new(ServerConfig::default());
        let (a, b) = tokio::join!(state.runtime(), state.runtime());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.auth.requires_auth());
        assert_eq!(a.origin, "http://localhost:6006");
    }

    #[tokio::test]
    async fn test_context_uses_header_and_defaults() {
        let config = ServerConfig {
            toolsets: Toolsets {
                dev: true,
                docs: false,
                test: false,
            },
            disable_telemetry: true,
            ..Default::default()
        };
        let runtime = AppState::new(config).runtime().await.unwrap();

        let mut headers = http::HeaderMap::new();
        headers.insert("host", "localhost:6007".parse().unwrap());
        let request =
            McpHttpRequest::from_parts(http::Method::POST, &"/mcp".parse().unwrap(), headers.clone(), Default::default())
                .unwrap();
        let ctx = runtime.context_for(&request);
        assert!(ctx.toolsets.dev && !ctx.toolsets.test);
        assert!(ctx.disable_telemetry);
        assert_eq!(ctx.origin, "http://localhost:6006");

        headers.insert(TOOLSETS_HEADER, "test".parse().unwrap());
        let request =
            McpHttpRequest::from_parts(http::Method::POST, &"/mcp".parse().unwrap(), headers, Default::default())
                .unwrap();
        let ctx = runtime.context_for(&request);
        assert!(!ctx.toolsets.dev && ctx.toolsets.test);
    }
}
