// Browser-facing status page for the MCP endpoint

use crate::state::McpRuntime;
use storybook_mcp::protocol::SUPPORTED_PROTOCOL_VERSIONS;
use storybook_mcp::AddonContext;
use storybook_mcp::McpHttpResponse;
use http::StatusCode;
use std::fmt::Write;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the status page shown when a browser opens `/mcp`
pub fn status_page(runtime: &McpRuntime, ctx: &AddonContext, endpoint: &str) -> McpHttpResponse {
    let mut tools = String::new();
    for schema in runtime.server.registry().list_schemas(ctx) {
        let _ = write!(
            tools,
            "<li><code>{}</code> {}</li>",
            escape(&schema.name),
            escape(&schema.description)
        );
    }
    if tools.is_empty() {
        tools.push_str("<li>No tools are enabled.</li>");
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Storybook MCP</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; max-width: 720px; margin: 48px auto; padding: 0 16px; color: #2e3438; }}
code, pre {{ background: #f6f9fc; border-radius: 4px; padding: 2px 4px; }}
pre {{ padding: 12px; overflow-x: auto; }}
li {{ margin: 6px 0; }}
.muted {{ color: #73828c; }}
</style>
</head>
<body>
<h1>Storybook MCP server is running</h1>
<p>Connect your agent to <code>{endpoint}</code>:</p>
<pre>{{ "mcpServers": {{ "storybook": {{ "type": "http", "url": "{endpoint}" }} }} }}</pre>
<h2>Tools</h2>
<ul>{tools}</ul>
<p class="muted">Storybook: {origin} &middot; toolsets: {toolsets} &middot; protocol {protocol} &middot; v{version}{auth}</p>
</body>
</html>
"#,
        endpoint = escape(endpoint),
        tools = tools,
        origin = escape(&runtime.origin),
        toolsets = ctx.toolsets.enabled_names().join(", "),
        protocol = SUPPORTED_PROTOCOL_VERSIONS[0],
        version = runtime.server.info().version,
        auth = if runtime.auth.requires_auth() {
            " &middot; authentication required"
        } else {
            ""
        },
    );

    McpHttpResponse::html(StatusCode::OK, html)
}
