// MCP server: JSON-RPC dispatch over standard HTTP request/response values

use crate::composition::CompositionAuth;
use crate::context::AddonContext;
use crate::error::McpError;
use crate::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolsCapability,
};
use crate::session::SessionStore;
use crate::telemetry::{Telemetry, TelemetryEvent, TracingTelemetry};
use crate::tools::ToolRegistry;
use crate::transport::{McpHttpRequest, McpHttpResponse, SESSION_HEADER};
use http::header::{self, HeaderName};
use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

/// Outcome of dispatching one JSON-RPC request
enum Dispatch {
    Reply(Result<Value, JsonRpcError>),
    Initialized { result: Value, session_id: String },
    Unauthorized(String),
}

pub struct McpServer {
    registry: Arc<ToolRegistry>,
    sessions: SessionStore,
    telemetry: Arc<dyn Telemetry>,
    auth: Arc<CompositionAuth>,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: SessionStore::new(),
            telemetry: Arc::new(TracingTelemetry),
            auth: Arc::new(CompositionAuth::none()),
            info: ServerInfo {
                name: "storybook-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_auth(mut self, auth: Arc<CompositionAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn auth(&self) -> &CompositionAuth {
        &self.auth
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Handle one request to the protocol endpoint
    pub async fn handle(&self, request: McpHttpRequest, ctx: AddonContext) -> McpHttpResponse {
        if self.auth.requires_auth() && ctx.bearer_token.is_none() {
            return self.unauthorized(&request.origin(), "A bearer token is required");
        }

        match request.method {
            Method::POST | Method::GET => self.handle_message(&request, &ctx).await,
            Method::DELETE => self.terminate_session(&request),
            _ => McpHttpResponse::empty(StatusCode::METHOD_NOT_ALLOWED)
                .with_header(header::ALLOW, "GET, POST, DELETE"),
        }
    }

    async fn handle_message(&self, request: &McpHttpRequest, ctx: &AddonContext) -> McpHttpResponse {
        let message: JsonRpcRequest = match serde_json::from_slice(&request.body) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Rejecting unparseable JSON-RPC message: {}", e);
                return respond(
                    request,
                    StatusCode::BAD_REQUEST,
                    &JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()),
                );
            }
        };

        let id = message.id.clone().unwrap_or(Value::Null);
        if message.jsonrpc != "2.0" {
            return respond(
                request,
                StatusCode::BAD_REQUEST,
                &JsonRpcResponse::error(id, JsonRpcError::invalid_request("jsonrpc must be \"2.0\"")),
            );
        }

        if message.method != "initialize" {
            if let Some(session_id) = request.header(SESSION_HEADER) {
                if !self.sessions.touch(session_id) {
                    tracing::debug!(session = %session_id, "Unknown session");
                    return respond(
                        request,
                        StatusCode::NOT_FOUND,
                        &JsonRpcResponse::error(id, JsonRpcError::invalid_request("Session not found")),
                    );
                }
            }
        }

        if message.is_notification() {
            tracing::debug!(method = %message.method, "Notification received");
            return McpHttpResponse::empty(StatusCode::ACCEPTED);
        }

        match self.dispatch(&message, ctx).await {
            Dispatch::Reply(Ok(result)) => {
                respond(request, StatusCode::OK, &JsonRpcResponse::success(id, result))
            }
            Dispatch::Reply(Err(error)) => {
                respond(request, StatusCode::OK, &JsonRpcResponse::error(id, error))
            }
            Dispatch::Initialized { result, session_id } => {
                respond(request, StatusCode::OK, &JsonRpcResponse::success(id, result))
                    .with_header(HeaderName::from_static(SESSION_HEADER), &session_id)
            }
            Dispatch::Unauthorized(message) => self.unauthorized(&request.origin(), &message),
        }
    }

    async fn dispatch(&self, message: &JsonRpcRequest, ctx: &AddonContext) -> Dispatch {
        let params = message.params.clone().unwrap_or(Value::Null);
        match message.method.as_str() {
            "initialize" => self.initialize(params, ctx).await,
            "ping" => Dispatch::Reply(Ok(json!({}))),
            "tools/list" => {
                let result = ListToolsResult {
                    tools: self.registry.list_schemas(ctx),
                };
                Dispatch::Reply(to_value(&result))
            }
            "tools/call" => self.call_tool(params, ctx).await,
            method => Dispatch::Reply(Err(JsonRpcError::method_not_found(method))),
        }
    }

    async fn initialize(&self, params: Value, ctx: &AddonContext) -> Dispatch {
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Dispatch::Reply(Err(JsonRpcError::invalid_params(e.to_string()))),
        };

        let version = negotiate_protocol_version(&params.protocol_version);
        let session = self.sessions.create(version, params.client_info.clone());
        tracing::info!(
            session = %session.id,
            client = %params.client_info.name,
            protocol_version = %version,
            "MCP session initialized"
        );

        if !ctx.disable_telemetry {
            self.telemetry
                .record(TelemetryEvent::new(
                    "mcp-session-initialized",
                    json!({
                        "client": params.client_info.name,
                        "clientVersion": params.client_info.version,
                        "protocolVersion": version,
                        "toolsets": ctx.toolsets.enabled_names(),
                    }),
                ))
                .await;
        }

        let result = InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: self.info.clone(),
        };
        match to_value(&result) {
            Ok(result) => Dispatch::Initialized {
                result,
                session_id: session.id,
            },
            Err(e) => Dispatch::Reply(Err(e)),
        }
    }

    async fn call_tool(&self, params: Value, ctx: &AddonContext) -> Dispatch {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Dispatch::Reply(Err(JsonRpcError::invalid_params(e.to_string()))),
        };

        tracing::debug!(tool = %params.name, "Calling tool");
        match self.registry.call(ctx, &params.name, params.arguments).await {
            Ok(result) => Dispatch::Reply(to_value(&result)),
            Err(McpError::ToolNotFound(name)) => {
                Dispatch::Reply(Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", name))))
            }
            Err(McpError::Unauthorized(message)) if self.auth.requires_auth() => {
                Dispatch::Unauthorized(message)
            }
            Err(e) => Dispatch::Reply(to_value(&CallToolResult::error(e))),
        }
    }

    fn terminate_session(&self, request: &McpHttpRequest) -> McpHttpResponse {
        match request.header(SESSION_HEADER) {
            None => McpHttpResponse::empty(StatusCode::BAD_REQUEST),
            Some(session_id) if self.sessions.remove(session_id) => {
                tracing::info!(session = %session_id, "MCP session terminated");
                McpHttpResponse::empty(StatusCode::OK)
            }
            Some(_) => McpHttpResponse::empty(StatusCode::NOT_FOUND),
        }
    }

    /// 401 pointing the client at this server's own discovery document
    fn unauthorized(&self, origin: &str, message: &str) -> McpHttpResponse {
        tracing::debug!("Rejecting unauthenticated request: {}", message);
        McpHttpResponse::json(
            StatusCode::UNAUTHORIZED,
            &json!({ "error": "unauthorized", "error_description": message }),
        )
        .with_header(header::WWW_AUTHENTICATE, &self.auth.challenge_header(origin))
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

/// Frame as a server-sent event when the client accepts one, plain JSON otherwise
fn respond(request: &McpHttpRequest, status: StatusCode, body: &JsonRpcResponse) -> McpHttpResponse {
    if request.accepts_event_stream() {
        McpHttpResponse::event_stream(status, body)
    } else {
        McpHttpResponse::json(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{AuthRequirement, AuthorizationServerMetadata, ResourceMetadata};
    use crate::context::HostConfig;
    use crate::telemetry::testing::RecordingTelemetry;
    use bytes::Bytes;
    use http::HeaderMap;
    use url::Url;

    fn request(method: Method, headers: &[(&str, &str)], body: Value) -> McpHttpRequest {
        let mut map = HeaderMap::new();
        map.insert("host", "localhost:6006".parse().unwrap());
        for (name, value) in headers {
            map.insert(http::HeaderName::from_bytes(name.as_bytes()).unwrap(), value.parse().unwrap());
        }
        McpHttpRequest::from_parts(method, &"/mcp".parse().unwrap(), map, Bytes::from(body.to_string())).unwrap()
    }

    fn ctx() -> AddonContext {
        AddonContext::new("http://localhost:6006", Arc::new(HostConfig::default()))
    }

    fn initialize_body() -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            }
        })
    }

    #[tokio::test]
    async fn test_initialize_creates_session_and_records_telemetry() {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let server = McpServer::new(ToolRegistry::new()).with_telemetry(telemetry.clone());

        let res = server
            .handle(request(Method::POST, &[("accept", "application/json, text/event-stream")], initialize_body()), ctx())
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("text/event-stream"));

        let session_id = res.header(SESSION_HEADER).unwrap().to_string();
        assert!(server.sessions().contains(&session_id));

        let payload = res.json_payload().unwrap();
        assert_eq!(payload["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(payload["result"]["serverInfo"]["name"], "storybook-mcp");

        let events = telemetry.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["client"], "test-client");
    }

    #[tokio::test]
    async fn test_telemetry_disabled() {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let server = McpServer::new(ToolRegistry::new()).with_telemetry(telemetry.clone());
        server
            .handle(request(Method::POST, &[], initialize_body()), ctx().with_telemetry_disabled(true))
            .await;
        assert!(telemetry.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let server = McpServer::new(ToolRegistry::new());
        let res = server.handle(request(Method::POST, &[], initialize_body()), ctx()).await;
        let session_id = res.header(SESSION_HEADER).unwrap().to_string();

        let ping = json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" });
        let res = server
            .handle(request(Method::POST, &[(SESSION_HEADER, &session_id)], ping.clone()), ctx())
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json_payload().unwrap()["result"], json!({}));

        let res = server
            .handle(request(Method::DELETE, &[(SESSION_HEADER, &session_id)], Value::Null), ctx())
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let res = server
            .handle(request(Method::POST, &[(SESSION_HEADER, &session_id)], ping), ctx())
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_and_errors() {
        let server = McpServer::new(ToolRegistry::new());

        let res = server
            .handle(
                request(Method::POST, &[], json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })),
                ctx(),
            )
            .await;
        assert_eq!(res.status, StatusCode::ACCEPTED);
        assert!(res.body.is_empty());

        let res = server
            .handle(request(Method::POST, &[], json!({ "jsonrpc": "2.0", "id": 3, "method": "resources/list" })), ctx())
            .await;
        assert_eq!(res.json_payload().unwrap()["error"]["code"], -32601);

        let res = server
            .handle(
                request(
                    Method::POST,
                    &[],
                    json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": { "name": "nope" } }),
                ),
                ctx(),
            )
            .await;
        assert_eq!(res.json_payload().unwrap()["error"]["code"], -32602);

        let mut bad = request(Method::POST, &[], Value::Null);
        bad.body = Bytes::from_static(b"{not json");
        let res = server.handle(bad, ctx()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.json_payload().unwrap()["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_auth_gate() {
        let mut auth = CompositionAuth::none();
        auth.record(
            "ds",
            AuthRequirement {
                resource_metadata_url: Url::parse("https://ds.example/.well-known/oauth-protected-resource").unwrap(),
                resource_metadata: ResourceMetadata {
                    resource: "https://ds.example/".to_string(),
                    authorization_servers: vec!["https://login.example".to_string()],
                    scopes_supported: vec![],
                },
                server_metadata: AuthorizationServerMetadata {
                    issuer: "https://login.example".to_string(),
                    authorization_endpoint: None,
                    token_endpoint: None,
                    extra: Default::default(),
                },
            },
        );
        let server = McpServer::new(ToolRegistry::new()).with_auth(Arc::new(auth));

        let res = server.handle(request(Method::POST, &[], initialize_body()), ctx()).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.header("www-authenticate"),
            Some("Bearer resource_metadata=\"http://localhost:6006/.well-known/oauth-protected-resource\"")
        );

        let res = server
            .handle(
                request(Method::POST, &[], initialize_body()),
                ctx().with_bearer_token(Some("token".to_string())),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }
}
