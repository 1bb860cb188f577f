// OAuth discovery for composed sources

use super::Source;
use crate::error::{McpError, McpResult};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use storybook_mcp_core::manifest::{Manifest, COMPONENTS_MANIFEST_PATH};
use url::Url;

/// Path of the protected resource metadata document
pub const WELL_KNOWN_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// OAuth 2.0 protected resource metadata (RFC 9728)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub resource: String,
    #[serde(default)]
    pub authorization_servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,
}

/// OAuth 2.0 authorization server metadata (RFC 8414)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a composed source demands before it serves data
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequirement {
    pub resource_metadata_url: Url,
    pub resource_metadata: ResourceMetadata,
    pub server_metadata: AuthorizationServerMetadata,
}

/// Outcome of probing one source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceAccess {
    Public,
    AuthRequired(AuthRequirement),
}

/// Extract the `resource_metadata` parameter of a `WWW-Authenticate` challenge
pub fn parse_resource_metadata_challenge(header: &str) -> Option<String> {
    let start = header.find("resource_metadata=")? + "resource_metadata=".len();
    let rest = &header[start..];
    let value = match rest.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => rest.split([',', ' ']).next().unwrap_or_default(),
    };
    Some(value.trim().to_string()).filter(|v| !v.is_empty())
}

fn challenge_of(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(http::header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_resource_metadata_challenge)
}

/// A 401 returned by a remote protocol endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub resource_metadata: Option<String>,
}

/// POST a minimal `tools/list` to `{base}mcp`. Returns the challenge when the
/// remote answers 401.
pub async fn probe_mcp_endpoint(
    client: &reqwest::Client,
    base: &Url,
    token: Option<&str>,
) -> McpResult<Option<Challenge>> {
    let url = base.join("mcp")?;
    let mut request = client
        .post(url.clone())
        .header(http::header::ACCEPT, "application/json, text/event-stream")
        .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {} }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    if response.status() == StatusCode::UNAUTHORIZED {
        tracing::debug!(url = %url, "Protocol endpoint requires authentication");
        return Ok(Some(Challenge {
            resource_metadata: challenge_of(&response),
        }));
    }
    Ok(None)
}

async fn fetch_json<T: serde::de::DeserializeOwned>(client: &reqwest::Client, url: &Url) -> McpResult<T> {
    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(McpError::Upstream {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response.json::<T>().await?)
}

/// Candidate metadata URLs for an issuer: RFC 8414 first, then OpenID Connect
fn server_metadata_urls(issuer: &Url) -> McpResult<Vec<Url>> {
    let path = issuer.path().trim_end_matches('/');
    let oauth = issuer.join(&format!("/.well-known/oauth-authorization-server{}", path))?;
    let oidc = issuer.join(&format!("{}/.well-known/openid-configuration", path))?;
    Ok(vec![oauth, oidc])
}

async fn discover_requirement(client: &reqwest::Client, resource_metadata_url: &str) -> McpResult<AuthRequirement> {
    let resource_metadata_url = Url::parse(resource_metadata_url)?;
    let resource_metadata: ResourceMetadata = fetch_json(client, &resource_metadata_url).await?;

    let issuer = resource_metadata
        .authorization_servers
        .first()
        .ok_or_else(|| McpError::Unauthorized(format!(
            "{} does not name an authorization server",
            resource_metadata_url
        )))?;
    let issuer = Url::parse(issuer)?;

    let mut last_error = None;
    for url in server_metadata_urls(&issuer)? {
        match fetch_json::<AuthorizationServerMetadata>(client, &url).await {
            Ok(server_metadata) => {
                return Ok(AuthRequirement {
                    resource_metadata_url,
                    resource_metadata,
                    server_metadata,
                })
            }
            Err(e) => {
                tracing::debug!(url = %url, "Authorization server metadata not found: {}", e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| McpError::Upstream {
        url: issuer.to_string(),
        status: StatusCode::NOT_FOUND.as_u16(),
    }))
}

/// Find out whether a remote source requires authentication
pub async fn probe_source(client: &reqwest::Client, base: &Url) -> McpResult<SourceAccess> {
    let manifest_url = base.join(COMPONENTS_MANIFEST_PATH)?;
    let response = client.get(manifest_url.clone()).send().await?;

    if response.status() == StatusCode::UNAUTHORIZED {
        return match challenge_of(&response) {
            Some(metadata_url) => Ok(SourceAccess::AuthRequired(
                discover_requirement(client, &metadata_url).await?,
            )),
            None => {
                tracing::warn!(url = %manifest_url, "401 without a resource_metadata challenge");
                Ok(SourceAccess::Public)
            }
        };
    }

    if response.status().is_success() {
        let body = response.text().await?;
        if Manifest::parse(&body).is_ok() {
            return Ok(SourceAccess::Public);
        }
    }

    // Login redirects and placeholder pages: ask the protocol endpoint instead
    match probe_mcp_endpoint(client, base, None).await? {
        Some(Challenge {
            resource_metadata: Some(metadata_url),
        }) => Ok(SourceAccess::AuthRequired(
            discover_requirement(client, &metadata_url).await?,
        )),
        _ => Ok(SourceAccess::Public),
    }
}

/// Authentication state of the composition, discovered once at startup
#[derive(Debug, Clone, Default)]
pub struct CompositionAuth {
    requirement: Option<AuthRequirement>,
    auth_sources: Vec<String>,
}

impl CompositionAuth {
    /// No composed source requires authentication
    pub fn none() -> Self {
        Self::default()
    }

    pub async fn discover(client: &reqwest::Client, sources: &[Source]) -> Self {
        let mut auth = Self::default();
        for source in sources {
            let Some(url) = &source.url else { continue };
            match probe_source(client, url).await {
                Ok(SourceAccess::Public) => {
                    tracing::info!(source = %source.id, "Composed source is public");
                }
                Ok(SourceAccess::AuthRequired(requirement)) => {
                    tracing::info!(
                        source = %source.id,
                        issuer = %requirement.server_metadata.issuer,
                        "Composed source requires authentication"
                    );
                    auth.record(&source.id, requirement);
                }
                Err(e) => {
                    tracing::warn!(source = %source.id, "Failed to probe composed source: {}", e);
                }
            }
        }
        auth
    }

    /// Record an auth-required source. Only the first authorization server is kept.
    pub fn record(&mut self, source_id: &str, requirement: AuthRequirement) {
        match &self.requirement {
            None => self.requirement = Some(requirement),
            Some(existing) if existing.server_metadata.issuer != requirement.server_metadata.issuer => {
                tracing::warn!(
                    source = %source_id,
                    kept = %existing.server_metadata.issuer,
                    ignored = %requirement.server_metadata.issuer,
                    "Composed sources disagree on the authorization server; only one is supported"
                );
            }
            Some(_) => {}
        }
        if !self.auth_sources.iter().any(|id| id == source_id) {
            self.auth_sources.push(source_id.to_string());
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.requirement.is_some()
    }

    pub fn source_requires_auth(&self, source_id: &str) -> bool {
        self.auth_sources.iter().any(|id| id == source_id)
    }

    pub fn requirement(&self) -> Option<&AuthRequirement> {
        self.requirement.as_ref()
    }

    /// Protected resource metadata served by this server, or `None` without auth
    pub fn build_well_known(&self, origin: &str) -> Option<Value> {
        let requirement = self.requirement.as_ref()?;
        let mut doc = json!({
            "resource": format!("{}/mcp", origin.trim_end_matches('/')),
            "authorization_servers": [requirement.server_metadata.issuer],
            "bearer_methods_supported": ["header"],
        });
        if !requirement.resource_metadata.scopes_supported.is_empty() {
            doc["scopes_supported"] = json!(requirement.resource_metadata.scopes_supported);
        }
        Some(doc)
    }

    /// `WWW-Authenticate` value pointing at this server's discovery document
    pub fn challenge_header(&self, origin: &str) -> String {
        format!(
            "Bearer resource_metadata=\"{}{}\"",
            origin.trim_end_matches('/'),
            WELL_KNOWN_RESOURCE_PATH
        )
    }
}
