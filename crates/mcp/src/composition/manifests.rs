// Manifest fetching across the local and composed sources

use super::{as_directory, probe_mcp_endpoint, CompositionAuth, Source};
use crate::error::{McpError, McpResult};
use http::StatusCode;
use std::sync::Arc;
use storybook_mcp_core::manifest::{Manifest, COMPONENTS_MANIFEST_PATH};
use url::Url;

/// Fetches component manifests, relaying the caller's bearer token to
/// sources that require it
#[derive(Clone)]
pub struct ManifestClient {
    client: reqwest::Client,
    local_origin: Url,
    auth: Arc<CompositionAuth>,
}

impl ManifestClient {
    pub fn new(client: reqwest::Client, local_origin: &Url, auth: Arc<CompositionAuth>) -> Self {
        Self {
            client,
            local_origin: as_directory(local_origin),
            auth,
        }
    }

    pub fn auth(&self) -> &CompositionAuth {
        &self.auth
    }

    /// Fetch and validate the manifest of one source
    pub async fn fetch(&self, source: &Source, token: Option<&str>) -> McpResult<Manifest> {
        let base = source.url.as_ref().unwrap_or(&self.local_origin);
        let url = base.join(COMPONENTS_MANIFEST_PATH)?;

        let token = if self.auth.source_requires_auth(&source.id) {
            Some(token.ok_or_else(|| {
                McpError::Unauthorized(format!("{} requires authentication", source.title))
            })?)
        } else {
            None
        };

        tracing::debug!(source = %source.id, url = %url, authenticated = token.is_some(), "Fetching manifest");
        let mut request = self.client.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(McpError::Unauthorized(format!(
                "{} rejected the access token. Re-authenticate and try again.",
                source.title
            )));
        }
        if !response.status().is_success() {
            return Err(McpError::Upstream {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        match Manifest::parse(&body) {
            Ok(manifest) => Ok(manifest),
            Err(parse_error) => {
                // A 200 with an unexpected body may be a login page served to an expired session
                if let Some(remote) = &source.url {
                    if probe_mcp_endpoint(&self.client, remote, token).await?.is_some() {
                        tracing::warn!(source = %source.id, "Manifest fetch silently failed authentication");
                        return Err(McpError::Unauthorized(format!(
                            "{} did not accept the access token (the manifest request returned a non-manifest response). Re-authenticate and try again.",
                            source.title
                        )));
                    }
                }
                Err(parse_error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{AuthRequirement, AuthorizationServerMetadata, ResourceMetadata};
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manifest_body() -> serde_json::Value {
        json!({
            "v": 0,
            "components": {
                "button": { "id": "button", "name": "Button" }
            }
        })
    }

    fn remote(server: &MockServer) -> Source {
        Source {
            id: "ds".to_string(),
            title: "Design System".to_string(),
            url: Some(Url::parse(&format!("{}/", server.uri())).unwrap()),
        }
    }

    fn auth_for(source_id: &str) -> Arc<CompositionAuth> {
        let mut auth = CompositionAuth::none();
        auth.record(
            source_id,
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
        Arc::new(auth)
    }

    #[tokio::test]
    async fn test_relays_token_only_to_auth_sources() {
        let local = MockServer::start().await;
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifests/components.json"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/manifests/components.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest_body()))
            .mount(&local)
            .await;

        let client = ManifestClient::new(
            reqwest::Client::new(),
            &Url::parse(&local.uri()).unwrap(),
            auth_for("ds"),
        );

        let manifest = client.fetch(&remote(&server), Some("secret")).await.unwrap();
        assert!(manifest.component("button").is_some());

        client.fetch(&Source::local("Local"), Some("secret")).await.unwrap();
        let requests = local.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.headers.contains_key("authorization")));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let server = MockServer::start().await;
        let client = ManifestClient::new(
            reqwest::Client::new(),
            &Url::parse("http://localhost:6006").unwrap(),
            auth_for("ds"),
        );
        let err = client.fetch(&remote(&server), None).await.unwrap_err();
        assert!(matches!(err, McpError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_invalid_body_reprobes_for_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifests/components.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = ManifestClient::new(
            reqwest::Client::new(),
            &Url::parse("http://localhost:6006").unwrap(),
            auth_for("ds"),
        );
        let err = client.fetch(&remote(&server), Some("expired")).await.unwrap_err();
        match err {
            McpError::Unauthorized(message) => assert!(message.contains("Re-authenticate")),
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_body_without_auth_cause_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/manifests/components.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "tools": [] } })))
            .mount(&server)
            .await;

        let client = ManifestClient::new(
            reqwest::Client::new(),
            &Url::parse("http://localhost:6006").unwrap(),
            Arc::new(CompositionAuth::none()),
        );
        let err = client.fetch(&remote(&server), None).await.unwrap_err();
        assert!(matches!(err, McpError::Core(_)));
    }
}
