// Fetching the host's live story index

use crate::composition::as_directory;
use crate::error::{McpError, McpResult};
use storybook_mcp_core::StoryIndex;
use url::Url;

/// Source of fresh story index snapshots
#[async_trait::async_trait]
pub trait StoryIndexSource: Send + Sync {
    /// Fetch the current index. Never cached: the index changes as files are edited.
    async fn fetch(&self) -> McpResult<StoryIndex>;
}

/// Reads `index.json` from the host dev server
pub struct HttpStoryIndex {
    client: reqwest::Client,
    url: Url,
}

impl HttpStoryIndex {
    pub fn new(client: reqwest::Client, origin: &Url) -> McpResult<Self> {
        Ok(Self {
            client,
            url: as_directory(origin).join("index.json")?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl StoryIndexSource for HttpStoryIndex {
    async fn fetch(&self) -> McpResult<StoryIndex> {
        tracing::debug!(url = %self.url, "Fetching story index");
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(McpError::Upstream {
                url: self.url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<StoryIndex>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetches_index_each_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "v": 5,
                "entries": {
                    "button--primary": {
                        "type": "story", "id": "button--primary", "title": "Button",
                        "name": "Primary", "importPath": "./src/Button.stories.tsx", "tags": []
                    }
                }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let origin = Url::parse(&server.uri()).unwrap();
        let source = HttpStoryIndex::new(reqwest::Client::new(), &origin).unwrap();

        assert_eq!(source.fetch().await.unwrap().entries.len(), 1);
        assert_eq!(source.fetch().await.unwrap().entries[0].id, "button--primary");
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let origin = Url::parse(&server.uri()).unwrap();
        let source = HttpStoryIndex::new(reqwest::Client::new(), &origin).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, McpError::Upstream { status: 500, .. }));
    }
}
