// Composition: federating documentation from remote Storybook instances

mod auth;
mod manifests;

pub use auth::{
    parse_resource_metadata_challenge, probe_mcp_endpoint, probe_source, AuthRequirement,
    AuthorizationServerMetadata, Challenge, CompositionAuth, ResourceMetadata, SourceAccess,
    WELL_KNOWN_RESOURCE_PATH,
};
pub use manifests::ManifestClient;

use serde::{Deserialize, Serialize};
use url::Url;

/// Id of the local source
pub const LOCAL_SOURCE_ID: &str = "local";

/// A configured composed instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefConfig {
    pub id: String,
    pub title: String,
    pub url: Url,
}

/// The local instance or one composed remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    /// `None` for the local source
    pub url: Option<Url>,
}

impl Source {
    pub fn local(title: impl Into<String>) -> Self {
        Self {
            id: LOCAL_SOURCE_ID.to_string(),
            title: title.into(),
            url: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.url.is_none()
    }
}

/// Ordered source list: the local instance first, then every ref in
/// configuration order. Refs reusing the local id are skipped.
pub fn build_sources(local_title: &str, refs: &[RefConfig]) -> Vec<Source> {
    let mut sources = vec![Source::local(local_title)];
    for r in refs {
        if sources.iter().any(|s| s.id == r.id) {
            tracing::warn!(source = %r.id, "Ignoring composed source with a duplicate id");
            continue;
        }
        sources.push(Source {
            id: r.id.clone(),
            title: r.title.clone(),
            url: Some(as_directory(&r.url)),
        });
    }
    sources
}

/// Ensure a base URL ends with `/` so that relative joins append to it
pub fn as_directory(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
