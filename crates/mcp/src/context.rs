// Per-request context handed to every tool

use crate::toolsets::Toolsets;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Package name of the test runner integration
pub const TEST_ADDON: &str = "@storybook/addon-vitest";
/// Package name of the accessibility integration
pub const A11Y_ADDON: &str = "@storybook/addon-a11y";

/// Feature flags of the host application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Whether the host generates component manifests
    #[serde(default)]
    pub components_manifest: bool,
}

/// Read-only view of the host application's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub title: String,
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default)]
    pub features: Features,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "Local".to_string(),
            addons: Vec::new(),
            features: Features::default(),
        }
    }
}

impl HostConfig {
    /// Whether an addon is registered, by package name or a path ending in it
    pub fn has_addon(&self, package: &str) -> bool {
        self.addons.iter().any(|addon| {
            let addon = addon.replace('\\', "/");
            addon == package
                || addon.ends_with(&format!("/{}", package))
                || addon.contains(&format!("/node_modules/{}/", package))
        })
    }

    pub fn test_addon_installed(&self) -> bool {
        self.has_addon(TEST_ADDON)
    }

    pub fn a11y_addon_installed(&self) -> bool {
        self.has_addon(A11Y_ADDON)
    }
}

/// Capabilities of a single inbound request. Built fresh per request and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AddonContext {
    /// Origin of the host dev server, e.g. `http://localhost:6006`
    pub origin: String,
    pub toolsets: Toolsets,
    pub disable_telemetry: bool,
    pub host: Arc<HostConfig>,
    /// Bearer token presented on the inbound connection, if any
    pub bearer_token: Option<String>,
}

impl AddonContext {
    pub fn new(origin: impl Into<String>, host: Arc<HostConfig>) -> Self {
        Self {
            origin: origin.into(),
            toolsets: Toolsets::default(),
            disable_telemetry: false,
            host,
            bearer_token: None,
        }
    }

    pub fn with_toolsets(mut self, toolsets: Toolsets) -> Self {
        self.toolsets = toolsets;
        self
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn with_telemetry_disabled(mut self, disabled: bool) -> Self {
        self.disable_telemetry = disabled;
        self
    }

    /// Whether the documentation tools are available to this request
    pub fn docs_available(&self) -> bool {
        self.toolsets.docs && self.host.features.components_manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_addon() {
        let host = HostConfig {
            addons: vec![
                "@storybook/addon-vitest".to_string(),
                r"C:\repo\node_modules\@storybook\addon-a11y\preset.js".to_string(),
            ],
            ..Default::default()
        };
        assert!(host.test_addon_installed());
        assert!(host.a11y_addon_installed());
        assert!(!host.has_addon("@storybook/addon-docs"));
    }

    #[test]
    fn test_docs_require_feature_flag() {
        let mut host = HostConfig::default();
        let ctx = AddonContext::new("http://localhost:6006", Arc::new(host.clone()));
        assert!(!ctx.docs_available());

        host.features.components_manifest = true;
        let ctx = AddonContext::new("http://localhost:6006", Arc::new(host));
        assert!(ctx.docs_available());
        assert!(!ctx
            .with_toolsets(Toolsets::from_header(Some("dev"), Toolsets::default()))
            .docs_available());
    }
}
