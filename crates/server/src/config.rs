use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storybook_mcp::composition::RefConfig;
use storybook_mcp::context::{Features, HostConfig};
use storybook_mcp::toolsets::Toolsets;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Title of the local Storybook
    #[serde(default = "default_title")]
    pub title: String,

    /// Origin of the Storybook dev server
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default)]
    pub disable_telemetry: bool,

    /// Directory story file paths are resolved against (default: current directory)
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Installed addon package names
    #[serde(default)]
    pub addons: Vec<String>,

    /// Toolsets enabled when a request carries no toolset header
    #[serde(default)]
    pub toolsets: Toolsets,

    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub test_runs: TestRunsConfig,

    /// Composed Storybooks
    #[serde(default)]
    pub refs: Vec<RefConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunsConfig {
    /// Seconds to wait for a test run to finish; 0 waits forever
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_title() -> String {
    "Local".to_string()
}

fn default_origin() -> String {
    "http://localhost:6006".to_string()
}

fn default_timeout_secs() -> u64 {
    900
}

impl Default for TestRunsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            origin: default_origin(),
            disable_telemetry: false,
            project_root: None,
            addons: Vec::new(),
            toolsets: Toolsets::default(),
            features: Features::default(),
            test_runs: TestRunsConfig::default(),
            refs: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        let config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self::default()
        };

        url::Url::parse(&config.origin)
            .with_context(|| format!("Invalid Storybook origin: {}", config.origin))?;

        Ok(config)
    }

    /// Read-only host configuration handed to tools
    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            title: self.title.clone(),
            addons: self.addons.clone(),
            features: self.features.clone(),
        }
    }

    /// Bound on a single test run, `None` when disabled
    pub fn test_run_timeout(&self) -> Option<Duration> {
        match self.test_runs.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Directory story paths are made relative to
    pub fn project_root(&self) -> Result<String> {
        let root = match &self.project_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        Ok(root.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load(&dir.path().join("storybook-mcp.toml")).unwrap();
        assert_eq!(config.origin, "http://localhost:6006");
        assert_eq!(config.title, "Local");
        assert_eq!(config.test_run_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(config.toolsets, Toolsets::default());
        assert!(config.refs.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
title = "Acme App"
origin = "http://localhost:6010"
disable_telemetry = true
project_root = "/work/acme"
addons = ["@storybook/addon-vitest", "@storybook/addon-a11y"]

[toolsets]
docs = false

[features]
components_manifest = true

[test_runs]
timeout_secs = 0

[[refs]]
id = "design-system"
title = "Design System"
url = "https://ds.acme.dev"
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.title, "Acme App");
        assert!(config.disable_telemetry);
        assert!(config.toolsets.dev && !config.toolsets.docs && config.toolsets.test);
        assert!(config.features.components_manifest);
        assert_eq!(config.test_run_timeout(), None);
        assert_eq!(config.project_root().unwrap(), "/work/acme");
        assert_eq!(config.refs[0].url.as_str(), "https://ds.acme.dev/");

        let host = config.host_config();
        assert!(host.test_addon_installed());
        assert!(host.a11y_addon_installed());
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "origin = \"not a url\"").unwrap();
        assert!(ServerConfig::load(file.path()).is_err());
    }
}
