// Toolset gating: which tool groups a request may see and call

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request header carrying a comma-separated toolset allow-list
pub const TOOLSETS_HEADER: &str = "x-mcp-toolsets";

/// A named group of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolset {
    /// Story previews and authoring guidance
    Dev,
    /// Component documentation browsing
    Docs,
    /// Story test runs
    Test,
}

impl Toolset {
    pub const ALL: [Toolset; 3] = [Toolset::Dev, Toolset::Docs, Toolset::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Toolset::Dev => "dev",
            Toolset::Docs => "docs",
            Toolset::Test => "test",
        }
    }
}

impl fmt::Display for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Toolset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Toolset::Dev),
            "docs" => Ok(Toolset::Docs),
            "test" => Ok(Toolset::Test),
            other => Err(format!("Unknown toolset: {}", other)),
        }
    }
}

/// Enabled/disabled flag per toolset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolsets {
    #[serde(default = "enabled")]
    pub dev: bool,
    #[serde(default = "enabled")]
    pub docs: bool,
    #[serde(default = "enabled")]
    pub test: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Toolsets {
    fn default() -> Self {
        Self {
            dev: true,
            docs: true,
            test: true,
        }
    }
}

impl Toolsets {
    pub fn none() -> Self {
        Self {
            dev: false,
            docs: false,
            test: false,
        }
    }

    /// Derive the toolsets for one request.
    ///
    /// Without a header the static defaults apply. With a header, only the
    /// named toolsets are enabled; unknown names are ignored.
    pub fn from_header(header: Option<&str>, defaults: Toolsets) -> Self {
        let Some(header) = header else {
            return defaults;
        };

        let mut toolsets = Toolsets::none();
        for name in header.split(',').filter(|name| !name.trim().is_empty()) {
            match name.parse::<Toolset>() {
                Ok(toolset) => toolsets.set(toolset, true),
                Err(e) => tracing::debug!("Ignoring toolset in {} header: {}", TOOLSETS_HEADER, e),
            }
        }
        toolsets
    }

    pub fn is_enabled(&self, toolset: Toolset) -> bool {
        match toolset {
            Toolset::Dev => self.dev,
            Toolset::Docs => self.docs,
            Toolset::Test => self.test,
        }
    }

    pub fn set(&mut self, toolset: Toolset, enabled: bool) {
        match toolset {
            Toolset::Dev => self.dev = enabled,
            Toolset::Docs => self.docs = enabled,
            Toolset::Test => self.test = enabled,
        }
    }

    /// Names of the enabled toolsets, in canonical order
    pub fn enabled_names(&self) -> Vec<&'static str> {
        Toolset::ALL
            .iter()
            .filter(|t| self.is_enabled(**t))
            .map(|t| t.as_str())
            .collect()
    }
}
