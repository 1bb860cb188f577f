// Component documentation manifests produced by the host

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write;

/// Relative path of the components manifest on every source
pub const COMPONENTS_MANIFEST_PATH: &str = "manifests/components.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStory {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestError {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// Documentation for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentManifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub import: Option<String>,
    #[serde(default)]
    pub stories: Vec<ManifestStory>,
    #[serde(default)]
    pub react_docgen: Option<Value>,
    #[serde(default)]
    pub error: Option<ManifestError>,
}

/// A standalone documentation page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsManifest {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// The manifest document served by a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub v: u32,
    pub components: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Map<String, Value>>,
}

impl Manifest {
    /// Parse and validate a manifest body.
    ///
    /// Anything that is not a JSON object with a numeric `v` and a
    /// `components` object is rejected, as are malformed entries.
    pub fn parse(body: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(body)
            .map_err(|e| CoreError::InvalidManifest(e.to_string()))?;
        for (key, entry) in &manifest.components {
            serde_json::from_value::<ComponentManifest>(entry.clone())
                .map_err(|e| CoreError::InvalidManifest(format!("component \"{}\": {}", key, e)))?;
        }
        if let Some(docs) = &manifest.docs {
            for (key, entry) in docs {
                serde_json::from_value::<DocsManifest>(entry.clone())
                    .map_err(|e| CoreError::InvalidManifest(format!("docs entry \"{}\": {}", key, e)))?;
            }
        }
        Ok(manifest)
    }

    /// Components in manifest order
    pub fn components(&self) -> Vec<ComponentManifest> {
        self.components
            .values()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }

    /// Docs entries in manifest order
    pub fn docs(&self) -> Vec<DocsManifest> {
        self.docs
            .iter()
            .flat_map(|docs| docs.values())
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }

    pub fn component(&self, id: &str) -> Option<ComponentManifest> {
        self.components
            .get(id)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn doc(&self, id: &str) -> Option<DocsManifest> {
        self.docs
            .as_ref()
            .and_then(|docs| docs.get(id))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// One bullet list of everything a manifest documents
pub fn format_manifest_list(manifest: &Manifest, with_story_ids: bool) -> String {
    let mut out = String::new();

    let components = manifest.components();
    if !components.is_empty() {
        out.push_str("### Components\n\n");
        for component in &components {
            let _ = write!(out, "- {} ({})", component.name, component.id);
            if let Some(summary) = component.summary.as_ref().or(component.description.as_ref()) {
                let _ = write!(out, ": {}", first_line(summary));
            }
            out.push('\n');
            if with_story_ids {
                for story in &component.stories {
                    match &story.id {
                        Some(id) => {
                            let _ = writeln!(out, "  - {} ({})", story.name, id);
                        }
                        None => {
                            let _ = writeln!(out, "  - {}", story.name);
                        }
                    }
                }
            }
        }
    }

    let docs = manifest.docs();
    if !docs.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("### Docs\n\n");
        for doc in &docs {
            let _ = write!(out, "- {} ({})", doc.title, doc.id);
            if let Some(summary) = &doc.summary {
                let _ = write!(out, ": {}", first_line(summary));
            }
            out.push('\n');
        }
    }

    if out.is_empty() {
        "No documentation entries found.".to_string()
    } else {
        out.trim_end().to_string()
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

/// Full markdown documentation for one component
pub fn format_component(component: &ComponentManifest) -> String {
    let mut out = format!("# {}\n\nID: {}\n", component.name, component.id);

    if let Some(error) = &component.error {
        let _ = write!(
            out,
            "\n> Documentation could not be fully generated: {}: {}\n",
            error.name, error.message
        );
    }
    if let Some(description) = component.description.as_ref().or(component.summary.as_ref()) {
        let _ = write!(out, "\n{}\n", description.trim());
    }
    if let Some(import) = &component.import {
        let _ = write!(out, "\n## Import\n\n```\n{}\n```\n", import.trim());
    }

    if !component.stories.is_empty() {
        out.push_str("\n## Stories\n");
        for story in &component.stories {
            let _ = write!(out, "\n### {}\n", story.name);
            if let Some(id) = &story.id {
                let _ = write!(out, "\nStory ID: {}\n", id);
            }
            if let Some(description) = story.description.as_ref().or(story.summary.as_ref()) {
                let _ = write!(out, "\n{}\n", description.trim());
            }
            if let Some(snippet) = &story.snippet {
                let _ = write!(out, "\n```\n{}\n```\n", snippet.trim());
            }
        }
    }

    if let Some(props) = component
        .react_docgen
        .as_ref()
        .and_then(|docgen| docgen.get("props"))
        .and_then(Value::as_object)
        .filter(|props| !props.is_empty())
    {
        out.push_str("\n## Props\n\n");
        for (name, prop) in props {
            let type_name = prop
                .pointer("/tsType/name")
                .or_else(|| prop.pointer("/type/name"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let required = prop.get("required").and_then(Value::as_bool).unwrap_or(false);
            let _ = write!(
                out,
                "- `{}`{}: `{}`",
                name,
                if required { "" } else { "?" },
                type_name
            );
            if let Some(default) = prop.pointer("/defaultValue/value").and_then(Value::as_str) {
                let _ = write!(out, " (default: `{}`)", default);
            }
            if let Some(description) = prop
                .get("description")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
            {
                let _ = write!(out, " - {}", first_line(description));
            }
            out.push('\n');
        }
    }

    out.trim_end().to_string()
}

/// Markdown for a standalone docs entry
pub fn format_doc(doc: &DocsManifest) -> String {
    let mut out = format!("# {}\n\nID: {}\n", doc.title, doc.id);
    if let Some(content) = doc.content.as_ref().or(doc.summary.as_ref()) {
        let _ = write!(out, "\n{}\n", content.trim());
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        serde_json::json!({
            "v": 0,
            "components": {
                "button": {
                    "id": "button",
                    "name": "Button",
                    "path": "./src/Button.stories.tsx",
                    "summary": "Primary UI component for user interaction",
                    "import": "import { Button } from '@acme/ui';",
                    "stories": [
                        {"id": "button--primary", "name": "Primary", "snippet": "<Button primary label=\"Go\" />"}
                    ],
                    "reactDocgen": {
                        "props": {
                            "label": {"required": true, "tsType": {"name": "string"}, "description": "Button contents"},
                            "size": {"required": false, "tsType": {"name": "'small' | 'large'"}, "defaultValue": {"value": "'small'"}}
                        }
                    }
                }
            },
            "docs": {
                "intro--docs": {"id": "intro--docs", "title": "Introduction", "content": "Welcome to the design system."}
            }
        })
        .to_string()
    }

    #[test]
    fn test_parse_valid_manifest() {
        let manifest = Manifest::parse(&fixture()).unwrap();
        assert_eq!(manifest.components().len(), 1);
        assert_eq!(manifest.docs().len(), 1);
        assert_eq!(manifest.component("button").unwrap().stories.len(), 1);
    }

    #[test]
    fn test_parse_rejects_placeholders() {
        assert!(Manifest::parse("<html><body>Please log in</body></html>").is_err());
        assert!(Manifest::parse("{\"ok\": true}").is_err());
        assert!(Manifest::parse("{\"v\": 0, \"components\": {\"x\": {\"id\": 1}}}").is_err());
    }

    #[test]
    fn test_list_with_story_ids() {
        let manifest = Manifest::parse(&fixture()).unwrap();
        let list = format_manifest_list(&manifest, true);
        assert!(list.contains("- Button (button): Primary UI component for user interaction"));
        assert!(list.contains("  - Primary (button--primary)"));
        assert!(list.contains("- Introduction (intro--docs)"));

        let list = format_manifest_list(&manifest, false);
        assert!(!list.contains("button--primary"));
    }

    #[test]
    fn test_format_component() {
        let manifest = Manifest::parse(&fixture()).unwrap();
        let doc = format_component(&manifest.component("button").unwrap());
        assert!(doc.starts_with("# Button\n\nID: button"));
        assert!(doc.contains("## Import\n\n```\nimport { Button } from '@acme/ui';\n```"));
        assert!(doc.contains("### Primary"));
        assert!(doc.contains("<Button primary label=\"Go\" />"));
        assert!(doc.contains("- `label`: `string` - Button contents"));
        assert!(doc.contains("- `size`?: `'small' | 'large'` (default: `'small'`)"));
    }

    #[test]
    fn test_format_doc() {
        let manifest = Manifest::parse(&fixture()).unwrap();
        let doc = format_doc(&manifest.doc("intro--docs").unwrap());
        assert_eq!(doc, "# Introduction\n\nID: intro--docs\n\nWelcome to the design system.");
    }
}
