use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of entry in the story index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    #[default]
    Story,
    Docs,
}

impl EntryType {
    /// Path segment used by the manager UI for this kind of entry
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntryType::Story => "story",
            EntryType::Docs => "docs",
        }
    }
}

/// One leaf of the host's story index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryIndexEntry {
    pub id: String,
    pub title: String,
    pub name: String,
    pub import_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type", default)]
    pub entry_type: EntryType,
}

/// Point-in-time snapshot of the host's story index.
///
/// Entries keep the order in which the host listed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStoryIndex")]
pub struct StoryIndex {
    pub v: u32,
    pub entries: Vec<StoryIndexEntry>,
}

#[derive(Deserialize)]
struct RawStoryIndex {
    #[serde(default)]
    v: u32,
    #[serde(default)]
    entries: Map<String, Value>,
}

impl TryFrom<RawStoryIndex> for StoryIndex {
    type Error = serde_json::Error;

    fn try_from(raw: RawStoryIndex) -> Result<Self, Self::Error> {
        let entries = raw
            .entries
            .into_iter()
            .map(|(_, entry)| serde_json::from_value(entry))
            .collect::<Result<Vec<StoryIndexEntry>, _>>()?;
        Ok(Self { v: raw.v, entries })
    }
}

impl StoryIndex {
    pub fn new(entries: Vec<StoryIndexEntry>) -> Self {
        Self { v: 5, entries }
    }

    /// Look up an entry by its id
    pub fn get(&self, id: &str) -> Option<&StoryIndexEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Only the story entries (docs entries excluded)
    pub fn stories(&self) -> impl Iterator<Item = &StoryIndexEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.entry_type == EntryType::Story)
    }
}

/// Caller-supplied story reference.
///
/// Either addressed by the story file and export name, or by the story id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoryInput {
    #[serde(rename_all = "camelCase")]
    Id {
        story_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        props: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        globals: Option<Map<String, Value>>,
    },
    #[serde(rename_all = "camelCase")]
    Path {
        export_name: String,
        absolute_story_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explicit_story_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        props: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        globals: Option<Map<String, Value>>,
    },
}

impl StoryInput {
    pub fn by_id(story_id: impl Into<String>) -> Self {
        Self::Id {
            story_id: story_id.into(),
            props: None,
            globals: None,
        }
    }

    pub fn by_path(export_name: impl Into<String>, absolute_story_path: impl Into<String>) -> Self {
        Self::Path {
            export_name: export_name.into(),
            absolute_story_path: absolute_story_path.into(),
            explicit_story_name: None,
            props: None,
            globals: None,
        }
    }

    pub fn props(&self) -> Option<&Map<String, Value>> {
        match self {
            StoryInput::Id { props, .. } | StoryInput::Path { props, .. } => props.as_ref(),
        }
    }

    pub fn globals(&self) -> Option<&Map<String, Value>> {
        match self {
            StoryInput::Id { globals, .. } | StoryInput::Path { globals, .. } => globals.as_ref(),
        }
    }
}

/// A story reference that matched an index entry
#[derive(Debug, Clone, PartialEq)]
pub struct FoundStory {
    pub id: String,
    pub title: String,
    pub name: String,
    pub entry_type: EntryType,
    pub props: Option<Map<String, Value>>,
    pub globals: Option<Map<String, Value>>,
}

/// Outcome of resolving one [`StoryInput`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedStory {
    Found(FoundStory),
    Missing { input: StoryInput, error: String },
}

impl ResolvedStory {
    pub fn found(&self) -> Option<&FoundStory> {
        match self {
            ResolvedStory::Found(story) => Some(story),
            ResolvedStory::Missing { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolvedStory::Found(_))
    }
}
