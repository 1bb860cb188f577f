// Story resolution: map caller-supplied story references onto index entries

use crate::paths::{story_import_path, to_import_path};
use crate::types::{FoundStory, ResolvedStory, StoryIndex, StoryIndexEntry, StoryInput};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_\-.]").unwrap());
static UPPER_BEFORE_LOWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\n])([A-Z])([a-z])").unwrap());
static LOWER_BEFORE_UPPER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static LETTER_BEFORE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([a-z])([0-9])").unwrap());
static DIGIT_BEFORE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9])([a-z])").unwrap());
static WORD_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s|^)([A-Za-z0-9_])").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());

/// Derive the display name Storybook gives a story export.
///
/// `WithLongLabel` becomes `With Long Label`, `primary_button` becomes
/// `Primary Button`.
pub fn story_name_from_export(export_name: &str) -> String {
    let name = SEPARATORS.replace_all(export_name, " ");
    let name = UPPER_BEFORE_LOWER.replace_all(&name, "${1} ${2}${3}");
    let name = LOWER_BEFORE_UPPER.replace_all(&name, "${1} ${2}");
    let name = LETTER_BEFORE_DIGIT.replace_all(&name, "${1} ${2}");
    let name = DIGIT_BEFORE_LETTER.replace_all(&name, "${1} ${2}");
    let name = WORD_START.replace_all(&name, |caps: &Captures| {
        format!("{}{}", &caps[1], caps[2].to_uppercase())
    });
    let name = SPACES.replace_all(&name, " ");
    name.trim().to_string()
}

/// Resolves story references against one index snapshot
pub struct StoryResolver<'a> {
    index: &'a StoryIndex,
    cwd: String,
}

impl<'a> StoryResolver<'a> {
    pub fn new(index: &'a StoryIndex, cwd: impl Into<String>) -> Self {
        Self {
            index,
            cwd: cwd.into(),
        }
    }

    /// Resolve every input, one result per input, in input order
    pub fn resolve_all(&self, inputs: &[StoryInput]) -> Vec<ResolvedStory> {
        inputs.iter().map(|input| self.resolve(input)).collect()
    }

    /// Resolve a single input
    pub fn resolve(&self, input: &StoryInput) -> ResolvedStory {
        let matched = match input {
            StoryInput::Id { story_id, .. } => self.first_match(|entry| entry.id == *story_id),
            StoryInput::Path {
                export_name,
                absolute_story_path,
                explicit_story_name,
                ..
            } => {
                let import_path = story_import_path(absolute_story_path, &self.cwd);
                let story_name = explicit_story_name
                    .clone()
                    .unwrap_or_else(|| story_name_from_export(export_name));
                self.first_match(|entry| {
                    entry.name == story_name && to_import_path(&entry.import_path) == import_path
                })
            }
        };

        match matched {
            Some(entry) => ResolvedStory::Found(FoundStory {
                id: entry.id.clone(),
                title: entry.title.clone(),
                name: entry.name.clone(),
                entry_type: entry.entry_type,
                props: input.props().cloned(),
                globals: input.globals().cloned(),
            }),
            None => ResolvedStory::Missing {
                input: input.clone(),
                error: missing_story_message(input),
            },
        }
    }

    /// First entry in index order that satisfies the predicate
    fn first_match<F>(&self, predicate: F) -> Option<&'a StoryIndexEntry>
    where
        F: Fn(&StoryIndexEntry) -> bool,
    {
        let mut matches = self.index.entries.iter().filter(|entry| predicate(entry));
        let first = matches.next()?;

        let others: Vec<&str> = matches.map(|entry| entry.id.as_str()).collect();
        if !others.is_empty() {
            tracing::warn!(
                chosen = %first.id,
                also_matching = ?others,
                "Story reference is ambiguous, using the first matching index entry"
            );
        }

        Some(first)
    }
}

/// Resolve `inputs` against `index` relative to `cwd`
pub fn resolve_stories(index: &StoryIndex, inputs: &[StoryInput], cwd: &str) -> Vec<ResolvedStory> {
    StoryResolver::new(index, cwd).resolve_all(inputs)
}

fn missing_story_message(input: &StoryInput) -> String {
    match input {
        StoryInput::Id { story_id, .. } => format!("No story found for story ID \"{}\"", story_id),
        StoryInput::Path {
            export_name,
            absolute_story_path,
            explicit_story_name,
            ..
        } => {
            let mut message = format!(
                "No story found for export name \"{}\" with absolute file path \"{}\"",
                export_name, absolute_story_path
            );
            if explicit_story_name.is_none() {
                message.push_str(
                    " (did you forget to pass the explicit story name? Stories with a custom name cannot be found by export name alone)",
                );
            }
            message
        }
    }
}
