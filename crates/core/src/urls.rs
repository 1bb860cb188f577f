use crate::args::encode_json_args;
use crate::types::FoundStory;

fn query_suffix(story: &FoundStory) -> String {
    let mut suffix = String::new();
    let args = encode_json_args(story.props.as_ref());
    if !args.is_empty() {
        suffix.push_str("&args=");
        suffix.push_str(&args);
    }
    let globals = encode_json_args(story.globals.as_ref());
    if !globals.is_empty() {
        suffix.push_str("&globals=");
        suffix.push_str(&globals);
    }
    suffix
}

/// Manager UI URL for a story, e.g. `http://localhost:6006/?path=/story/button--primary`
pub fn preview_url(origin: &str, story: &FoundStory) -> String {
    format!(
        "{}/?path=/{}/{}{}",
        origin.trim_end_matches('/'),
        story.entry_type.path_segment(),
        story.id,
        query_suffix(story)
    )
}

/// Bare preview iframe URL for a story, used for embedding
pub fn iframe_url(origin: &str, story: &FoundStory) -> String {
    format!(
        "{}/iframe.html?id={}&viewMode={}{}",
        origin.trim_end_matches('/'),
        story.id,
        story.entry_type.path_segment(),
        query_suffix(story)
    )
}

/// Deep link into the accessibility panel for one violated rule of a story
pub fn a11y_panel_url(origin: &str, story_id: &str, rule_id: &str) -> String {
    format!(
        "{}/?path=/story/{}&addonPanel=storybook/a11y/panel&a11ySelection=violations.{}",
        origin.trim_end_matches('/'),
        story_id,
        rule_id
    )
}
