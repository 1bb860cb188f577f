use super::TestRunResult;
use crate::urls::a11y_panel_url;
use std::fmt::Write;

/// Options controlling which report sections are rendered
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub origin: String,
    pub a11y: bool,
}

/// Render a completed run as a markdown report.
///
/// Sections: passing stories, failing stories, accessibility violations (only
/// when enabled) and unhandled errors. Empty sections are omitted.
pub fn format_report(result: &TestRunResult, options: &ReportOptions) -> String {
    let mut sections: Vec<String> = Vec::new();

    let passing: Vec<&str> = result
        .component_test_statuses
        .iter()
        .filter(|status| status.is_success())
        .map(|status| status.story_id.as_str())
        .collect();
    if !passing.is_empty() {
        let mut section = String::from("## Passing Stories\n\n");
        for story_id in passing {
            let _ = writeln!(section, "- {}", story_id);
        }
        sections.push(section);
    }

    let failing: Vec<_> = result
        .component_test_statuses
        .iter()
        .filter(|status| status.is_error())
        .collect();
    if !failing.is_empty() {
        let mut section = String::from("## Failing Stories\n");
        for status in failing {
            let _ = write!(section, "\n### {}\n\n", status.story_id);
            let text = if status.description.is_empty() {
                "Test failed without a failure message."
            } else {
                status.description.as_str()
            };
            let _ = writeln!(section, "{}", text);
        }
        sections.push(section);
    }

    if options.a11y {
        let violation_section = format_a11y(result, &options.origin);
        if !violation_section.is_empty() {
            sections.push(violation_section);
        }
    }

    if !result.unhandled_errors.is_empty() {
        let mut section = String::from("## Unhandled Errors\n");
        for error in &result.unhandled_errors {
            let _ = write!(section, "\n### {}: {}\n\n", error.name, error.message);
            if let Some(path) = &error.test_path {
                let _ = writeln!(section, "- **File**: {}", path);
            }
            if let Some(name) = &error.test_name {
                let _ = writeln!(section, "- **Test**: {}", name);
            }
            if let Some(stack) = &error.stack {
                let _ = write!(section, "\n```\n{}\n```\n", stack.trim_end());
            }
        }
        sections.push(section);
    }

    if sections.is_empty() {
        return "No test results were reported.".to_string();
    }

    sections
        .iter()
        .map(|s| s.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_a11y(result: &TestRunResult, origin: &str) -> String {
    let mut section = String::new();

    for (story_id, reports) in &result.a11y_reports {
        let violations: Vec<_> = reports.iter().flat_map(|r| r.violations.iter()).collect();
        if violations.is_empty() {
            continue;
        }

        let _ = write!(section, "\n### {}\n", story_id);
        for violation in violations {
            let _ = write!(section, "\n#### {}\n\n", violation.id);
            let impact = violation.impact.as_deref().unwrap_or("unknown");
            let message = if violation.help.is_empty() {
                violation.description.as_str()
            } else {
                violation.help.as_str()
            };
            for node in &violation.nodes {
                let _ = writeln!(section, "- **Impact**: {}", impact);
                let _ = writeln!(section, "  **Message**: {}", message);
                let _ = writeln!(section, "  **Element**: `{}`", node.html);
                let _ = writeln!(
                    section,
                    "  **Inspect in Storybook**: {}",
                    a11y_panel_url(origin, story_id, &violation.id)
                );
            }
            if violation.nodes.is_empty() {
                let _ = writeln!(section, "- **Impact**: {}", impact);
                let _ = writeln!(section, "  **Message**: {}", message);
            }
        }
    }

    if section.is_empty() {
        section
    } else {
        format!("## Accessibility Violations\n{}", section)
    }
}
