//! Digest document generation.
//!
//! The Markdown digest is produced as a sequence of lines so it can be
//! echoed, written to disk and mailed without re-parsing.

use crate::analysis::Categories;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

/// Render the categories as Markdown lines.
///
/// Sections appear in a fixed order and only when they have items. With
/// nothing to report the document is empty, title included.
pub fn render_markdown(categories: &Categories, title: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();

    if categories.is_empty() {
        return lines;
    }

    if let Some(title) = title {
        lines.push(format!("# {}", title));
        lines.push(String::new());
    }

    push_section(
        &mut lines,
        "Repos created",
        categories.repos_created.iter().map(|name| format!("- {}", name)),
    );

    push_section(
        &mut lines,
        "Commits pushed",
        categories
            .commits_pushed
            .iter()
            .map(|(repo, count)| format!("- {}: {}", repo, commit_noun(*count))),
    );

    lines
}

fn push_section(lines: &mut Vec<String>, heading: &str, items: impl Iterator<Item = String>) {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return;
    }

    lines.push(format!("## {}", heading));
    lines.push(String::new());
    lines.extend(items);
    lines.push(String::new());
    lines.push(String::new());
}

fn commit_noun(count: u64) -> String {
    if count == 1 {
        "1 commit".to_string()
    } else {
        format!("{} commits", count)
    }
}

/// Render the categories as pretty-printed JSON.
pub fn render_json(categories: &Categories) -> Result<String> {
    serde_json::to_string_pretty(categories).map_err(Into::into)
}

/// Subject line for the outbound message.
pub fn subject_line(prefix: &str, user: &str, date: NaiveDate) -> String {
    format!("{} for {} on {}", prefix, user, date.format("%Y-%m-%d"))
}

/// Write a rendered document to a file.
pub fn write_document(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write digest to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn categories(created: &[&str], pushed: &[(&str, u64)]) -> Categories {
        Categories {
            repos_created: created.iter().map(|s| s.to_string()).collect(),
            commits_pushed: pushed
                .iter()
                .map(|(repo, n)| (repo.to_string(), *n))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_render_both_sections_in_order() {
        let lines = render_markdown(&categories(&["x/y"], &[("a/b", 5)]), None);

        assert_eq!(
            lines,
            vec![
                "## Repos created",
                "",
                "- x/y",
                "",
                "",
                "## Commits pushed",
                "",
                "- a/b: 5 commits",
                "",
                "",
            ]
        );
    }

    #[test]
    fn test_empty_category_has_no_section() {
        let lines = render_markdown(&categories(&[], &[("a/b", 5)]), None);

        assert!(!lines.iter().any(|l| l.contains("Repos created")));
        assert_eq!(lines.iter().filter(|l| *l == "## Commits pushed").count(), 1);
        assert_eq!(lines.iter().filter(|l| l.starts_with("- ")).count(), 1);
        assert!(lines.contains(&"- a/b: 5 commits".to_string()));
    }

    #[test]
    fn test_nothing_to_report_renders_nothing() {
        assert!(render_markdown(&Categories::default(), Some("Digest")).is_empty());
    }

    #[test]
    fn test_title_and_singular_commit() {
        let lines = render_markdown(&categories(&[], &[("me/app", 1)]), Some("Activity"));

        assert_eq!(lines[0], "# Activity");
        assert_eq!(lines[1], "");
        assert!(lines.contains(&"- me/app: 1 commit".to_string()));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&categories(&["x/y"], &[("a/b", 5)])).unwrap();

        assert!(json.contains("\"repos_created\""));
        assert!(json.contains("\"a/b\": 5"));
    }

    #[test]
    fn test_subject_line() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(
            subject_line("GitHub activity", "octocat", date),
            "GitHub activity for octocat on 2024-03-02"
        );
    }

    #[test]
    fn test_write_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digest.md");

        write_document("## Commits pushed\n", &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "## Commits pushed\n"
        );
    }
}
