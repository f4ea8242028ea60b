//! Carving free-form model output into a [`DigestContent`].
//!
//! Two passes: a JSON object anywhere in the text wins; otherwise the text is
//! read line by line, with headings switching between the overview, decision
//! and action-item sections. When neither yields an overview, the raw text is
//! used as the overview so a digest is never empty.

use recap_types::models::{ActionItem, DigestContent};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Overview,
    Decisions,
    Actions,
}

#[derive(Debug, Deserialize)]
struct JsonDigest {
    #[serde(default, alias = "summary")]
    overview: Option<String>,
    #[serde(default, alias = "decisions", alias = "keyDecisions")]
    key_decisions: Vec<String>,
    #[serde(default, alias = "actions", alias = "actionItems")]
    action_items: Vec<ActionItem>,
}

pub fn parse_digest(raw: &str) -> DigestContent {
    let summary = raw.trim().to_string();

    let mut content = parse_json(&summary).unwrap_or_else(|| parse_sections(&summary));
    if content.overview.is_empty() {
        content.overview = summary.clone();
    }
    content.summary = summary;
    content
}

fn parse_json(text: &str) -> Option<DigestContent> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    let parsed: JsonDigest = serde_json::from_str(&text[start..=end]).ok()?;
    let overview = parsed.overview.unwrap_or_default().trim().to_string();
    if overview.is_empty() && parsed.key_decisions.is_empty() && parsed.action_items.is_empty() {
        return None;
    }

    Some(DigestContent {
        overview,
        key_decisions: parsed
            .key_decisions
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !is_placeholder(d))
            .collect(),
        action_items: parsed
            .action_items
            .into_iter()
            .filter(|a| !is_placeholder(&a.task))
            .collect(),
        summary: String::new(),
    })
}

fn parse_sections(text: &str) -> DigestContent {
    let mut section = Section::Preamble;
    let mut overview: Vec<String> = Vec::new();
    let mut decisions = Vec::new();
    let mut actions = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || is_rule(line) {
            continue;
        }

        let (body, is_item) = match bullet(line) {
            Some(item) => (item, true),
            None => match heading(line) {
                Some((next, rest)) => {
                    section = next;
                    if rest.is_empty() {
                        continue;
                    }
                    (rest, false)
                }
                None => (line, false),
            },
        };

        let body = clean(body);
        if body.is_empty() {
            continue;
        }

        match section {
            Section::Overview if !is_item => overview.push(body),
            Section::Decisions if !is_placeholder(&body) => decisions.push(body),
            Section::Actions if !is_placeholder(&body) => actions.push(parse_action_item(&body)),
            _ => {}
        }
    }

    DigestContent {
        overview: overview.join(" "),
        key_decisions: decisions,
        action_items: actions,
        summary: String::new(),
    }
}

const SECTION_LABELS: [&str; 10] = [
    "overview",
    "summary",
    "meeting summary",
    "decisions",
    "key decisions",
    "action items",
    "actions",
    "tasks",
    "next steps",
    "follow-ups",
];

/// Recognise a section heading such as `OVERVIEW:`, `## Key Decisions` or
/// `**Action Items:** none`. Returns the section and any text after the colon.
///
/// A bare line only counts when it ends in a colon, carries markdown heading
/// markup, or is exactly a known label; `No decisions were made.` is prose.
fn heading(line: &str) -> Option<(Section, &str)> {
    let marked = line.starts_with('#') || line.starts_with("**") || line.starts_with("__");
    let stripped = strip_numbering(line.trim_start_matches(['#', '*', '_', ' ']));
    let (label, rest, colon) = match stripped.split_once(':') {
        Some((label, rest)) => (label, rest, true),
        None => (stripped, "", false),
    };

    let label = label.trim_matches(['*', '_', '#', ' ']).to_lowercase();
    if label.is_empty() || label.chars().count() > 40 || label.split_whitespace().count() > 5 {
        return None;
    }
    if !colon && !marked && !SECTION_LABELS.contains(&label.as_str()) {
        return None;
    }

    let section = if label.contains("action") || label.contains("task") || label.contains("next step") || label.contains("follow") {
        Section::Actions
    } else if label.contains("decision") {
        Section::Decisions
    } else if label.contains("overview") || label.contains("summary") {
        Section::Overview
    } else {
        return None;
    };

    Some((section, rest.trim_matches(['*', '_', ' '])))
}

/// Body of a `-`, `*`, `•`, `+` or `1.` list item.
fn bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• ", "+ ", "•", "-"] {
        if let Some(rest) = line.strip_prefix(marker) {
            // `--x` is not a list item
            if marker == "-" && rest.starts_with('-') {
                return None;
            }
            return Some(rest.trim());
        }
    }

    let numbered = strip_numbering(line);
    if numbered.len() != line.len() && heading(line).is_none() {
        return Some(numbered);
    }
    None
}

/// Drop a leading `1.` / `2)` list number.
fn strip_numbering(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(['.', ')']) {
        Some(rest) if rest.starts_with(' ') => rest.trim_start(),
        _ => line,
    }
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '*' | '_' | '='))
}

fn is_placeholder(item: &str) -> bool {
    let item = item.trim().trim_end_matches('.').to_lowercase();
    matches!(
        item.as_str(),
        "" | "none" | "n/a" | "na" | "none identified" | "none mentioned" | "no decisions" | "no action items"
    )
}

fn clean(text: &str) -> String {
    text.replace("**", "").replace("__", "").trim().to_string()
}

const ASSIGNEE_MARKERS: [&str; 5] = ["assigned to", "assignee", "owner", "responsible", "-> "];

/// Split `Draft the budget - Assigned to: Ana` or `Draft the budget (Ana)`
/// into task and assignee.
pub fn parse_action_item(text: &str) -> ActionItem {
    let text = text.trim();
    // ASCII lowering keeps byte offsets aligned with `text`
    let lower = text.to_ascii_lowercase();

    for marker in ASSIGNEE_MARKERS {
        for (idx, _) in lower.match_indices(marker) {
            if !is_assignee_marker(&lower, idx, marker) {
                continue;
            }
            let task = text[..idx].trim_end_matches(['-', '–', '—', '(', '[', ',', ';', ':', '|', ' ']);
            let who = text[idx + marker.len()..]
                .trim_start_matches([':', ' ', '-', '–', '—'])
                .trim_end_matches([')', ']', '.', ' ']);
            if !task.is_empty() && !who.is_empty() {
                return ActionItem::new(task, Some(who.to_string()));
            }
        }
    }

    if let Some(stripped) = text.strip_suffix(')') {
        if let Some(open) = stripped.rfind('(') {
            let task = stripped[..open].trim_end();
            let who = stripped[open + 1..].trim();
            let plausible_name = !who.is_empty()
                && who.split_whitespace().count() <= 3
                && !who.chars().any(|c| c.is_ascii_digit())
                && who.chars().next().is_some_and(char::is_uppercase);
            if !task.is_empty() && plausible_name {
                return ActionItem::new(task, Some(who.to_string()));
            }
        }
    }

    ActionItem::new(text, None)
}

/// A marker word only names an owner when it stands alone (not `homeowner`,
/// not `ownership`) and is either labelled (`owner:`, `Responsible -`) or
/// set off from the task (`task - assigned to Ana`, `task (owner Ana)`).
fn is_assignee_marker(lower: &str, idx: usize, marker: &str) -> bool {
    if marker == "-> " {
        return true;
    }

    let before = &lower[..idx];
    let after = &lower[idx + marker.len()..];
    let word_start = before.chars().next_back().is_none_or(|c| !c.is_alphanumeric());
    let word_end = after.chars().next().is_some_and(|c| !c.is_alphanumeric());
    if !word_start || !word_end {
        return false;
    }

    let labelled = after.trim_start().starts_with([':', '-', '–', '—']);
    let trimmed = before.trim_end();
    let set_off = trimmed.ends_with(['(', '[', '|'])
        || (trimmed.ends_with(['-', '–', '—', ',', ';']) && before.ends_with(' '));
    labelled || set_off
}
