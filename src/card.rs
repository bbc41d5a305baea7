use std::collections::BTreeSet;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::dataset::AirlineRecord;
use crate::domain::DirectoryConfig;

const VALUE_INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Preview,
    Link,
    Heading,
    Label,
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardLine {
    pub kind: LineKind,
    pub highlighted: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Filtered,
    Important,
    Additional,
}

impl GroupKind {
    pub fn title(self) -> &'static str {
        match self {
            GroupKind::Filtered => "Filtered Fields:",
            GroupKind::Important => "Important Information:",
            GroupKind::Additional => "Additional Information:",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    pub kind: GroupKind,
    pub entries: Vec<FieldEntry>,
}

/// Everything needed to draw one airline card, in either its collapsed or
/// expanded form.
#[derive(Debug, Clone, PartialEq)]
pub struct CardContent {
    pub name: String,
    pub field_count: usize,
    pub expanded: bool,
    pub preview: Vec<FieldEntry>,
    pub link: Option<String>,
    pub groups: Vec<FieldGroup>,
}

/// `dress_code` -> `dress code`
pub fn field_label(key: &str) -> String {
    key.replace('_', " ")
}

pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let mut short: String = value.chars().take(width).collect();
        short.push_str("...");
        short
    } else {
        value.to_string()
    }
}

fn entry(key: &str, value: &str) -> FieldEntry {
    FieldEntry {
        label: field_label(key),
        value: value.to_string(),
    }
}

pub fn build_card(
    record: &AirlineRecord,
    selected: &BTreeSet<String>,
    expanded: bool,
    config: &DirectoryConfig,
) -> CardContent {
    // Important fields that carry a value, in priority order
    let important: Vec<(&str, &str)> = config
        .important_fields
        .iter()
        .filter_map(|f| record.value(f).map(|v| (f.as_str(), v)))
        .collect();

    let mut card = CardContent {
        name: record.name().to_string(),
        field_count: record.field_count(),
        expanded,
        preview: Vec::new(),
        link: None,
        groups: Vec::new(),
    };

    if !expanded {
        card.preview = important
            .iter()
            .take(config.preview_fields)
            .map(|&(key, value)| entry(key, &truncate(value, config.preview_width)))
            .collect();
        return card;
    }

    card.link = record.link().map(str::to_string);

    let filtered: Vec<FieldEntry> = record
        .fields()
        .iter()
        .filter(|(key, _)| selected.contains(key))
        .map(|(key, value)| entry(key, value))
        .collect();
    let additional: Vec<FieldEntry> = record
        .fields()
        .iter()
        .filter(|(key, _)| !config.important_fields.contains(key))
        .map(|(key, value)| entry(key, value))
        .collect();
    let important: Vec<FieldEntry> = important
        .iter()
        .map(|&(key, value)| entry(key, value))
        .collect();

    for (kind, entries) in [
        (GroupKind::Filtered, filtered),
        (GroupKind::Important, important),
        (GroupKind::Additional, additional),
    ] {
        if !entries.is_empty() {
            card.groups.push(FieldGroup { kind, entries });
        }
    }
    card
}

/// Greedy word wrap on display columns. Words wider than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_width = 0;
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.width() > width {
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                let (head, rest) = split_at_width(&word, width);
                lines.push(head.to_string());
                word = rest.to_string();
            }
            let word_width = word.width();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current_width += word_width;
            current.push_str(&word);
        }
        if current_width > 0 {
            lines.push(current);
        }
    }
    lines
}

// Longest prefix fitting in `width` columns, at least one char so wide
// glyphs in a one column box still make progress.
fn split_at_width(word: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    for (idx, c) in word.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > width && idx > 0 {
            return word.split_at(idx);
        }
        used += w;
    }
    (word, "")
}

impl CardContent {
    pub fn badge(&self) -> String {
        format!("{} fields", self.field_count)
    }

    fn push(
        lines: &mut Vec<CardLine>,
        kind: LineKind,
        highlighted: bool,
        text: &str,
        width: usize,
    ) {
        let indent = if kind == LineKind::Value { VALUE_INDENT } else { "" };
        for line in wrap_text(text, width.saturating_sub(indent.width())) {
            lines.push(CardLine {
                kind,
                highlighted,
                text: format!("{indent}{line}"),
            });
        }
    }

    /// Body lines of the card wrapped to `width`, without the border and title.
    pub fn lines(&self, width: usize) -> Vec<CardLine> {
        let mut lines = Vec::new();
        if !self.expanded {
            for e in self.preview.iter() {
                let text = format!("{}: {}", e.label, e.value);
                Self::push(&mut lines, LineKind::Preview, false, &text, width);
            }
            return lines;
        }

        if let Some(link) = &self.link {
            let text = format!("Link: {link}");
            Self::push(&mut lines, LineKind::Link, false, &text, width);
        }
        for group in self.groups.iter() {
            let highlighted = group.kind == GroupKind::Filtered;
            let title = group.kind.title();
            Self::push(&mut lines, LineKind::Heading, highlighted, title, width);
            for e in group.entries.iter() {
                let label = format!("{}:", e.label);
                Self::push(&mut lines, LineKind::Label, highlighted, &label, width);
                Self::push(&mut lines, LineKind::Value, highlighted, &e.value, width);
            }
        }
        lines
    }

    /// Rendered height including the top and bottom border.
    pub fn height(&self, width: usize) -> usize {
        self.lines(width.saturating_sub(2)).len() + 2
    }
}
