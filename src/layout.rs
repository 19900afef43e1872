//! Page-margin sections and table-border classification.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::Settings;
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::docx::{Body, PageMargins, StyleCatalog, TableBorders};
use crate::patterns;
use crate::role::COVER_SECTION_KEY;
use crate::sections::{self, SectionPosition, SectionRule};

const DEFAULT_STATEMENT_KEYWORDS: [&str; 6] = ["声明", "授权", "原创", "独创性", "学位论文原创性", "版权"];
const DEFAULT_BACK_KEYWORDS: [&str; 5] = ["参考文献", "致谢", "鸣谢", "附录", "参考资料"];

/// Which part of a thesis a section holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LogicalPart {
    Cover,
    Statement,
    Main,
    Back,
    Unknown,
}

impl LogicalPart {
    fn as_str(self) -> &'static str {
        match self {
            LogicalPart::Cover => "cover",
            LogicalPart::Statement => "statement",
            LogicalPart::Main => "main",
            LogicalPart::Back => "back",
            LogicalPart::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct MarginSection {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub margins: PageMargins,
    pub logical_part: LogicalPart,
}

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct PageMarginsMeta {
    pub sections: Vec<MarginSection>,
    pub summary: BTreeMap<&'static str, usize>,
}

struct PartKeywords {
    cover: BTreeSet<String>,
    statement: BTreeSet<String>,
    back: BTreeSet<String>,
}

impl PartKeywords {
    fn from_rules(rules: &[SectionRule]) -> Self {
        let mut keywords = PartKeywords {
            cover: BTreeSet::new(),
            statement: BTreeSet::new(),
            back: BTreeSet::new(),
        };
        for rule in rules {
            if rule.key == COVER_SECTION_KEY {
                keywords.cover.extend(rule.title_keywords.iter().cloned());
                keywords.cover.extend(rule.content_keywords.iter().cloned());
            }
            match rule.position {
                SectionPosition::Front | SectionPosition::FirstPage
                    if rule.key.to_lowercase().contains("statement")
                        || rule.display_name.contains("声明") =>
                {
                    keywords.statement.extend(rule.title_keywords.iter().cloned());
                }
                SectionPosition::Back | SectionPosition::LastPage => {
                    keywords.back.extend(rule.title_keywords.iter().cloned());
                }
                _ => {}
            }
        }
        if keywords.statement.is_empty() {
            keywords.statement = DEFAULT_STATEMENT_KEYWORDS.map(String::from).into();
        }
        if keywords.back.is_empty() {
            keywords.back = DEFAULT_BACK_KEYWORDS.map(String::from).into();
        }
        keywords
    }
}

fn contains_any(text: &str, keywords: &BTreeSet<String>) -> bool {
    keywords.iter().any(|kw| sections::keyword_matches(text, kw))
}

/// Paragraph numbers carrying a hint about the part they belong to.
#[derive(Default)]
struct Markers {
    cover: Vec<usize>,
    statement: Vec<usize>,
    main: Vec<usize>,
    back: Vec<usize>,
}

impl Markers {
    fn collect(texts: &[(usize, String)], keywords: &PartKeywords, cover_detection: bool) -> Self {
        let mut markers = Markers::default();
        for (index, text) in texts {
            if cover_detection && contains_any(text, &keywords.cover) {
                markers.cover.push(*index);
            }
            if patterns::is_reference(text) || contains_any(text, &keywords.back) {
                markers.back.push(*index);
            }
            if contains_any(text, &keywords.statement) {
                markers.statement.push(*index);
            }
            if patterns::heading_level_from_text(text).is_some() {
                markers.main.push(*index);
            }
        }
        markers
    }

    fn classify(&self, start: usize, end: usize) -> LogicalPart {
        let within = |marks: &[usize]| start > 0 && end > 0 && marks.iter().any(|i| (start..=end).contains(i));
        if within(&self.statement) {
            return LogicalPart::Statement;
        }
        if within(&self.back) {
            return LogicalPart::Back;
        }
        if within(&self.cover) {
            return LogicalPart::Cover;
        }
        if within(&self.main) {
            return LogicalPart::Main;
        }
        if self.back.first().is_some_and(|&first| start >= first) {
            return LogicalPart::Back;
        }
        match self.main.first() {
            Some(&first) if end < first => LogicalPart::Cover,
            Some(&first) if start >= first => LogicalPart::Main,
            _ => LogicalPart::Unknown,
        }
    }
}

/// One entry per section, each labelled with the logical part it most
/// likely holds.
pub(crate) fn page_margins(body: &Body, settings: &Settings, diagnostics: &mut Diagnostics) -> PageMarginsMeta {
    if body.sections.is_empty() {
        diagnostics.push(Warning::new(
            WarningKind::PageMargins,
            "document has no section properties",
        ));
        return PageMarginsMeta::default();
    }
    let keywords = PartKeywords::from_rules(&settings.section_rules);
    let markers = Markers::collect(&body.numbered_texts, &keywords, settings.cover_detection);

    let sections: Vec<MarginSection> = (1..)
        .zip(body.margin_sections())
        .map(|(index, section)| MarginSection {
            index,
            start: section.start,
            end: section.end,
            margins: section.margins.clone(),
            logical_part: markers.classify(section.start, section.end),
        })
        .collect();
    if sections.is_empty() {
        return PageMarginsMeta::default();
    }

    let mut summary = BTreeMap::from([("sections", sections.len())]);
    let mut distinct: Vec<&PageMargins> = Vec::new();
    for section in &sections {
        if !distinct.contains(&&section.margins) {
            distinct.push(&section.margins);
        }
        *summary.entry(section.logical_part.as_str()).or_default() += 1;
    }
    summary.insert("distinct_margins", distinct.len());
    PageMarginsMeta { sections, summary }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct TableEntry {
    pub index: usize,
    pub style_id: Option<String>,
    pub style_name: Option<String>,
    pub pattern: &'static str,
    pub borders: Option<TableBorders>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct TableBordersMeta {
    pub summary: BTreeMap<&'static str, usize>,
    pub tables: Vec<TableEntry>,
}

/// Classifies every table by its border pattern. A table without borders
/// of its own shows those of its table style.
pub(crate) fn table_borders(body: &Body, catalog: &StyleCatalog, diagnostics: &mut Diagnostics) -> TableBordersMeta {
    let mut meta = TableBordersMeta::default();
    for (index, table) in (1..).zip(&body.tables) {
        let style_id = table.style_id.as_deref();
        if let Some(id) = style_id
            && !catalog.has_table_style(id)
        {
            diagnostics.push(
                Warning::new(WarningKind::TableBorders, format!("table {index} uses undefined table style"))
                    .with_style(id),
            );
        }
        let borders = match table.borders.filter(TableBorders::any) {
            Some(own) => Some(own),
            None => style_id
                .and_then(|id| catalog.table_style_borders(id))
                .or(table.borders),
        };
        let pattern = borders.unwrap_or_default().pattern();
        *meta.summary.entry(pattern).or_default() += 1;
        meta.tables.push(TableEntry {
            index,
            style_id: table.style_id.clone(),
            style_name: style_id.and_then(|id| catalog.table_style_name(id)).map(str::to_string),
            pattern,
            borders,
        });
    }
    meta
}
