//! Header and footer formatting per document section.

use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::docx::{Body, HeaderFooterKind, HeaderFooterPart, Package, StyleCatalog};
use crate::layout::{LogicalPart, MarginSection};
use crate::model::StyleRule;
use crate::rule::build_style_rule;
use crate::sample::SampleStats;

const VARIANTS: [&str; 3] = ["default", "first", "even"];

#[derive(Clone, Debug, Serialize)]
pub(crate) struct HeaderFooterEntry {
    #[serde(rename = "type")]
    pub variant: &'static str,
    pub style: StyleRule,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct HeaderFooterSection {
    pub index: usize,
    pub logical_part: Option<LogicalPart>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderFooterEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub footers: Vec<HeaderFooterEntry>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct HeaderFooterSummary {
    pub sections: usize,
    pub header_sections: usize,
    pub footer_sections: usize,
    pub headers: usize,
    pub footers: usize,
}

/// Serialises as `{}` when no section has a non-blank header or footer.
#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct HeaderFooterMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<HeaderFooterSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<HeaderFooterSection>,
}

/// Loads and caches header/footer parts by relationship id.
struct PartLoader<'a> {
    package: &'a Package,
    relationships: HashMap<String, String>,
    parsed: HashMap<String, Option<HeaderFooterPart>>,
}

impl PartLoader<'_> {
    fn load(&mut self, rel_id: &str, diagnostics: &mut Diagnostics) -> Option<&HeaderFooterPart> {
        if !self.parsed.contains_key(rel_id) {
            let part = self.read(rel_id, diagnostics);
            self.parsed.insert(rel_id.to_string(), part);
        }
        self.parsed.get(rel_id)?.as_ref()
    }

    fn read(&self, rel_id: &str, diagnostics: &mut Diagnostics) -> Option<HeaderFooterPart> {
        let Some(name) = self.relationships.get(rel_id) else {
            diagnostics.push(Warning::new(
                WarningKind::HeaderFooter,
                format!("unknown relationship {rel_id}"),
            ));
            return None;
        };
        let Some(xml) = self.package.part(name) else {
            diagnostics.push(Warning::new(WarningKind::HeaderFooter, format!("missing {name}")));
            return None;
        };
        match HeaderFooterPart::parse(xml) {
            Ok(part) => Some(part),
            Err(e) => {
                diagnostics.push(Warning::new(
                    WarningKind::HeaderFooter,
                    format!("parse {name} failed ({e})"),
                ));
                None
            }
        }
    }
}

/// Samples every non-blank paragraph of a part and builds a rule from the
/// samples over the part's most used paragraph style.
fn part_rule(part: &HeaderFooterPart, catalog: &StyleCatalog, diagnostics: &mut Diagnostics) -> Option<StyleRule> {
    let mut stats = SampleStats::default();
    let mut style_counts: Vec<(&str, usize)> = Vec::new();
    for (index, paragraph) in (1..).zip(part.paragraphs.iter().filter(|p| !p.is_blank())) {
        let style = catalog.paragraph_style(paragraph.style_id.as_deref());
        if let Some(style) = style {
            match style_counts.iter_mut().find(|(id, _)| *id == style.id) {
                Some((_, count)) => *count += 1,
                None => style_counts.push((style.id.as_str(), 1)),
            }
        }
        stats.note_paragraph(paragraph, index, style.and_then(|s| s.name.as_deref()));
        if stats.add_paragraph_format(paragraph, style.and_then(|s| s.props.alignment)) {
            diagnostics.push(
                Warning::new(WarningKind::LineSpacing, "inferred EXACTLY due to missing lineRule")
                    .with_style(style.map(|s| s.id.as_str()).unwrap_or_default())
                    .at_paragraph(index),
            );
        }
        stats.add_runs(&paragraph.runs);
    }
    if stats.count == 0 {
        return None;
    }

    let mut top: Option<(&str, usize)> = None;
    for &(id, count) in &style_counts {
        if top.is_none_or(|(_, best)| count > best) {
            top = Some((id, count));
        }
    }
    let style_id = top.map(|(id, _)| id).unwrap_or_default();
    let resolved = match catalog.resolve(style_id) {
        Ok(resolved) => resolved,
        Err(_) => catalog.resolve_defaults(style_id),
    };
    Some(build_style_rule(&resolved, Some(&stats), true))
}

/// Header and footer variants of every section. A section without its own
/// reference for a variant inherits the previous section's.
pub(crate) fn header_footer(
    package: &Package,
    body: &Body,
    catalog: &StyleCatalog,
    margin_sections: &[MarginSection],
    diagnostics: &mut Diagnostics,
) -> HeaderFooterMeta {
    if body.sections.iter().all(|s| s.references.is_empty()) {
        return HeaderFooterMeta::default();
    }
    let relationships = match package.document_relationships() {
        Ok(relationships) => relationships,
        Err(e) => {
            diagnostics.push(Warning::new(
                WarningKind::HeaderFooter,
                format!("parse document relationships failed ({e})"),
            ));
            return HeaderFooterMeta::default();
        }
    };
    let mut loader = PartLoader {
        package,
        relationships,
        parsed: HashMap::new(),
    };

    let mut inherited: HashMap<(HeaderFooterKind, &str), String> = HashMap::new();
    let mut summary = HeaderFooterSummary {
        sections: body.sections.len(),
        ..HeaderFooterSummary::default()
    };
    let mut sections = Vec::new();
    for (index, section) in (1..).zip(&body.sections) {
        for reference in &section.references {
            if let Some(variant) = VARIANTS.into_iter().find(|v| *v == reference.variant) {
                inherited.insert((reference.kind, variant), reference.rel_id.clone());
            }
        }

        let mut entries = |kind: HeaderFooterKind, diagnostics: &mut Diagnostics| {
            let mut items = Vec::new();
            for variant in VARIANTS {
                let Some(rel_id) = inherited.get(&(kind, variant)) else {
                    continue;
                };
                let Some(part) = loader.load(rel_id, diagnostics) else {
                    continue;
                };
                if !part.has_content() {
                    continue;
                }
                if let Some(style) = part_rule(part, catalog, diagnostics) {
                    items.push(HeaderFooterEntry { variant, style });
                }
            }
            items
        };
        let headers = entries(HeaderFooterKind::Header, diagnostics);
        let footers = entries(HeaderFooterKind::Footer, diagnostics);

        if !headers.is_empty() {
            summary.header_sections += 1;
            summary.headers += headers.len();
        }
        if !footers.is_empty() {
            summary.footer_sections += 1;
            summary.footers += footers.len();
        }
        if headers.is_empty() && footers.is_empty() {
            continue;
        }
        sections.push(HeaderFooterSection {
            index,
            logical_part: margin_sections.get(index - 1).map(|s| s.logical_part),
            headers,
            footers,
        });
    }

    if sections.is_empty() {
        return HeaderFooterMeta::default();
    }
    log::debug!(
        "header/footer: {} headers, {} footers over {} sections",
        summary.headers,
        summary.footers,
        summary.sections
    );
    HeaderFooterMeta {
        summary: Some(summary),
        sections,
    }
}
