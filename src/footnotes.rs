//! Footnote numbering and the footnote text/reference rules, read from
//! the settings and footnotes parts.

use std::collections::BTreeSet;

use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::docx::{FOOTNOTES_PART, FootnoteNumbering, Package, SETTINGS_PART, StyleCatalog, footnote_paragraphs};
use crate::model::StyleRule;
use crate::role::{Role, SpecialRole};
use crate::rule::build_style_rule;
use crate::sample::SampleStats;

const TEXT_STYLE_IDS: [&str; 2] = ["footnotetext", "footnote_text"];
const TEXT_STYLE_NAMES: [&str; 4] = ["footnote text", "脚注文本", "脚注正文", "脚注文字"];
const REFERENCE_STYLE_IDS: [&str; 2] = ["footnotereference", "footnote_reference"];
const REFERENCE_STYLE_NAMES: [&str; 5] = ["footnote reference", "脚注引用", "脚注标记", "脚注序号", "脚注编号"];

pub(crate) fn footnote_numbering(package: &Package, diagnostics: &mut Diagnostics) -> FootnoteNumbering {
    let Some(xml) = package.part(SETTINGS_PART) else {
        log::debug!("no {SETTINGS_PART}");
        return FootnoteNumbering::default();
    };
    match FootnoteNumbering::parse(xml) {
        Ok(numbering) => numbering.unwrap_or_default(),
        Err(e) => {
            diagnostics.push(Warning::new(
                WarningKind::FootnoteNumbering,
                format!("parse {SETTINGS_PART} failed ({e})"),
            ));
            FootnoteNumbering::default()
        }
    }
}

fn is_reference_style(style_id: Option<&str>) -> bool {
    style_id.is_some_and(|id| REFERENCE_STYLE_IDS.contains(&id.to_lowercase().as_str()))
}

/// The catalog style for a footnote role: a well-known id or name first,
/// then the first style id the footnotes themselves use.
fn find_style_id<'a>(
    catalog: &'a StyleCatalog,
    ids: &[&str],
    names: &[&str],
    used: &'a BTreeSet<String>,
) -> Option<&'a str> {
    catalog
        .styles()
        .iter()
        .find(|style| {
            ids.contains(&style.id.to_lowercase().as_str())
                || style
                    .name
                    .as_deref()
                    .is_some_and(|n| names.contains(&n.trim().to_lowercase().as_str()))
        })
        .map(|style| style.id.as_str())
        .or_else(|| used.iter().find(|id| catalog.contains(id)).map(String::as_str))
}

/// Rules for `footnote_text` and `footnote_reference`, sampled from the
/// real footnotes. A role is skipped when neither a style nor a sample
/// backs it.
pub(crate) fn footnote_rules(
    package: &Package,
    catalog: &StyleCatalog,
    diagnostics: &mut Diagnostics,
) -> Vec<(Role, StyleRule)> {
    let Some(xml) = package.part(FOOTNOTES_PART) else {
        log::debug!("no {FOOTNOTES_PART}");
        return Vec::new();
    };
    let paragraphs = match footnote_paragraphs(xml) {
        Ok(paragraphs) => paragraphs,
        Err(e) => {
            diagnostics.push(Warning::new(
                WarningKind::Footnotes,
                format!("parse {FOOTNOTES_PART} failed ({e})"),
            ));
            return Vec::new();
        }
    };

    let mut text_stats = SampleStats::default();
    let mut ref_stats = SampleStats::default();
    let mut text_ids = BTreeSet::new();
    let mut ref_ids = BTreeSet::new();
    for paragraph in &paragraphs {
        if let Some(id) = &paragraph.style_id {
            text_ids.insert(id.clone());
        }
        for run in &paragraph.runs {
            if let Some(id) = &run.style_id {
                ref_ids.insert(id.clone());
            }
            let weight = run.text.trim().chars().count().max(1) as f64;
            let stats = if run.footnote_ref || is_reference_style(run.style_id.as_deref()) {
                &mut ref_stats
            } else {
                &mut text_stats
            };
            stats.add_run(run, weight);
            stats.count += 1;
        }
    }
    log::debug!(
        "footnotes: {} paragraphs, {} text runs, {} reference runs",
        paragraphs.len(),
        text_stats.count,
        ref_stats.count
    );

    let mut rules = Vec::new();
    let targets = [
        (SpecialRole::FootnoteText, &TEXT_STYLE_IDS[..], &TEXT_STYLE_NAMES[..], &text_ids, &text_stats),
        (
            SpecialRole::FootnoteReference,
            &REFERENCE_STYLE_IDS[..],
            &REFERENCE_STYLE_NAMES[..],
            &ref_ids,
            &ref_stats,
        ),
    ];
    for (role, ids, names, used, stats) in targets {
        let style_id = find_style_id(catalog, ids, names, used);
        let sampled = stats.count > 0;
        let resolved = match style_id.map(|id| catalog.resolve(id)) {
            Some(Ok(resolved)) => resolved,
            _ if sampled => catalog.resolve_defaults(style_id.unwrap_or_default()),
            _ => continue,
        };
        let stats = sampled.then_some(stats);
        rules.push((Role::Special(role), build_style_rule(&resolved, stats, sampled)));
    }
    rules
}
