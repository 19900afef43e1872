//! The parse result and its JSON form.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classify::TitleSpacing;
use crate::diagnostics::Warning;
use crate::docx::FootnoteNumbering;
use crate::error::Error;
use crate::header_footer::HeaderFooterMeta;
use crate::layout::{PageMarginsMeta, TableBordersMeta};
use crate::model::StyleRule;
use crate::role::{Role, SectionPart, SpecialRole};
use crate::sections::SectionRule;

pub const SCHEMA_VERSION: &str = "2.0";

/// A title role and the body role it introduces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleLink {
    pub title_role: Role,
    pub body_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

const SECTION_PAIRS: [(SpecialRole, SpecialRole, &str); 5] = [
    (SpecialRole::AbstractTitle, SpecialRole::AbstractBody, "abstract"),
    (SpecialRole::AbstractEnTitle, SpecialRole::AbstractEnBody, "abstract_en"),
    (SpecialRole::ReferenceTitle, SpecialRole::ReferenceBody, "reference"),
    (SpecialRole::FigureCaption, SpecialRole::FigureNote, "figure"),
    (SpecialRole::TableCaption, SpecialRole::TableNote, "table"),
];

/// Links between emitted roles: heading levels first, then the special
/// families, then user sections by key.
pub(crate) fn role_links(rules: &BTreeMap<Role, StyleRule>) -> Vec<RoleLink> {
    let mut links = Vec::new();
    for role in rules.keys() {
        if let Role::Title(level) = role
            && rules.contains_key(&Role::Body(*level))
        {
            links.push(RoleLink {
                title_role: role.clone(),
                body_role: Role::Body(*level),
                level: Some(*level),
                section: None,
            });
        }
    }
    for (title, body, section) in SECTION_PAIRS {
        let (title, body) = (Role::Special(title), Role::Special(body));
        if rules.contains_key(&title) && rules.contains_key(&body) {
            links.push(RoleLink {
                title_role: title,
                body_role: body,
                level: None,
                section: Some(section.to_string()),
            });
        }
    }
    for role in rules.keys() {
        if let Role::Section(key, SectionPart::Title) = role {
            let body = Role::Section(key.clone(), SectionPart::Body);
            if rules.contains_key(&body) {
                links.push(RoleLink {
                    title_role: role.clone(),
                    body_role: body,
                    level: None,
                    section: Some(key.clone()),
                });
            }
        }
    }
    links
}

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct TocLevels {
    pub levels: Vec<u32>,
    pub styles: BTreeMap<u32, Vec<String>>,
}

impl TocLevels {
    pub fn new(observed: &BTreeMap<u32, BTreeSet<String>>) -> Self {
        TocLevels {
            levels: observed.keys().copied().collect(),
            styles: observed
                .iter()
                .filter(|(_, names)| !names.is_empty())
                .map(|(level, names)| (*level, names.iter().cloned().collect()))
                .collect(),
        }
    }
}

/// Everything besides the role rules: the effective configuration and
/// what was read from the rest of the package.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct Meta {
    pub max_heading_level: u32,
    pub detected_heading_levels: Vec<u32>,
    pub detected_heading_levels_overflow: Vec<u32>,
    pub required_roles: Vec<Role>,
    pub required_on_presence_map: BTreeMap<Role, Role>,
    pub allow_fallback: bool,
    pub strict: bool,
    pub template_type: String,
    pub section_rules: Vec<SectionRule>,
    pub cover_detection_enabled: bool,
    pub page_margins: PageMarginsMeta,
    pub table_borders: TableBordersMeta,
    pub title_spacing: BTreeMap<Role, TitleSpacing>,
    pub footnote_numbering: FootnoteNumbering,
    pub toc_levels: TocLevels,
    pub header_footer: HeaderFooterMeta,
}

/// Outcome of one successful parse.
#[derive(Clone, Debug)]
pub struct ParseResult {
    pub roles: BTreeMap<Role, StyleRule>,
    pub role_links: Vec<RoleLink>,
    /// Non-fatal findings, in the order they were raised.
    pub warnings: Vec<Warning>,
    pub(crate) meta: Meta,
}

#[derive(Serialize)]
struct Document<'a> {
    schema_version: &'static str,
    roles: &'a BTreeMap<Role, StyleRule>,
    role_links: &'a [RoleLink],
    meta: &'a Meta,
}

impl ParseResult {
    pub fn detected_heading_levels(&self) -> &[u32] {
        &self.meta.detected_heading_levels
    }

    pub fn detected_heading_levels_overflow(&self) -> &[u32] {
        &self.meta.detected_heading_levels_overflow
    }

    pub fn template_type(&self) -> &str {
        &self.meta.template_type
    }

    fn document(&self) -> Document<'_> {
        Document {
            schema_version: SCHEMA_VERSION,
            roles: &self.roles,
            role_links: &self.role_links,
            meta: &self.meta,
        }
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(self.document())?)
    }

    /// Pretty-printed schema JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.document())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(roles: &[&str]) -> BTreeMap<Role, StyleRule> {
        roles
            .iter()
            .map(|r| (Role::parse(r).unwrap(), StyleRule::default()))
            .collect()
    }

    #[test]
    fn links_levels_then_families_then_sections() {
        let rules = rules(&[
            "title_L2",
            "body_L2",
            "title_L1",
            "body_L1",
            "title_L3",
            "abstract_title",
            "abstract_body",
            "figure_caption",
            "section_original_statement_title",
            "section_original_statement_body",
            "section_acknowledgement_title",
        ]);
        let links = role_links(&rules);
        let pairs: Vec<(String, String)> = links
            .iter()
            .map(|l| (l.title_role.to_string(), l.body_role.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("title_L1".to_string(), "body_L1".to_string()),
                ("title_L2".to_string(), "body_L2".to_string()),
                ("abstract_title".to_string(), "abstract_body".to_string()),
                (
                    "section_original_statement_title".to_string(),
                    "section_original_statement_body".to_string()
                ),
            ]
        );
        assert_eq!(links[0].level, Some(1));
        assert_eq!(links[2].section.as_deref(), Some("abstract"));
        assert_eq!(links[3].section.as_deref(), Some("original_statement"));
    }

    #[test]
    fn toc_levels_list_names_per_level() {
        let observed = BTreeMap::from([
            (1, BTreeSet::from(["toc 1".to_string()])),
            (2, BTreeSet::new()),
        ]);
        let toc = TocLevels::new(&observed);
        let json = serde_json::to_value(&toc).unwrap();
        assert_eq!(json["levels"], serde_json::json!([1, 2]));
        assert_eq!(json["styles"], serde_json::json!({"1": ["toc 1"]}));
    }
}
