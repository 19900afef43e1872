use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;

/// Structural role a paragraph (or run) plays in a template.
///
/// Ordering is the order roles are emitted in JSON output: numbered title
/// levels, numbered body levels, the fixed special roles, numbered TOC
/// levels, then user-defined section roles by key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Title(u32),
    Body(u32),
    Special(SpecialRole),
    TocBody(u32),
    Section(String, SectionPart),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionPart {
    Title,
    Body,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecialRole {
    DocumentTitle,
    DocumentTitleEn,
    CoverTitle,
    CoverInfo,
    AbstractTitle,
    AbstractBody,
    AbstractEnTitle,
    AbstractEnBody,
    ReferenceTitle,
    ReferenceBody,
    KeywordLine,
    TocTitle,
    TocBody,
    FigureCaption,
    FigureBody,
    FigureNote,
    TableCaption,
    TableBody,
    TableNote,
    FootnoteText,
    FootnoteReference,
    FormulaBlock,
    FormulaInline,
    FormulaNumber,
    Superscript,
    Subscript,
}

/// Roles inside one group may not share a style, except for groups where
/// [`RoleGroup::allows_reuse`] holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleGroup {
    Title,
    Body,
    SpecialTitle,
    SpecialBody,
    Cover,
    Toc,
    Caption,
    Note,
}

impl RoleGroup {
    pub fn allows_reuse(self) -> bool {
        matches!(self, RoleGroup::Cover | RoleGroup::Toc)
    }
}

impl SpecialRole {
    pub const ALL: [SpecialRole; 26] = [
        SpecialRole::DocumentTitle,
        SpecialRole::DocumentTitleEn,
        SpecialRole::CoverTitle,
        SpecialRole::CoverInfo,
        SpecialRole::AbstractTitle,
        SpecialRole::AbstractBody,
        SpecialRole::AbstractEnTitle,
        SpecialRole::AbstractEnBody,
        SpecialRole::ReferenceTitle,
        SpecialRole::ReferenceBody,
        SpecialRole::KeywordLine,
        SpecialRole::TocTitle,
        SpecialRole::TocBody,
        SpecialRole::FigureCaption,
        SpecialRole::FigureBody,
        SpecialRole::FigureNote,
        SpecialRole::TableCaption,
        SpecialRole::TableBody,
        SpecialRole::TableNote,
        SpecialRole::FootnoteText,
        SpecialRole::FootnoteReference,
        SpecialRole::FormulaBlock,
        SpecialRole::FormulaInline,
        SpecialRole::FormulaNumber,
        SpecialRole::Superscript,
        SpecialRole::Subscript,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpecialRole::DocumentTitle => "document_title",
            SpecialRole::DocumentTitleEn => "document_title_en",
            SpecialRole::CoverTitle => "cover_title",
            SpecialRole::CoverInfo => "cover_info",
            SpecialRole::AbstractTitle => "abstract_title",
            SpecialRole::AbstractBody => "abstract_body",
            SpecialRole::AbstractEnTitle => "abstract_en_title",
            SpecialRole::AbstractEnBody => "abstract_en_body",
            SpecialRole::ReferenceTitle => "reference_title",
            SpecialRole::ReferenceBody => "reference_body",
            SpecialRole::KeywordLine => "keyword_line",
            SpecialRole::TocTitle => "toc_title",
            SpecialRole::TocBody => "toc_body",
            SpecialRole::FigureCaption => "figure_caption",
            SpecialRole::FigureBody => "figure_body",
            SpecialRole::FigureNote => "figure_note",
            SpecialRole::TableCaption => "table_caption",
            SpecialRole::TableBody => "table_body",
            SpecialRole::TableNote => "table_note",
            SpecialRole::FootnoteText => "footnote_text",
            SpecialRole::FootnoteReference => "footnote_reference",
            SpecialRole::FormulaBlock => "formula_block",
            SpecialRole::FormulaInline => "formula_inline",
            SpecialRole::FormulaNumber => "formula_number",
            SpecialRole::Superscript => "superscript",
            SpecialRole::Subscript => "subscript",
        }
    }

    fn from_name(name: &str) -> Option<SpecialRole> {
        SpecialRole::ALL.into_iter().find(|role| role.as_str() == name)
    }

    fn group(self) -> Option<RoleGroup> {
        use SpecialRole::*;
        match self {
            DocumentTitle | DocumentTitleEn | AbstractTitle | AbstractEnTitle | ReferenceTitle => {
                Some(RoleGroup::SpecialTitle)
            }
            AbstractBody | AbstractEnBody | ReferenceBody | KeywordLine | FigureBody
            | TableBody => Some(RoleGroup::SpecialBody),
            CoverTitle | CoverInfo => Some(RoleGroup::Cover),
            TocTitle | TocBody => Some(RoleGroup::Toc),
            FigureCaption | TableCaption => Some(RoleGroup::Caption),
            FigureNote | TableNote | FootnoteText | FootnoteReference => Some(RoleGroup::Note),
            FormulaBlock | FormulaInline | FormulaNumber | Superscript | Subscript => None,
        }
    }
}

pub(crate) const COVER_SECTION_KEY: &str = "cover";

impl Role {
    pub const BASE_TITLE: Role = Role::Title(1);
    pub const BASE_BODY: Role = Role::Body(1);

    /// Role for a title or body paragraph of a named section. The `cover`
    /// section maps onto the fixed cover roles.
    pub fn section(key: &str, part: SectionPart) -> Role {
        if key == COVER_SECTION_KEY {
            return match part {
                SectionPart::Title => Role::Special(SpecialRole::CoverTitle),
                SectionPart::Body => Role::Special(SpecialRole::CoverInfo),
            };
        }
        Role::Section(key.to_string(), part)
    }

    /// Parses and normalises a role name, accepting the legacy aliases
    /// `chapter_title` and `body` and any letter case.
    pub fn parse(raw: &str) -> Option<Role> {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "" => return None,
            "chapter_title" => return Some(Role::BASE_TITLE),
            "body" => return Some(Role::BASE_BODY),
            _ => {}
        }
        if let Some(level) = lower.strip_prefix("title_l").and_then(parse_level) {
            return Some(Role::Title(level));
        }
        if let Some(level) = lower.strip_prefix("body_l").and_then(parse_level) {
            return Some(Role::Body(level));
        }
        if let Some(level) = lower.strip_prefix("toc_body_l").and_then(parse_level) {
            return Some(Role::TocBody(level));
        }
        if let Some(special) = SpecialRole::from_name(&lower) {
            return Some(Role::Special(special));
        }
        let rest = lower.strip_prefix("section_")?;
        if let Some(key) = rest.strip_suffix("_title")
            && !key.is_empty()
        {
            return Some(Role::section(key, SectionPart::Title));
        }
        if let Some(key) = rest.strip_suffix("_body")
            && !key.is_empty()
        {
            return Some(Role::section(key, SectionPart::Body));
        }
        None
    }

    pub fn group(&self) -> Option<RoleGroup> {
        match self {
            Role::Title(_) => Some(RoleGroup::Title),
            Role::Body(_) => Some(RoleGroup::Body),
            Role::TocBody(_) => Some(RoleGroup::Toc),
            Role::Special(special) => special.group(),
            Role::Section(..) => None,
        }
    }

    pub fn title_level(&self) -> Option<u32> {
        match self {
            Role::Title(level) => Some(*level),
            _ => None,
        }
    }

    pub fn heading_level(&self) -> Option<u32> {
        match self {
            Role::Title(level) | Role::Body(level) => Some(*level),
            _ => None,
        }
    }

    pub(crate) fn is_special(&self, special: SpecialRole) -> bool {
        matches!(self, Role::Special(s) if *s == special)
    }
}

fn parse_level(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Title(level) => write!(f, "title_L{level}"),
            Role::Body(level) => write!(f, "body_L{level}"),
            Role::TocBody(level) => write!(f, "toc_body_L{level}"),
            Role::Special(special) => f.write_str(special.as_str()),
            Role::Section(key, SectionPart::Title) => write!(f, "section_{key}_title"),
            Role::Section(key, SectionPart::Body) => write!(f, "section_{key}_body"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| {
            Error::InvalidRoleMapping(format!(
                "expected title_Lk, body_Lk, toc_body_Lk, section_<key>_title|body or a special role, got {s:?}"
            ))
        })
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_aliases_and_case() {
        assert_eq!(Role::parse("title_L3"), Some(Role::Title(3)));
        assert_eq!(Role::parse(" BODY_l2 "), Some(Role::Body(2)));
        assert_eq!(Role::parse("chapter_title"), Some(Role::Title(1)));
        assert_eq!(Role::parse("body"), Some(Role::Body(1)));
        assert_eq!(Role::parse("toc_body_L2"), Some(Role::TocBody(2)));
        assert_eq!(Role::parse("title_L0"), None);
        assert_eq!(Role::parse("title_L01"), None);
        assert_eq!(Role::parse("heading"), None);
    }

    #[test]
    fn section_roles_round_trip_through_display() {
        let role = Role::parse("section_acknowledgement_body").unwrap();
        assert_eq!(role, Role::Section("acknowledgement".into(), SectionPart::Body));
        assert_eq!(role.to_string(), "section_acknowledgement_body");
        assert_eq!(
            Role::parse("section_cover_title"),
            Some(Role::Special(SpecialRole::CoverTitle))
        );
        assert_eq!(Role::parse("section__title"), None);
    }

    #[test]
    fn every_special_role_parses_back() {
        for special in SpecialRole::ALL {
            assert_eq!(Role::parse(special.as_str()), Some(Role::Special(special)));
        }
    }

    #[test]
    fn groups_and_reuse() {
        assert_eq!(Role::Title(4).group(), Some(RoleGroup::Title));
        assert_eq!(
            Role::Special(SpecialRole::KeywordLine).group(),
            Some(RoleGroup::SpecialBody)
        );
        assert_eq!(Role::Special(SpecialRole::FormulaBlock).group(), None);
        assert!(Role::TocBody(1).group().is_some_and(RoleGroup::allows_reuse));
        assert!(!RoleGroup::Caption.allows_reuse());
    }

    #[test]
    fn unknown_role_is_a_mapping_error() {
        assert!(matches!(
            "nonsense".parse::<Role>(),
            Err(Error::InvalidRoleMapping(_))
        ));
    }
}
