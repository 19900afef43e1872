//! Text and style-name patterns used to recognise structural paragraphs.

use std::sync::LazyLock;

use regex::Regex;

use crate::role::{Role, SpecialRole};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid built-in regex")
}

static ABSTRACT: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*(摘要|abstract)\s*$"));
static ABSTRACT_EN: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*abstract\s*$"));
static INLINE_ABSTRACT: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)^\s*(摘要|abstract)\s*[:：]\s*\S+"));
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*(参考文献|references)\s*$"));
static KEYWORD: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*(关键词|key\s*words?)\s*[:：]?"));
static TOC: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*目\s*录\s*$|^\s*contents\s*$"));
static FIGURE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)^\s*(图\s*\d+|figure\s*\d+|fig\.\s*\d+)\b"));
static TABLE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)^\s*(表\s*\d+|table\s*\d+|tab\.\s*\d+)\b"));
static CHAPTER: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^\s*第[一二三四五六七八九十百千0-9]+章\b"));
static NUMBER_HEADING: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*(\d+(?:\.\d+)*)\s+\S+"));
static CN_LEVEL1: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*[一二三四五六七八九十]+[、.]\s*"));
static CN_LEVEL2: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*（[一二三四五六七八九十]+）\s*"));
static ENGLISH_TITLE: LazyLock<Regex> = LazyLock::new(|| regex(r"^[A-Za-z][A-Za-z0-9\s,:;()\-]+$"));
static NOTE: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^\s*(注|note|来源|source)[:：]?"));
static FORMULA_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| regex(r"[\(（]\s*\d+(?:\.\d+)*\s*[\)）]"));
static TOC_NUMBER: LazyLock<Regex> = LazyLock::new(|| regex(r"^\s*(\d+(?:\.\d+)*)\b"));
static TOC_TAB_PAGE: LazyLock<Regex> = LazyLock::new(|| regex(r"\t\s*\d+\s*$"));
static TOC_DOT_LEADER: LazyLock<Regex> = LazyLock::new(|| regex(r"\.{2,}\s*\d+\s*$"));
static TRAILING_PAGE: LazyLock<Regex> = LazyLock::new(|| regex(r"\d+\s*$"));

static TOC_LEVEL_NAMES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\btoc\s*([1-9]\d*)\b",
        r"(?i)\btoc([1-9]\d*)\b",
        r"(?i)\bcontents?\s*([1-9]\d*)\b",
        r"目录\s*([1-9]\d*)",
        r"目录([1-9]\d*)",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

static HEADING_NAMES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bheading\s*([1-9]\d*)\b",
        r"(?i)\btitle\s*([1-9]\d*)\b",
        r"(?i)\bchapter\s*([1-9]\d*)\b",
        r"标题\s*([1-9]\d*)",
        r"标题\s*([一二三四五六七八九十])",
        r"([一二三四五六七八九十])\s*级标题",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

static BARE_CHAPTER: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bchapter\b"));

const BODY_KEYWORDS: [&str; 4] = ["正文", "normal", "body", "text"];
const CAPTION_DIRECTORY_TERMS: [&str; 5] = ["图表目录", "图表清单", "图表列表", "图表索引", "图表说明"];
const NOTE_STYLE_KEYWORDS: [&str; 3] = ["注", "note", "captionnote"];
const REFERENCE_NAME_KEYWORDS: [&str; 3] = ["参考文献", "references", "bibliography"];

/// Figure or table, for captions and their notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    Figure,
    Table,
}

impl ObjectKind {
    pub fn caption_role(self) -> Role {
        match self {
            ObjectKind::Figure => Role::Special(SpecialRole::FigureCaption),
            ObjectKind::Table => Role::Special(SpecialRole::TableCaption),
        }
    }

    pub fn note_role(self) -> Role {
        match self {
            ObjectKind::Figure => Role::Special(SpecialRole::FigureNote),
            ObjectKind::Table => Role::Special(SpecialRole::TableNote),
        }
    }
}

fn chinese_numeral(ch: &str) -> Option<u32> {
    let level = match ch {
        "一" => 1,
        "二" => 2,
        "三" => 3,
        "四" => 4,
        "五" => 5,
        "六" => 6,
        "七" => 7,
        "八" => 8,
        "九" => 9,
        "十" => 10,
        _ => return None,
    };
    Some(level)
}

fn captured_level(regex: &Regex, text: &str) -> Option<u32> {
    let digits = regex.captures(text)?.get(1)?.as_str();
    digits.parse().ok().or_else(|| chinese_numeral(digits))
}

pub(crate) fn is_abstract(text: &str) -> bool {
    ABSTRACT.is_match(text)
}

pub(crate) fn is_abstract_en(text: &str) -> bool {
    ABSTRACT_EN.is_match(text)
}

pub(crate) fn is_reference(text: &str) -> bool {
    REFERENCE.is_match(text)
}

pub(crate) fn is_keyword_line(text: &str) -> bool {
    KEYWORD.is_match(text)
}

pub(crate) fn is_toc_title(text: &str) -> bool {
    TOC.is_match(text)
}

pub(crate) fn is_figure_caption(text: &str) -> bool {
    FIGURE.is_match(text)
}

pub(crate) fn is_table_caption(text: &str) -> bool {
    TABLE.is_match(text)
}

fn is_note(text: &str) -> bool {
    NOTE.is_match(text)
}

/// A note or source line under a caption, by text or by style name.
pub(crate) fn is_note_paragraph(text: &str, style_name: Option<&str>) -> bool {
    if is_note(text) {
        return true;
    }
    style_name.is_some_and(|name| {
        let lower = name.to_lowercase();
        NOTE_STYLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
    })
}

pub(crate) fn is_english_title(text: &str) -> bool {
    ENGLISH_TITLE.is_match(text)
}

/// Kind of caption the text starts like, figures first.
pub(crate) fn caption_kind(text: &str) -> Option<ObjectKind> {
    if is_figure_caption(text) {
        Some(ObjectKind::Figure)
    } else if is_table_caption(text) {
        Some(ObjectKind::Table)
    } else {
        None
    }
}

/// The abstract token of an inline `摘要：…` line, lower-cased.
pub(crate) fn inline_abstract(text: &str) -> Option<String> {
    INLINE_ABSTRACT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

pub(crate) fn has_formula_number(text: &str) -> bool {
    FORMULA_NUMBER.is_match(text)
}

/// Text left once equation numbers are removed, trimmed.
pub(crate) fn strip_formula_numbers(text: &str) -> String {
    FORMULA_NUMBER.replace_all(text, "").trim().to_string()
}

/// Heading level written in a style name: `Heading 2`, `标题 3`,
/// `二级标题` and the like. A bare `Chapter` or `章节标题` is level 1.
pub(crate) fn heading_level_from_name(name: &str) -> Option<u32> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if let Some(level) = HEADING_NAMES.iter().find_map(|re| captured_level(re, name)) {
        return Some(level);
    }
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if BARE_CHAPTER.is_match(name) || compact.contains("章节标题") {
        return Some(1);
    }
    None
}

/// Heading level implied by numbering at the start of the text.
pub(crate) fn heading_level_from_text(text: &str) -> Option<u32> {
    let text = text.trim();
    if CHAPTER.is_match(text) || CN_LEVEL1.is_match(text) {
        return Some(1);
    }
    if CN_LEVEL2.is_match(text) {
        return Some(2);
    }
    let numbering = NUMBER_HEADING.captures(text)?.get(1)?;
    Some(numbering.as_str().split('.').count() as u32)
}

/// TOC level from a style name such as `toc 2` or `目录3`.
pub(crate) fn toc_level_from_name(name: &str) -> Option<u32> {
    TOC_LEVEL_NAMES.iter().find_map(|re| captured_level(re, name))
}

/// TOC level from an entry's numbering, limited to three levels.
pub(crate) fn toc_level_from_text(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(numbering) = TOC_NUMBER.captures(text).and_then(|c| c.get(1)) {
        let depth = numbering.as_str().split('.').count() as u32;
        return (1..=3).contains(&depth).then_some(depth);
    }
    if CN_LEVEL2.is_match(text) {
        return Some(2);
    }
    if CN_LEVEL1.is_match(text) {
        return Some(1);
    }
    None
}

pub(crate) fn is_toc_style_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("toc") || lower.contains("contents") || name.contains("目录")
}

pub(crate) fn looks_like_toc_entry(text: &str) -> bool {
    if is_toc_title(text) {
        return false;
    }
    TOC_TAB_PAGE.is_match(text)
        || TOC_DOT_LEADER.is_match(text)
        || (toc_level_from_text(text).is_some() && TRAILING_PAGE.is_match(text))
}

pub(crate) fn is_body_style_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    BODY_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn abstract_title_role(lower: &str) -> Role {
    if lower.contains("abstract") && !lower.contains("摘要") {
        Role::Special(SpecialRole::AbstractEnTitle)
    } else {
        Role::Special(SpecialRole::AbstractTitle)
    }
}

/// Title role of an inline abstract line; `token` is what
/// [`inline_abstract`] returned.
pub(crate) fn inline_abstract_role(token: &str, text: &str) -> Role {
    if token == "abstract" && !text.contains("摘要") {
        Role::Special(SpecialRole::AbstractEnTitle)
    } else {
        Role::Special(SpecialRole::AbstractTitle)
    }
}

/// Special role implied by a style name, if any.
pub(crate) fn special_role_from_name(name: &str) -> Option<Role> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let lower = name.to_lowercase();
    if lower == "title" || name == "标题" {
        return Some(Role::Special(SpecialRole::DocumentTitle));
    }
    if is_toc_style_name(name) {
        return Some(match toc_level_from_name(name) {
            Some(level) => Role::TocBody(level),
            None => Role::Special(SpecialRole::TocBody),
        });
    }
    if CAPTION_DIRECTORY_TERMS.iter().any(|term| name.contains(term)) {
        return None;
    }
    if lower.contains("摘要") || lower.contains("abstract") {
        return Some(abstract_title_role(&lower));
    }
    if REFERENCE_NAME_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return Some(Role::Special(SpecialRole::ReferenceTitle));
    }
    if lower.contains("caption") {
        if lower.contains("figure") {
            return Some(Role::Special(SpecialRole::FigureCaption));
        }
        if lower.contains("table") {
            return Some(Role::Special(SpecialRole::TableCaption));
        }
        return None;
    }
    if name.contains("图题") {
        return Some(Role::Special(SpecialRole::FigureCaption));
    }
    if name.contains("表题") {
        return Some(Role::Special(SpecialRole::TableCaption));
    }
    None
}

/// Special role implied by paragraph text alone.
pub(crate) fn special_role_from_text(text: &str) -> Option<Role> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(token) = inline_abstract(text) {
        return Some(inline_abstract_role(&token, text));
    }
    if is_abstract_en(text) {
        return Some(Role::Special(SpecialRole::AbstractEnTitle));
    }
    if is_abstract(text) {
        return Some(Role::Special(SpecialRole::AbstractTitle));
    }
    if is_reference(text) {
        return Some(Role::Special(SpecialRole::ReferenceTitle));
    }
    if is_toc_title(text) {
        return Some(Role::Special(SpecialRole::TocTitle));
    }
    caption_kind(text).map(ObjectKind::caption_role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_names_in_both_scripts() {
        assert_eq!(heading_level_from_name("Heading 2"), Some(2));
        assert_eq!(heading_level_from_name("heading3"), Some(3));
        assert_eq!(heading_level_from_name("标题 1"), Some(1));
        assert_eq!(heading_level_from_name("标题二"), Some(2));
        assert_eq!(heading_level_from_name("三级标题"), Some(3));
        assert_eq!(heading_level_from_name("Chapter"), Some(1));
        assert_eq!(heading_level_from_name("章节 标题"), Some(1));
        assert_eq!(heading_level_from_name("Normal"), None);
    }

    #[test]
    fn heading_levels_from_numbering() {
        assert_eq!(heading_level_from_text("第一章 绪论"), Some(1));
        assert_eq!(heading_level_from_text("一、研究背景"), Some(1));
        assert_eq!(heading_level_from_text("（二）方法"), Some(2));
        assert_eq!(heading_level_from_text("2.3.1 实验设置"), Some(3));
        assert_eq!(heading_level_from_text("2019年的研究"), None);
    }

    #[test]
    fn special_roles_from_style_names() {
        assert_eq!(
            special_role_from_name("Abstract Title"),
            Some(Role::Special(SpecialRole::AbstractEnTitle))
        );
        assert_eq!(
            special_role_from_name("摘要标题"),
            Some(Role::Special(SpecialRole::AbstractTitle))
        );
        assert_eq!(special_role_from_name("toc 2"), Some(Role::TocBody(2)));
        assert_eq!(
            special_role_from_name("TOC Heading"),
            Some(Role::Special(SpecialRole::TocBody))
        );
        assert_eq!(special_role_from_name("图表目录"), Some(Role::Special(SpecialRole::TocBody)));
        assert_eq!(special_role_from_name("图表清单"), None);
        assert_eq!(special_role_from_name("caption"), None);
        assert_eq!(
            special_role_from_name("Table Caption"),
            Some(Role::Special(SpecialRole::TableCaption))
        );
        assert_eq!(
            special_role_from_name("Title"),
            Some(Role::Special(SpecialRole::DocumentTitle))
        );
    }

    #[test]
    fn special_roles_from_text() {
        assert_eq!(
            special_role_from_text("摘  要"),
            None,
            "inner spaces are not part of the abstract marker"
        );
        assert_eq!(
            special_role_from_text("ABSTRACT"),
            Some(Role::Special(SpecialRole::AbstractEnTitle))
        );
        assert_eq!(
            special_role_from_text("摘要：本文研究"),
            Some(Role::Special(SpecialRole::AbstractTitle))
        );
        assert_eq!(
            special_role_from_text("Abstract: This thesis"),
            Some(Role::Special(SpecialRole::AbstractEnTitle))
        );
        assert_eq!(
            special_role_from_text("目 录"),
            Some(Role::Special(SpecialRole::TocTitle))
        );
        assert_eq!(
            special_role_from_text("图 3 系统结构"),
            Some(Role::Special(SpecialRole::FigureCaption))
        );
        assert_eq!(
            special_role_from_text("Table 2 Results"),
            Some(Role::Special(SpecialRole::TableCaption))
        );
    }

    #[test]
    fn toc_entries() {
        assert!(looks_like_toc_entry("第一章 绪论\t1"));
        assert!(looks_like_toc_entry("致谢......45"));
        assert!(looks_like_toc_entry("1.2 研究现状 3"));
        assert!(!looks_like_toc_entry("目录"));
        assert!(!looks_like_toc_entry("本文共分五章"));
        assert_eq!(toc_level_from_text("2.1.3 小节 7"), Some(3));
        assert_eq!(toc_level_from_text("1.2.3.4 太深 7"), None);
        assert_eq!(toc_level_from_name("TOC 3"), Some(3));
        assert_eq!(toc_level_from_name("目录2"), Some(2));
    }

    #[test]
    fn formula_numbers() {
        assert!(has_formula_number("E = mc^2 (3.1)"));
        assert_eq!(strip_formula_numbers("（2）"), "");
        assert_eq!(strip_formula_numbers("x (1)"), "x");
    }
}
