use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Where in the document a section title may appear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionPosition {
    FirstPage,
    Front,
    #[default]
    #[serde(alias = "any", alias = "anywhere")]
    Body,
    Back,
    LastPage,
}

/// How far a section's body extends after its title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyRange {
    #[default]
    UntilNextTitle,
    UntilBlank,
    #[serde(alias = "fixed_paragraph_count")]
    FixedParagraphs,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionRule {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub title_keywords: Vec<String>,
    #[serde(default)]
    pub content_keywords: Vec<String>,
    #[serde(default)]
    pub title_style_names: Vec<String>,
    #[serde(default)]
    pub position: SectionPosition,
    #[serde(default)]
    pub body_range: BodyRange,
    #[serde(default)]
    pub body_paragraph_limit: Option<u32>,
}

impl SectionRule {
    fn new(
        key: &str,
        display_name: &str,
        title_keywords: &[&str],
        position: SectionPosition,
        body_range: BodyRange,
    ) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            title_keywords: title_keywords.iter().map(|k| k.to_string()).collect(),
            content_keywords: Vec::new(),
            title_style_names: Vec::new(),
            position,
            body_range,
            body_paragraph_limit: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Err(Error::InvalidSectionRule(reason));
        if self.key.trim().is_empty() {
            return invalid("section key must be non-empty".into());
        }
        if self.display_name.trim().is_empty() {
            return invalid(format!("section {:?} needs a display_name", self.key));
        }
        if !has_keyword(&self.title_keywords) && !has_keyword(&self.content_keywords) {
            return invalid(format!("section {:?} has no keywords", self.key));
        }
        match (self.body_range, self.body_paragraph_limit) {
            (BodyRange::FixedParagraphs, None | Some(0)) => invalid(format!(
                "section {:?}: fixed_paragraphs needs a positive body_paragraph_limit",
                self.key
            )),
            (BodyRange::FixedParagraphs, Some(_)) | (_, None) => Ok(()),
            (_, Some(_)) => invalid(format!(
                "section {:?}: body_paragraph_limit only applies to fixed_paragraphs",
                self.key
            )),
        }
    }

    pub fn matches_title(&self, text: &str, style_name: Option<&str>) -> bool {
        if self.title_keywords.iter().any(|kw| keyword_matches(text, kw)) {
            return true;
        }
        let Some(style) = style_name.map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };
        let style = style.to_lowercase();
        self.title_style_names
            .iter()
            .any(|name| !name.trim().is_empty() && name.trim().to_lowercase() == style)
    }

    pub fn matches_content(&self, text: &str) -> bool {
        self.content_keywords.iter().any(|kw| keyword_matches(text, kw))
    }
}

fn has_keyword(keywords: &[String]) -> bool {
    keywords.iter().any(|k| !k.trim().is_empty())
}

/// Validates each rule and checks keys are unique.
pub fn validate_rules(rules: &[SectionRule]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for rule in rules {
        rule.validate()?;
        if !seen.insert(rule.key.trim()) {
            return Err(Error::InvalidSectionRule(format!(
                "duplicate section key {:?}",
                rule.key
            )));
        }
    }
    Ok(())
}

pub fn default_rules() -> Vec<SectionRule> {
    vec![
        SectionRule::new(
            "original_statement",
            "原创声明",
            &[
                "原创声明",
                "原创性声明",
                "原创性申明",
                "学术诚信声明",
                "独创性声明",
                "学位论文原创性声明",
                "学位论文原创性申明",
                "学位论文独创性声明",
                "诚信声明",
            ],
            SectionPosition::Front,
            BodyRange::UntilNextTitle,
        ),
        SectionRule::new(
            "authorization_statement",
            "授权声明",
            &["授权声明", "版权声明", "使用授权声明", "学位论文版权使用授权书"],
            SectionPosition::Front,
            BodyRange::UntilBlank,
        ),
        SectionRule::new(
            "acknowledgement",
            "致谢",
            &["致谢", "感谢", "鸣谢"],
            SectionPosition::Back,
            BodyRange::UntilNextTitle,
        ),
    ]
}

/// Case-insensitive containment, retried with all whitespace removed so
/// that spaced-out titles like "致 谢" still match.
pub fn keyword_matches(text: &str, keyword: &str) -> bool {
    let text = text.trim().to_lowercase();
    let keyword = keyword.trim().to_lowercase();
    if text.is_empty() || keyword.is_empty() {
        return false;
    }
    if text.contains(&keyword) {
        return true;
    }
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let keyword: String = keyword.chars().filter(|c| !c.is_whitespace()).collect();
    !keyword.is_empty() && text.contains(&keyword)
}

/// Size of the "front" and "back" windows for `total` content paragraphs.
pub fn front_limit(total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (total / 3).max(5).min(30)
}

/// Positional context for section matching: content paragraphs are the
/// non-blank paragraphs outside tables, indexed from zero.
#[derive(Debug, Default)]
pub struct PositionWindow {
    pages: Vec<u32>,
    front_limit: usize,
    back_start: usize,
}

impl PositionWindow {
    /// `pages[i]` is the page number of content paragraph `i`.
    pub fn new(pages: Vec<u32>) -> Self {
        let total = pages.len();
        let front_limit = front_limit(total);
        Self {
            pages,
            front_limit,
            back_start: total.saturating_sub(front_limit),
        }
    }

    pub fn contains(&self, position: SectionPosition, content_index: usize) -> bool {
        if content_index >= self.pages.len() {
            return false;
        }
        match position {
            SectionPosition::FirstPage => self.pages[content_index] == 1,
            SectionPosition::Front => content_index < self.front_limit,
            SectionPosition::Back => content_index >= self.back_start,
            SectionPosition::LastPage => {
                self.pages.last() == Some(&self.pages[content_index])
            }
            SectionPosition::Body => true,
        }
    }
}
