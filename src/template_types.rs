use crate::sections::{self, BodyRange, SectionPosition, SectionRule};

pub const AUTO: &str = "auto";
pub const GENERIC: &str = "generic";

/// A named family of templates sharing one section-rule list.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateType {
    pub key: &'static str,
    pub display_name: &'static str,
    pub section_rules: Vec<SectionRule>,
}

fn rule(
    key: &str,
    display_name: &str,
    keywords: &[&str],
    position: SectionPosition,
    body_range: BodyRange,
) -> SectionRule {
    SectionRule {
        key: key.to_string(),
        display_name: display_name.to_string(),
        title_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        content_keywords: Vec::new(),
        title_style_names: Vec::new(),
        position,
        body_range,
        body_paragraph_limit: None,
    }
}

pub fn builtin() -> Vec<TemplateType> {
    use BodyRange::{UntilBlank, UntilNextTitle};
    use SectionPosition::{Back, Front};
    vec![
        TemplateType {
            key: AUTO,
            display_name: "自动识别",
            section_rules: sections::default_rules(),
        },
        TemplateType {
            key: GENERIC,
            display_name: "通用模板",
            section_rules: sections::default_rules(),
        },
        TemplateType {
            key: "school_a",
            display_name: "学校A模板",
            section_rules: vec![
                rule(
                    "original_statement",
                    "原创声明",
                    &["原创声明", "原创性申明", "学术诚信声明", "独创性声明", "学位论文原创性申明"],
                    Front,
                    UntilNextTitle,
                ),
                rule(
                    "authorization_statement",
                    "授权声明",
                    &["授权声明", "版权声明"],
                    Front,
                    UntilBlank,
                ),
                rule("acknowledgement", "致谢", &["致谢", "感谢"], Back, UntilNextTitle),
            ],
        },
        TemplateType {
            key: "school_b",
            display_name: "学校B模板",
            section_rules: vec![
                rule(
                    "original_statement",
                    "原创声明",
                    &["原创声明", "原创性申明", "学位论文独创性声明"],
                    Front,
                    UntilNextTitle,
                ),
                rule("acknowledgement", "致谢", &["致谢", "鸣谢"], Back, UntilNextTitle),
            ],
        },
    ]
}

/// Looks a template type up by key, falling back to `generic`.
pub fn resolve(key: &str) -> TemplateType {
    let wanted = key.trim().to_lowercase();
    let mut types = builtin();
    let index = types
        .iter()
        .position(|t| t.key == wanted)
        .or_else(|| types.iter().position(|t| t.key == GENERIC))
        .unwrap_or(0);
    types.swap_remove(index)
}

/// Picks the built-in type whose section keywords show up most often in
/// position. Ties and zero scores fall back to `generic`.
///
/// `texts` are the trimmed, non-empty paragraph texts in reading order.
pub fn detect(texts: &[String]) -> TemplateType {
    if texts.is_empty() {
        return resolve(GENERIC);
    }
    let front_limit = sections::front_limit(texts.len());
    let back_start = texts.len().saturating_sub(front_limit);

    let mut scored: Vec<(usize, TemplateType)> = builtin()
        .into_iter()
        .filter(|t| t.key != AUTO && t.key != GENERIC)
        .map(|t| (score(&t, texts, front_limit, back_start), t))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.key.cmp(b.1.key)));

    let unique_best = match scored.as_slice() {
        [(best, _), (second, _), ..] => *best > 0 && best != second,
        [(best, _)] => *best > 0,
        [] => false,
    };
    if !unique_best {
        return resolve(GENERIC);
    }
    scored.swap_remove(0).1
}

fn score(template: &TemplateType, texts: &[String], front_limit: usize, back_start: usize) -> usize {
    template
        .section_rules
        .iter()
        .filter(|rule| {
            texts.iter().enumerate().any(|(index, text)| {
                let in_position = match rule.position {
                    SectionPosition::Front | SectionPosition::FirstPage => index < front_limit,
                    SectionPosition::Back | SectionPosition::LastPage => index >= back_start,
                    SectionPosition::Body => true,
                };
                let lowered = text.to_lowercase();
                in_position
                    && rule
                        .title_keywords
                        .iter()
                        .chain(&rule.content_keywords)
                        .any(|kw| !kw.is_empty() && lowered.contains(&kw.to_lowercase()))
            })
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unknown_key_resolves_to_generic() {
        assert_eq!(resolve("SCHOOL_A").key, "school_a");
        assert_eq!(resolve("nope").key, GENERIC);
    }

    #[test]
    fn detects_unique_best_match() {
        // 学术诚信声明 is only known to school_a; 授权声明 adds a second hit.
        let doc = texts(&["学术诚信声明", "授权声明", "正文", "正文", "正文", "正文", "致谢"]);
        assert_eq!(detect(&doc).key, "school_a");
    }

    #[test]
    fn ties_and_misses_fall_back_to_generic() {
        // Both school types know 原创声明 and 致谢.
        let doc = texts(&["原创声明", "正文", "正文", "正文", "正文", "正文", "致谢"]);
        assert_eq!(detect(&doc).key, GENERIC);
        assert_eq!(detect(&texts(&["正文"])).key, GENERIC);
        assert_eq!(detect(&[]).key, GENERIC);
    }

    #[test]
    fn builtin_rules_are_valid() {
        for template in builtin() {
            assert!(sections::validate_rules(&template.section_rules).is_ok());
        }
    }
}
