use crate::classify::Source;
use crate::config::BoundRoleMap;
use crate::docx::ResolvedStyle;
use crate::headings::HeadingLevels;
use crate::patterns;
use crate::role::Role;
use crate::sample::SampleStats;

/// Guesses a role for one catalog style from its definition and samples.
///
/// Tried in order: the role map, the outline level, the style name, then
/// the sampled paragraph texts.
pub(crate) fn match_style(
    resolved: &ResolvedStyle,
    stats: &SampleStats,
    role_map: &BoundRoleMap,
    headings: &HeadingLevels,
    max_heading_level: u32,
) -> Option<(Role, Source)> {
    let name = resolved.name.as_deref();
    if let Some(role) = role_map.lookup(Some(&resolved.style_id), name) {
        return Some((role.clone(), Source::Explicit));
    }

    let outline = [resolved.outline_level, stats.outline_min]
        .into_iter()
        .flatten()
        .min();
    if let Some(level) = outline.and_then(|o| headings.level_for_outline(o, max_heading_level)) {
        return Some((Role::Title(level), Source::Outline));
    }

    if let Some(name) = name.map(str::to_lowercase) {
        if let Some(role) = patterns::special_role_from_name(&name) {
            return Some((role, Source::Keyword));
        }
        if let Some(level) = patterns::heading_level_from_name(&name)
            && level <= max_heading_level
        {
            return Some((Role::Title(level), Source::Keyword));
        }
        if patterns::is_body_style_name(&name) {
            return Some((Role::BASE_BODY, Source::Keyword));
        }
    }

    stats
        .text_samples
        .iter()
        .find_map(|text| patterns::special_role_from_text(text))
        .map(|role| (role, Source::Text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleMap;
    use crate::diagnostics::Diagnostics;
    use crate::docx::FontSpec;
    use crate::role::SpecialRole;

    fn style(id: &str, name: &str, outline_level: Option<u32>) -> ResolvedStyle {
        ResolvedStyle {
            style_id: id.into(),
            name: Some(name.into()),
            fonts: FontSpec::default(),
            font_name: None,
            size_pt: None,
            bold: None,
            alignment: None,
            space_before_pt: None,
            space_after_pt: None,
            line_rule: None,
            line_twips: None,
            outline_level,
        }
    }

    fn bind(map: &RoleMap) -> BoundRoleMap {
        let mut diagnostics = Diagnostics::default();
        BoundRoleMap::bind(map, ["Custom", "Heading2"], ["My Custom", "heading 2"], &mut diagnostics)
    }

    #[test]
    fn role_map_beats_everything() {
        let map = RoleMap::from_pairs([("My Custom", "body_L2")]).unwrap();
        let matched = match_style(
            &style("Custom", "My Custom", Some(0)),
            &SampleStats::default(),
            &bind(&map),
            &HeadingLevels::default(),
            6,
        );
        assert_eq!(matched, Some((Role::Body(2), Source::Explicit)));
    }

    #[test]
    fn outline_level_needs_a_window() {
        let stats = SampleStats::default();
        let none = bind(&RoleMap::new());
        let plain = match_style(&style("X", "Fancy", Some(1)), &stats, &none, &HeadingLevels::default(), 6);
        assert_eq!(plain, None);

        let headings = HeadingLevels {
            outline_min: Some(0),
            outline_max: Some(3),
            ..HeadingLevels::default()
        };
        let matched = match_style(&style("X", "Fancy", Some(1)), &stats, &none, &headings, 6);
        assert_eq!(matched, Some((Role::Title(2), Source::Outline)));
    }

    #[test]
    fn names_then_texts() {
        let none = bind(&RoleMap::new());
        let headings = HeadingLevels::default();
        let stats = SampleStats::default();
        assert_eq!(
            match_style(&style("Heading2", "heading 2", None), &stats, &none, &headings, 6),
            Some((Role::Title(2), Source::Keyword))
        );
        assert_eq!(
            match_style(&style("Heading2", "heading 2", None), &stats, &none, &headings, 1),
            None
        );
        assert_eq!(
            match_style(&style("Normal", "Normal", None), &stats, &none, &headings, 6),
            Some((Role::BASE_BODY, Source::Keyword))
        );

        let mut sampled = SampleStats::default();
        sampled.text_samples.push("参考文献".into());
        assert_eq!(
            match_style(&style("S1", "Style 1", None), &sampled, &none, &headings, 6),
            Some((Role::Special(SpecialRole::ReferenceTitle), Source::Text))
        );
    }
}
