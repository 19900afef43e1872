//! Ranks the candidate styles of each role and keeps roles of the same
//! group from claiming the same style.

use std::collections::{BTreeMap, HashMap};

use crate::classify::Source;
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::docx::ResolvedStyle;
use crate::model::StyleRule;
use crate::patterns;
use crate::role::{Role, RoleGroup, SpecialRole};
use crate::rule::build_style_rule;
use crate::sample::SampleStats;

/// A style proposed for a role, with the samples that back it.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub resolved: ResolvedStyle,
    pub source: Source,
    pub stats: SampleStats,
    /// Tie-break position when the samples carry none.
    pub order: usize,
    pub prefer_samples: bool,
}

impl Candidate {
    pub fn style_id(&self) -> &str {
        &self.resolved.style_id
    }

    pub fn build_rule(&self) -> StyleRule {
        build_style_rule(&self.resolved, Some(&self.stats), self.prefer_samples)
    }
}

/// Sort key; smaller is better. Plain roles prefer frequent and complete
/// styles, the generic TOC body prefers shallow levels in reading order.
type SortKey = (u32, u32, i64, i64, i64, String);

const UNKNOWN_TOC_LEVEL: u32 = 99;

fn sort_key(role: &Role, candidate: &Candidate) -> SortKey {
    let priority = candidate.source.priority();
    let count = candidate.stats.count as i64;
    let order = candidate.stats.first_index.unwrap_or(candidate.order) as i64;
    let completeness = candidate.build_rule().completeness() as i64;
    let style_id = candidate.style_id().to_string();
    if role.is_special(SpecialRole::TocBody) {
        let toc_level = candidate
            .stats
            .style_name
            .as_deref()
            .or(candidate.resolved.name.as_deref())
            .and_then(patterns::toc_level_from_name)
            .unwrap_or(UNKNOWN_TOC_LEVEL);
        return (priority, toc_level, order, -count, -completeness, style_id);
    }
    (priority, 0, -count, -completeness, order, style_id)
}

/// Sorts candidates best first.
pub(crate) fn rank(role: &Role, candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut keyed: Vec<(SortKey, Candidate)> = candidates
        .into_iter()
        .map(|c| (sort_key(role, &c), c))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, c)| c).collect()
}

/// Picks one candidate per role.
///
/// Roles without a group, and the cover and TOC groups, take their best
/// candidate outright. In every other group the roles claim styles in
/// order of their best key, skipping styles another role of the group
/// already holds. A role left with nothing free shares its best style.
pub(crate) fn resolve_conflicts(
    candidates: BTreeMap<Role, Vec<Candidate>>,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<Role, Candidate> {
    let mut ranked: BTreeMap<Role, Vec<Candidate>> = candidates
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(role, list)| {
            let sorted = rank(&role, list);
            (role, sorted)
        })
        .collect();

    let mut groups: BTreeMap<Option<RoleGroup>, Vec<Role>> = BTreeMap::new();
    for role in ranked.keys() {
        groups.entry(role.group()).or_default().push(role.clone());
    }

    let mut chosen: HashMap<Role, usize> = HashMap::new();
    for (group, mut roles) in groups {
        if group.is_none_or(RoleGroup::allows_reuse) {
            for role in roles {
                chosen.insert(role, 0);
            }
            continue;
        }

        roles.sort_by_cached_key(|role| (sort_key(role, &ranked[role][0]), role.to_string()));
        let mut used: HashMap<String, Role> = HashMap::new();
        for role in roles {
            let list = &ranked[&role];
            let mut pick = None;
            for (index, candidate) in list.iter().enumerate() {
                let style_id = candidate.style_id();
                match used.get(style_id).filter(|_| !style_id.is_empty()) {
                    Some(owner) => diagnostics.push(
                        Warning::new(
                            WarningKind::ConflictResolved,
                            format!("skip {style_id} used by {owner}"),
                        )
                        .with_role(&role)
                        .with_style(style_id),
                    ),
                    None => {
                        pick = Some(index);
                        break;
                    }
                }
            }
            let index = match pick {
                Some(index) => index,
                None => {
                    let style_id = list[0].style_id();
                    let owner = used.get(style_id).map(Role::to_string).unwrap_or_default();
                    diagnostics.push(
                        Warning::new(WarningKind::SharedStyle, format!("shared with {owner}"))
                            .with_role(&role)
                            .with_style(style_id),
                    );
                    0
                }
            };
            used.entry(list[index].style_id().to_string())
                .or_insert_with(|| role.clone());
            chosen.insert(role, index);
        }
    }

    let mut selected = BTreeMap::new();
    for (role, list) in std::mem::take(&mut ranked) {
        let Some(&index) = chosen.get(&role) else {
            continue;
        };
        let count = list.len();
        let Some(candidate) = list.into_iter().nth(index) else {
            continue;
        };
        log::debug!(
            "{role}: {} ({:?}) out of {count} candidates",
            candidate.style_id(),
            candidate.source
        );
        selected.insert(role, candidate);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::FontSpec;

    fn candidate(style_id: &str, name: &str, source: Source, count: usize, first: usize) -> Candidate {
        let stats = SampleStats {
            count,
            first_index: Some(first),
            ..SampleStats::default()
        };
        Candidate {
            resolved: ResolvedStyle {
                style_id: style_id.into(),
                name: Some(name.into()),
                fonts: FontSpec::default(),
                font_name: Some("宋体".into()),
                size_pt: Some(12.0),
                bold: None,
                alignment: None,
                space_before_pt: None,
                space_after_pt: None,
                line_rule: None,
                line_twips: None,
                outline_level: None,
            },
            source,
            stats,
            order: 0,
            prefer_samples: false,
        }
    }

    #[test]
    fn source_priority_then_frequency() {
        let ranked = rank(
            &Role::BASE_BODY,
            vec![
                candidate("A", "A", Source::Keyword, 50, 1),
                candidate("B", "B", Source::Stack, 3, 9),
                candidate("C", "C", Source::Stack, 7, 20),
            ],
        );
        let ids: Vec<&str> = ranked.iter().map(Candidate::style_id).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
    }

    #[test]
    fn toc_body_prefers_shallow_levels() {
        let ranked = rank(
            &Role::Special(SpecialRole::TocBody),
            vec![
                candidate("TOC2", "toc 2", Source::Stack, 10, 3),
                candidate("TOC1", "toc 1", Source::Stack, 2, 5),
            ],
        );
        assert_eq!(ranked[0].style_id(), "TOC1");
    }

    #[test]
    fn roles_in_one_group_get_distinct_styles() {
        let mut diagnostics = Diagnostics::default();
        let candidates = BTreeMap::from([
            (
                Role::Title(1),
                vec![candidate("H1", "heading 1", Source::Stack, 5, 1)],
            ),
            (
                Role::Title(2),
                vec![
                    candidate("H1", "heading 1", Source::Stack, 4, 2),
                    candidate("H2", "heading 2", Source::Keyword, 1, 8),
                ],
            ),
        ]);
        let selected = resolve_conflicts(candidates, &mut diagnostics);
        assert_eq!(selected[&Role::Title(1)].style_id(), "H1");
        assert_eq!(selected[&Role::Title(2)].style_id(), "H2");
        let warning = &diagnostics.warnings()[0];
        assert_eq!(warning.kind, WarningKind::ConflictResolved);
        assert_eq!(warning.reason, "skip H1 used by title_L1");
    }

    #[test]
    fn frequent_heading_wins_and_lone_candidate_is_shared() {
        let mut diagnostics = Diagnostics::default();
        let candidates = BTreeMap::from([
            (
                Role::Title(1),
                vec![
                    candidate("B", "heading 1 alt", Source::Keyword, 1, 4),
                    candidate("A", "heading 1", Source::Keyword, 5, 2),
                ],
            ),
            (Role::Title(2), vec![candidate("A", "heading 1", Source::Keyword, 5, 2)]),
        ]);
        let selected = resolve_conflicts(candidates, &mut diagnostics);
        assert_eq!(selected[&Role::Title(1)].style_id(), "A");
        assert_eq!(selected[&Role::Title(2)].style_id(), "A");
        assert!(
            diagnostics
                .warnings()
                .iter()
                .any(|w| w.kind == WarningKind::SharedStyle && w.reason == "shared with title_L1")
        );
    }

    #[test]
    fn only_choice_is_shared_with_a_warning() {
        let mut diagnostics = Diagnostics::default();
        let candidates = BTreeMap::from([
            (Role::Body(1), vec![candidate("Body", "Body", Source::Stack, 9, 2)]),
            (Role::Body(2), vec![candidate("Body", "Body", Source::Stack, 3, 4)]),
        ]);
        let selected = resolve_conflicts(candidates, &mut diagnostics);
        assert_eq!(selected[&Role::Body(2)].style_id(), "Body");
        assert!(
            diagnostics
                .warnings()
                .iter()
                .any(|w| w.kind == WarningKind::SharedStyle && w.reason == "shared with body_L1")
        );
    }

    #[test]
    fn ungrouped_and_toc_roles_may_reuse() {
        let mut diagnostics = Diagnostics::default();
        let candidates = BTreeMap::from([
            (
                Role::Special(SpecialRole::TocTitle),
                vec![candidate("TOC", "toc", Source::Stack, 1, 3)],
            ),
            (
                Role::Special(SpecialRole::TocBody),
                vec![candidate("TOC", "toc", Source::Stack, 4, 4)],
            ),
        ]);
        let selected = resolve_conflicts(candidates, &mut diagnostics);
        assert_eq!(selected.len(), 2);
        assert!(diagnostics.warnings().is_empty());
    }
}
