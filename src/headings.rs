use std::collections::BTreeSet;

use crate::config::BoundRoleMap;
use crate::docx::{Paragraph, StyleCatalog};
use crate::patterns;
use crate::sample::StyleSamples;

/// Heading levels found in a template.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct HeadingLevels {
    /// Normalised levels within the cap, ascending.
    pub detected: Vec<u32>,
    /// Explicitly mapped levels above the cap, ascending.
    pub overflow: Vec<u32>,
    /// Raw outline level that normalises to level 1.
    pub outline_min: Option<u32>,
    /// Highest raw outline level treated as a heading: the highest one
    /// used by a style or paragraph, bounded by `outline_level_max`.
    pub outline_max: Option<u32>,
}

struct LevelSet {
    cap: u32,
    detected: BTreeSet<u32>,
    overflow: BTreeSet<u32>,
}

impl LevelSet {
    fn record(&mut self, level: u32, explicit: bool) {
        if level == 0 {
            return;
        }
        if level > self.cap {
            if explicit {
                self.overflow.insert(level);
            }
            return;
        }
        self.detected.insert(level);
    }
}

impl HeadingLevels {
    pub fn detect(
        catalog: &StyleCatalog,
        samples: &StyleSamples,
        role_map: &BoundRoleMap,
        paragraphs: &[Paragraph],
        max_heading_level: u32,
        outline_level_max: u32,
    ) -> Self {
        let mut levels = LevelSet {
            cap: max_heading_level,
            detected: BTreeSet::new(),
            overflow: BTreeSet::new(),
        };

        for role in role_map.roles() {
            if let Some(level) = role.title_level() {
                levels.record(level, true);
            }
        }

        let mut names: BTreeSet<&str> = catalog
            .styles()
            .iter()
            .filter_map(|s| s.name.as_deref())
            .collect();
        names.extend(samples.iter().filter_map(|(_, stats)| stats.style_name.as_deref()));
        for name in names {
            if let Some(level) = patterns::heading_level_from_name(name) {
                levels.record(level, false);
            }
        }

        // Outline level 9 means body text.
        let mut outlines: BTreeSet<u32> = catalog
            .styles()
            .iter()
            .filter_map(|style| {
                let sampled = samples.get(&style.id).and_then(|s| s.outline_min);
                [style.props.outline_level, sampled]
                    .into_iter()
                    .flatten()
                    .filter(|lvl| *lvl < 9)
                    .min()
            })
            .collect();
        outlines.extend(
            paragraphs
                .iter()
                .filter_map(|p| p.props.outline_level)
                .filter(|lvl| *lvl < 9),
        );

        let outline_min = outlines.first().copied();
        if let Some(min) = outline_min {
            for outline in &outlines {
                levels.record(outline - min + 1, false);
            }
        }
        let outline_max = outlines.last().map(|&observed| match outline_level_max {
            0 => observed,
            configured => configured.min(observed),
        });

        let detected = HeadingLevels {
            detected: levels.detected.into_iter().collect(),
            overflow: levels.overflow.into_iter().collect(),
            outline_min,
            outline_max,
        };
        log::debug!(
            "heading levels {:?}, overflow {:?}, outline {:?}..{:?}",
            detected.detected,
            detected.overflow,
            detected.outline_min,
            detected.outline_max
        );
        detected
    }

    /// Heading level for a raw outline level, when it is within the outline
    /// window and the cap. Without a window nothing maps.
    pub fn level_for_outline(&self, outline: u32, cap: u32) -> Option<u32> {
        let (min, max) = (self.outline_min?, self.outline_max?);
        if outline > max {
            return None;
        }
        let level = outline.checked_sub(min)? + 1;
        (level <= cap).then_some(level)
    }
}
