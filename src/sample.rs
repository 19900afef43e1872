use std::collections::HashMap;

use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::docx::{Paragraph, ParagraphProps, Run, StyleCatalog};
use crate::model::{Alignment, LineSpacing, LineSpacingRule, Spacing, SpacingUnit};

/// First non-blank run weight when a role is sampled from its leading run.
const FIRST_RUN_WEIGHT: f64 = 1000.0;
const MAX_TEXT_SAMPLES: usize = 3;

/// Weighted votes for one field. The value with the largest total weight
/// wins; ties go to the value seen first.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedMode<T> {
    entries: Vec<(T, f64)>,
}

impl<T> Default for WeightedMode<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> WeightedMode<T> {
    pub fn add(&mut self, value: Option<T>, weight: f64) {
        let Some(value) = value else {
            return;
        };
        match self.entries.iter_mut().find(|(v, _)| *v == value) {
            Some((_, total)) => *total += weight,
            None => self.entries.push((value, weight)),
        }
    }

    pub fn mode(&self) -> Option<T> {
        let mut best: Option<&(T, f64)> = None;
        for entry in &self.entries {
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(value, _)| value.clone())
    }
}

/// Observations gathered for one style (or one role candidate).
#[derive(Clone, Debug, Default)]
pub struct SampleStats {
    pub count: usize,
    /// 1-based paragraph number of the first observation.
    pub first_index: Option<usize>,
    pub outline_min: Option<u32>,
    pub style_name: Option<String>,
    pub text_samples: Vec<String>,
    pub alignment: WeightedMode<Alignment>,
    pub line_spacing: WeightedMode<LineSpacing>,
    pub space_before_pt: WeightedMode<f32>,
    pub space_after_pt: WeightedMode<f32>,
    pub space_before: WeightedMode<Spacing>,
    pub space_after: WeightedMode<Spacing>,
    pub indent_left_pt: WeightedMode<f32>,
    pub indent_right_pt: WeightedMode<f32>,
    pub indent_first_line_pt: WeightedMode<f32>,
    pub indent_hanging_pt: WeightedMode<f32>,
    pub font_name: WeightedMode<String>,
    pub font_name_ascii: WeightedMode<String>,
    pub font_name_h_ansi: WeightedMode<String>,
    pub font_name_east_asia: WeightedMode<String>,
    pub font_size_pt: WeightedMode<f32>,
    pub bold: WeightedMode<bool>,
}

/// Line spacing written directly on a paragraph. The flag is set when the
/// rule had to be guessed.
pub fn paragraph_line_spacing(props: &ParagraphProps) -> Option<(LineSpacing, bool)> {
    let twips = props.line_twips?;
    let spacing = match props.line_rule.as_deref() {
        None | Some("auto") => LineSpacing::auto(twips),
        Some("exact") => LineSpacing::points(LineSpacingRule::Exactly, twips as f32 / 20.0),
        Some("atLeast") => LineSpacing::points(LineSpacingRule::AtLeast, twips as f32 / 20.0),
        Some(_) => {
            return Some((
                LineSpacing::points(LineSpacingRule::Exactly, twips as f32 / 20.0),
                true,
            ));
        }
    };
    Some((spacing, false))
}

fn spacing_detail(points: Option<f32>, lines: Option<f32>) -> Option<Spacing> {
    match (lines, points) {
        (Some(value), _) => Some(Spacing {
            value,
            unit: SpacingUnit::Line,
        }),
        (None, Some(value)) => Some(Spacing {
            value,
            unit: SpacingUnit::Pt,
        }),
        (None, None) => None,
    }
}

fn run_weight(run: &Run) -> Option<f64> {
    if run.is_blank() {
        return None;
    }
    Some(run.text.trim().chars().count() as f64)
}

impl SampleStats {
    /// Counts one paragraph and keeps its text, name and outline level.
    pub fn note_paragraph(&mut self, paragraph: &Paragraph, index: usize, style_name: Option<&str>) {
        self.count += 1;
        self.first_index.get_or_insert(index);
        self.note_text(&paragraph.text);
        if self.style_name.is_none()
            && let Some(name) = style_name.filter(|n| !n.is_empty())
        {
            self.style_name = Some(name.to_string());
        }
        if let Some(level) = paragraph.props.outline_level {
            self.outline_min = Some(self.outline_min.map_or(level, |min| min.min(level)));
        }
    }

    fn note_text(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty()
            || self.text_samples.len() >= MAX_TEXT_SAMPLES
            || self.text_samples.iter().any(|t| t == trimmed)
        {
            return;
        }
        self.text_samples.push(trimmed.to_string());
    }

    /// Votes for the paragraph-level formatting. `style_alignment` is the
    /// `w:jc` the paragraph's own style sets, used when the paragraph has
    /// none. Returns true when the line spacing rule was inferred.
    pub fn add_paragraph_format(
        &mut self,
        paragraph: &Paragraph,
        style_alignment: Option<Alignment>,
    ) -> bool {
        let props = &paragraph.props;
        self.alignment.add(props.alignment.or(style_alignment), 1.0);

        let line = paragraph_line_spacing(props);
        self.line_spacing.add(line.map(|(spacing, _)| spacing), 1.0);

        self.space_before_pt.add(props.space_before_pt, 1.0);
        self.space_after_pt.add(props.space_after_pt, 1.0);
        self.space_before
            .add(spacing_detail(props.space_before_pt, props.before_lines), 1.0);
        self.space_after
            .add(spacing_detail(props.space_after_pt, props.after_lines), 1.0);

        let (first_line, hanging) = match props.first_line_pt {
            Some(first) if first < 0.0 => (Some(0.0), Some(first.abs())),
            other => (other, None),
        };
        self.indent_left_pt.add(props.indent_left_pt, 1.0);
        self.indent_right_pt.add(props.indent_right_pt, 1.0);
        self.indent_first_line_pt.add(first_line, 1.0);
        self.indent_hanging_pt.add(hanging, 1.0);

        line.is_some_and(|(_, inferred)| inferred)
    }

    pub fn add_run(&mut self, run: &Run, weight: f64) {
        self.font_name
            .add(run.preferred_font().map(str::to_string), weight);
        self.font_name_ascii.add(run.ascii.clone(), weight);
        self.font_name_h_ansi.add(run.h_ansi.clone(), weight);
        self.font_name_east_asia.add(run.east_asia.clone(), weight);
        self.font_size_pt.add(run.size_pt, weight);
        self.bold.add(run.bold, weight);
    }

    /// Votes for every non-blank run, weighted by its trimmed length.
    pub fn add_runs(&mut self, runs: &[Run]) {
        for run in runs {
            if let Some(weight) = run_weight(run) {
                self.add_run(run, weight);
            }
        }
    }

    /// Lets the first non-blank run dominate the run-level fields.
    pub fn add_first_run(&mut self, runs: &[Run]) {
        if let Some(run) = runs.iter().find(|r| !r.is_blank()) {
            self.add_run(run, FIRST_RUN_WEIGHT);
        }
    }

    /// A copy carrying a role entry's own count and first position.
    pub fn derive(&self, count: usize, first_index: Option<usize>) -> SampleStats {
        SampleStats {
            count: if count > 0 { count } else { self.count },
            first_index: first_index.or(self.first_index),
            ..self.clone()
        }
    }
}

/// Per-style statistics over the whole paragraph stream. Styles that share
/// a display name share one bucket.
#[derive(Debug, Default)]
pub struct StyleSamples {
    buckets: Vec<SampleStats>,
    by_id: HashMap<String, usize>,
}

impl StyleSamples {
    pub fn collect(
        paragraphs: &[Paragraph],
        catalog: &StyleCatalog,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut samples = StyleSamples::default();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (index, paragraph) in (1..).zip(paragraphs) {
            if paragraph.is_blank() {
                continue;
            }
            let Some(style) = catalog.paragraph_style(paragraph.style_id.as_deref()) else {
                continue;
            };
            let bucket = match samples.by_id.get(&style.id) {
                Some(&bucket) => bucket,
                None => {
                    let name_key = style
                        .name
                        .as_deref()
                        .map(|n| n.trim().to_lowercase())
                        .filter(|n| !n.is_empty());
                    let bucket = match name_key {
                        Some(key) => *by_name.entry(key).or_insert_with(|| {
                            samples.buckets.push(SampleStats::default());
                            samples.buckets.len() - 1
                        }),
                        None => {
                            samples.buckets.push(SampleStats::default());
                            samples.buckets.len() - 1
                        }
                    };
                    samples.by_id.insert(style.id.clone(), bucket);
                    bucket
                }
            };
            let stats = &mut samples.buckets[bucket];
            stats.note_paragraph(paragraph, index, style.name.as_deref());
            if stats.add_paragraph_format(paragraph, style.props.alignment) {
                diagnostics.push(
                    Warning::new(
                        WarningKind::LineSpacing,
                        "inferred EXACTLY due to missing lineRule",
                    )
                    .with_style(&style.id)
                    .at_paragraph(index),
                );
            }
            stats.add_runs(&paragraph.runs);
        }
        log::debug!(
            "sampled {} styles into {} buckets",
            samples.by_id.len(),
            samples.buckets.len()
        );
        samples
    }

    pub fn get(&self, style_id: &str) -> Option<&SampleStats> {
        self.by_id.get(style_id).map(|&bucket| &self.buckets[bucket])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleStats)> {
        self.by_id
            .iter()
            .map(|(id, &bucket)| (id.as_str(), &self.buckets[bucket]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_prefers_weight_then_first_seen() {
        let mut mode = WeightedMode::default();
        mode.add(Some("宋体"), 2.0);
        mode.add(Some("黑体"), 3.0);
        mode.add(None, 100.0);
        assert_eq!(mode.mode(), Some("黑体"));
        mode.add(Some("宋体"), 1.0);
        assert_eq!(mode.mode(), Some("宋体"));
        assert!(WeightedMode::<bool>::default().mode().is_none());
    }

    #[test]
    fn line_spacing_normalisation() {
        let props = |rule: Option<&str>, line| ParagraphProps {
            line_rule: rule.map(str::to_string),
            line_twips: Some(line),
            ..ParagraphProps::default()
        };
        assert_eq!(
            paragraph_line_spacing(&props(None, 240)),
            Some((LineSpacing::SINGLE, false))
        );
        assert_eq!(
            paragraph_line_spacing(&props(Some("auto"), 360)),
            Some((LineSpacing::ONE_POINT_FIVE, false))
        );
        assert_eq!(
            paragraph_line_spacing(&props(Some("auto"), 480)).map(|(s, _)| s.rule),
            Some(LineSpacingRule::Double)
        );
        assert_eq!(
            paragraph_line_spacing(&props(Some("auto"), 300)),
            Some((LineSpacing::multiple(1.25), false))
        );
        assert_eq!(
            paragraph_line_spacing(&props(Some("exact"), 400)),
            Some((LineSpacing::points(LineSpacingRule::Exactly, 20.0), false))
        );
        assert_eq!(
            paragraph_line_spacing(&props(Some("atLeast"), 240)),
            Some((LineSpacing::points(LineSpacingRule::AtLeast, 12.0), false))
        );
        assert_eq!(
            paragraph_line_spacing(&props(Some("bogus"), 300)),
            Some((LineSpacing::points(LineSpacingRule::Exactly, 15.0), true))
        );
        assert_eq!(paragraph_line_spacing(&ParagraphProps::default()), None);
    }

    #[test]
    fn hanging_indent_and_line_units() {
        let paragraph = Paragraph {
            props: ParagraphProps {
                first_line_pt: Some(-21.0),
                space_before_pt: Some(7.8),
                before_lines: Some(0.5),
                space_after_pt: Some(6.0),
                ..ParagraphProps::default()
            },
            ..Paragraph::default()
        };
        let mut stats = SampleStats::default();
        stats.add_paragraph_format(&paragraph, Some(Alignment::Center));
        assert_eq!(stats.indent_hanging_pt.mode(), Some(21.0));
        assert_eq!(stats.indent_first_line_pt.mode(), Some(0.0));
        assert_eq!(stats.alignment.mode(), Some(Alignment::Center));
        assert_eq!(
            stats.space_before.mode(),
            Some(Spacing {
                value: 0.5,
                unit: SpacingUnit::Line
            })
        );
        assert_eq!(
            stats.space_after.mode(),
            Some(Spacing {
                value: 6.0,
                unit: SpacingUnit::Pt
            })
        );
    }

    #[test]
    fn runs_vote_by_length_and_first_run_dominates() {
        let run = |text: &str, font: &str| Run {
            text: text.into(),
            east_asia: Some(font.into()),
            ..Run::default()
        };
        let runs = vec![run("  ", "楷体"), run("关键词：", "黑体"), run("排版，样式，模板", "宋体")];
        let mut stats = SampleStats::default();
        stats.add_runs(&runs);
        assert_eq!(stats.font_name.mode().as_deref(), Some("宋体"));

        let mut stats = SampleStats::default();
        stats.add_first_run(&runs);
        stats.add_runs(&runs);
        assert_eq!(stats.font_name.mode().as_deref(), Some("黑体"));
    }

    #[test]
    fn text_samples_are_distinct_and_capped() {
        let mut stats = SampleStats::default();
        for text in ["a", " a ", "b", "", "c", "d"] {
            stats.note_text(text);
        }
        assert_eq!(stats.text_samples, vec!["a", "b", "c"]);
    }
}
