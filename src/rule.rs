//! Turns a resolved style plus its samples into an output [`StyleRule`].

use crate::docx::ResolvedStyle;
use crate::model::{Alignment, LineSpacing, Spacing, SpacingUnit, StyleRule};
use crate::sample::{SampleStats, WeightedMode};

/// The sampled value when samples are preferred or the style leaves the
/// field unset, otherwise the style's own value.
fn sampled<T: Clone + PartialEq>(own: Option<T>, mode: Option<&WeightedMode<T>>, prefer: bool) -> Option<T> {
    match mode {
        Some(mode) if prefer || own.is_none() => mode.mode().or(own),
        _ => own,
    }
}

fn spacing_detail(detail: Option<Spacing>, pt: Option<f32>) -> (Option<f32>, Option<SpacingUnit>) {
    match detail {
        Some(spacing) => (Some(spacing.value), Some(spacing.unit)),
        None => (pt, pt.map(|_| SpacingUnit::Pt)),
    }
}

/// Builds the rule for one selected candidate.
///
/// With `prefer_samples` the observed values win over the style chain;
/// without it they only fill gaps. Indents always come from the samples.
/// Whatever is still unset afterwards gets the neutral defaults, except
/// font name and size.
pub(crate) fn build_style_rule(
    resolved: &ResolvedStyle,
    stats: Option<&SampleStats>,
    prefer_samples: bool,
) -> StyleRule {
    let prefer = prefer_samples;
    let mut rule = StyleRule::default();

    let line = sampled(resolved.line_spacing(), stats.map(|s| &s.line_spacing), prefer);
    rule.set_line_spacing(line.unwrap_or(LineSpacing::SINGLE));

    let sample_name = stats.and_then(|s| s.font_name.mode());
    let prefer_sample_name = prefer && sample_name.is_some();
    rule.font_name = if prefer_sample_name || resolved.font_name.is_none() {
        sample_name.or_else(|| resolved.font_name.clone())
    } else {
        resolved.font_name.clone()
    };

    let fonts = &resolved.fonts;
    rule.font_name_ascii = sampled(fonts.ascii.clone(), stats.map(|s| &s.font_name_ascii), prefer);
    rule.font_name_h_ansi = sampled(fonts.h_ansi.clone(), stats.map(|s| &s.font_name_h_ansi), prefer);
    rule.font_name_east_asia = sampled(
        fonts.east_asia.clone(),
        stats.map(|s| &s.font_name_east_asia),
        prefer,
    );
    let preferred = rule
        .font_name_east_asia
        .as_ref()
        .or(rule.font_name_h_ansi.as_ref())
        .or(rule.font_name_ascii.as_ref());
    if let Some(name) = preferred
        && !prefer_sample_name
    {
        rule.font_name = Some(name.clone());
    }

    rule.font_size_pt = sampled(resolved.size_pt, stats.map(|s| &s.font_size_pt), prefer);
    rule.bold = sampled(resolved.bold, stats.map(|s| &s.bold), prefer).or(Some(false));
    rule.alignment = sampled(resolved.alignment, stats.map(|s| &s.alignment), prefer).or(Some(Alignment::Left));

    let space_before = sampled(resolved.space_before_pt, stats.map(|s| &s.space_before_pt), prefer);
    let space_after = sampled(resolved.space_after_pt, stats.map(|s| &s.space_after_pt), prefer);
    rule.space_before_pt = Some(space_before.unwrap_or(0.0));
    rule.space_after_pt = Some(space_after.unwrap_or(0.0));
    (rule.space_before_value, rule.space_before_unit) =
        spacing_detail(stats.and_then(|s| s.space_before.mode()), rule.space_before_pt);
    (rule.space_after_value, rule.space_after_unit) =
        spacing_detail(stats.and_then(|s| s.space_after.mode()), rule.space_after_pt);

    let indent = |mode: fn(&SampleStats) -> &WeightedMode<f32>| {
        Some(stats.and_then(|s| mode(s).mode()).unwrap_or(0.0))
    };
    rule.indent_left_pt = indent(|s| &s.indent_left_pt);
    rule.indent_right_pt = indent(|s| &s.indent_right_pt);
    rule.indent_first_line_pt = indent(|s| &s.indent_first_line_pt);
    rule.indent_hanging_pt = indent(|s| &s.indent_hanging_pt);

    rule.refresh_size_name();
    rule
}
