use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Maps a `w:jc` value. Distributed and the various justified forms all
    /// collapse to `Justify`.
    pub fn from_jc(val: &str) -> Alignment {
        match val.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Alignment::Left,
            "center" | "centercontinuous" => Alignment::Center,
            "right" | "end" => Alignment::Right,
            _ => Alignment::Justify,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineSpacingRule {
    Single,
    OnePointFive,
    Double,
    Multiple,
    Exactly,
    AtLeast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineSpacingUnit {
    Multiple,
    Pt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpacingUnit {
    Pt,
    Line,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSpacing {
    pub rule: LineSpacingRule,
    pub value: f32,
    pub unit: LineSpacingUnit,
}

impl LineSpacing {
    pub const SINGLE: LineSpacing = LineSpacing {
        rule: LineSpacingRule::Single,
        value: 1.0,
        unit: LineSpacingUnit::Multiple,
    };
    pub const ONE_POINT_FIVE: LineSpacing = LineSpacing {
        rule: LineSpacingRule::OnePointFive,
        value: 1.5,
        unit: LineSpacingUnit::Multiple,
    };

    pub fn multiple(value: f32) -> Self {
        Self {
            rule: LineSpacingRule::Multiple,
            value,
            unit: LineSpacingUnit::Multiple,
        }
    }

    /// Spacing for `w:line` under the `auto` rule, in 240ths of a line.
    pub fn auto(twips: i64) -> Self {
        match twips {
            240 => LineSpacing::SINGLE,
            360 => LineSpacing::ONE_POINT_FIVE,
            480 => LineSpacing {
                rule: LineSpacingRule::Double,
                ..LineSpacing::multiple(2.0)
            },
            _ => LineSpacing::multiple(twips as f32 / 240.0),
        }
    }

    pub fn points(rule: LineSpacingRule, value: f32) -> Self {
        Self {
            rule,
            value,
            unit: LineSpacingUnit::Pt,
        }
    }
}

/// A spacing amount in the unit the template used for it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacing {
    pub value: f32,
    pub unit: SpacingUnit,
}

/// Fields every emitted rule must carry once fallback has run.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "font_name",
    "font_size_pt",
    "bold",
    "alignment",
    "line_spacing_rule",
    "line_spacing_value",
    "line_spacing_unit",
    "space_before_pt",
    "space_after_pt",
];

/// Effective formatting for one role.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StyleRule {
    pub font_name: Option<String>,
    pub font_name_ascii: Option<String>,
    #[serde(rename = "font_name_eastAsia")]
    pub font_name_east_asia: Option<String>,
    #[serde(rename = "font_name_hAnsi")]
    pub font_name_h_ansi: Option<String>,
    pub font_size_pt: Option<f32>,
    pub font_size_name: Option<&'static str>,
    pub bold: Option<bool>,
    pub alignment: Option<Alignment>,
    pub line_spacing_rule: Option<LineSpacingRule>,
    pub line_spacing_value: Option<f32>,
    pub line_spacing_unit: Option<LineSpacingUnit>,
    pub space_before_pt: Option<f32>,
    pub space_after_pt: Option<f32>,
    pub space_before_value: Option<f32>,
    pub space_before_unit: Option<SpacingUnit>,
    pub space_after_value: Option<f32>,
    pub space_after_unit: Option<SpacingUnit>,
    pub indent_left_pt: Option<f32>,
    pub indent_right_pt: Option<f32>,
    pub indent_first_line_pt: Option<f32>,
    pub indent_hanging_pt: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<&'static str>>,
}

impl StyleRule {
    pub fn set_line_spacing(&mut self, spacing: LineSpacing) {
        self.line_spacing_rule = Some(spacing.rule);
        self.line_spacing_value = Some(spacing.value);
        self.line_spacing_unit = Some(spacing.unit);
    }

    fn has_field(&self, field: &str) -> bool {
        match field {
            "font_name" => self.font_name.is_some(),
            "font_size_pt" => self.font_size_pt.is_some(),
            "bold" => self.bold.is_some(),
            "alignment" => self.alignment.is_some(),
            "line_spacing_rule" => self.line_spacing_rule.is_some(),
            "line_spacing_value" => self.line_spacing_value.is_some(),
            "line_spacing_unit" => self.line_spacing_unit.is_some(),
            "space_before_pt" => self.space_before_pt.is_some(),
            "space_after_pt" => self.space_after_pt.is_some(),
            _ => false,
        }
    }

    /// Required fields that are still unset, in [`REQUIRED_FIELDS`] order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|field| !self.has_field(field))
            .collect()
    }

    pub fn completeness(&self) -> usize {
        REQUIRED_FIELDS.len() - self.missing_required().len()
    }

    /// Copies every field this rule leaves unset from `defaults`.
    pub fn fill_from(&mut self, defaults: &StyleRule) {
        macro_rules! fill {
            ($($field:ident),* $(,)?) => {
                $(if self.$field.is_none() {
                    self.$field = defaults.$field.clone();
                })*
            };
        }
        fill!(
            font_name,
            font_name_ascii,
            font_name_east_asia,
            font_name_h_ansi,
            font_size_pt,
            bold,
            alignment,
            line_spacing_rule,
            line_spacing_value,
            line_spacing_unit,
            space_before_pt,
            space_after_pt,
            space_before_value,
            space_before_unit,
            space_after_value,
            space_after_unit,
            indent_left_pt,
            indent_right_pt,
            indent_first_line_pt,
            indent_hanging_pt,
        );
        self.refresh_size_name();
    }

    pub fn refresh_size_name(&mut self) {
        self.font_size_name = self.font_size_pt.and_then(font_size_name);
    }
}

const CHINESE_FONT_SIZES: [(f32, &str); 16] = [
    (42.0, "初号"),
    (36.0, "小初"),
    (26.0, "一号"),
    (24.0, "小一"),
    (22.0, "二号"),
    (18.0, "小二"),
    (16.0, "三号"),
    (15.0, "小三"),
    (14.0, "四号"),
    (12.0, "小四"),
    (10.5, "五号"),
    (9.0, "小五"),
    (7.5, "六号"),
    (6.5, "小六"),
    (5.5, "七号"),
    (5.0, "八号"),
];

/// Traditional Chinese size name for a point size, within a quarter point.
pub fn font_size_name(pt: f32) -> Option<&'static str> {
    CHINESE_FONT_SIZES
        .iter()
        .find(|(size, _)| (pt - size).abs() <= 0.25)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chinese_size_names() {
        assert_eq!(font_size_name(12.0), Some("小四"));
        assert_eq!(font_size_name(10.5), Some("五号"));
        assert_eq!(font_size_name(15.8), Some("三号"));
        assert_eq!(font_size_name(13.0), None);
    }

    #[test]
    fn jc_values() {
        assert_eq!(Alignment::from_jc("start"), Alignment::Left);
        assert_eq!(Alignment::from_jc("centerContinuous"), Alignment::Center);
        assert_eq!(Alignment::from_jc("end"), Alignment::Right);
        assert_eq!(Alignment::from_jc("distribute"), Alignment::Justify);
        assert_eq!(Alignment::from_jc("both"), Alignment::Justify);
        assert_eq!(Alignment::from_jc("Center"), Alignment::Center);
    }

    #[test]
    fn missing_required_follows_field_order() {
        let mut rule = StyleRule {
            bold: Some(false),
            alignment: Some(Alignment::Left),
            space_before_pt: Some(0.0),
            space_after_pt: Some(0.0),
            ..StyleRule::default()
        };
        rule.set_line_spacing(LineSpacing::SINGLE);
        assert_eq!(rule.missing_required(), vec!["font_name", "font_size_pt"]);
        assert_eq!(rule.completeness(), 7);
    }

    #[test]
    fn serialises_enums_and_mixed_case_keys() {
        let mut rule = StyleRule {
            font_name_east_asia: Some("宋体".into()),
            font_size_pt: Some(12.0),
            alignment: Some(Alignment::Justify),
            ..StyleRule::default()
        };
        rule.set_line_spacing(LineSpacing::ONE_POINT_FIVE);
        rule.refresh_size_name();
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["font_name_eastAsia"], "宋体");
        assert_eq!(json["font_size_name"], "小四");
        assert_eq!(json["alignment"], "JUSTIFY");
        assert_eq!(json["line_spacing_rule"], "ONE_POINT_FIVE");
        assert_eq!(json["line_spacing_unit"], "MULTIPLE");
        assert!(json.get("missing_fields").is_none());
    }

    #[test]
    fn fill_from_keeps_existing_fields() {
        let mut rule = StyleRule {
            font_size_pt: Some(14.0),
            ..StyleRule::default()
        };
        let defaults = StyleRule {
            font_name: Some("宋体".into()),
            font_size_pt: Some(12.0),
            bold: Some(false),
            ..StyleRule::default()
        };
        rule.fill_from(&defaults);
        assert_eq!(rule.font_name.as_deref(), Some("宋体"));
        assert_eq!(rule.font_size_pt, Some(14.0));
        assert_eq!(rule.font_size_name, Some("四号"));
        assert_eq!(rule.bold, Some(false));
        assert_eq!(rule.alignment, None);
    }
}
