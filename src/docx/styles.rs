use std::collections::{HashMap, HashSet};

use super::{DML_NS, TableBorders, attr, dml, is_wml, on_off, twips_attr, wml, wml_attr};
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::error::Error;
use crate::model::{Alignment, LineSpacing, LineSpacingRule};

/// Theme font table: `majorAscii`, `minorEastAsia` and friends mapped to
/// typeface names.
#[derive(Debug, Default)]
pub(crate) struct ThemeFonts {
    fonts: HashMap<String, String>,
}

fn typeface<'a>(node: roxmltree::Node<'a, 'a>, script: &str) -> Option<&'a str> {
    dml(node, script)
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

impl ThemeFonts {
    pub fn parse(xml: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut fonts = HashMap::new();
        for node in doc.descendants() {
            if node.tag_name().namespace() != Some(DML_NS) {
                continue;
            }
            let prefix = match node.tag_name().name() {
                "majorFont" => "major",
                "minorFont" => "minor",
                _ => continue,
            };
            if let Some(tf) = typeface(node, "latin") {
                fonts.insert(format!("{prefix}Ascii"), tf.to_string());
                fonts.insert(format!("{prefix}HAnsi"), tf.to_string());
            }
            if let Some(tf) = typeface(node, "ea") {
                fonts.insert(format!("{prefix}EastAsia"), tf.to_string());
            }
        }
        Ok(Self { fonts })
    }

    /// Loads the package theme; a malformed theme only costs a warning.
    pub fn load(xml: Option<&str>, diagnostics: &mut Diagnostics) -> Self {
        let Some(xml) = xml else {
            return Self::default();
        };
        match Self::parse(xml) {
            Ok(theme) => theme,
            Err(e) => {
                diagnostics.push(Warning::new(
                    WarningKind::ThemeFont,
                    format!("failed to parse theme ({e})"),
                ));
                Self::default()
            }
        }
    }

    fn lookup(&self, token: Option<&str>) -> Option<String> {
        token.and_then(|t| self.fonts.get(t)).cloned()
    }
}

/// Per-script font names plus the theme tokens they may defer to.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FontSpec {
    pub ascii: Option<String>,
    pub h_ansi: Option<String>,
    pub east_asia: Option<String>,
    pub ascii_theme: Option<String>,
    pub h_ansi_theme: Option<String>,
    pub east_asia_theme: Option<String>,
}

impl FontSpec {
    fn parse(rfonts: roxmltree::Node) -> Self {
        let get = |name| attr(rfonts, name).map(str::to_string);
        Self {
            ascii: get("ascii"),
            h_ansi: get("hAnsi"),
            east_asia: get("eastAsia"),
            ascii_theme: get("asciiTheme"),
            h_ansi_theme: get("hAnsiTheme"),
            east_asia_theme: get("eastAsiaTheme"),
        }
    }

    pub fn preferred_name(&self) -> Option<&str> {
        self.east_asia
            .as_deref()
            .or(self.h_ansi.as_deref())
            .or(self.ascii.as_deref())
    }

    /// Fills names that are unset but have a theme token.
    pub fn apply_theme(&self, theme: &ThemeFonts) -> Self {
        Self {
            ascii: self.ascii.clone().or_else(|| theme.lookup(self.ascii_theme.as_deref())),
            h_ansi: self.h_ansi.clone().or_else(|| theme.lookup(self.h_ansi_theme.as_deref())),
            east_asia: self
                .east_asia
                .clone()
                .or_else(|| theme.lookup(self.east_asia_theme.as_deref())),
            ..self.clone()
        }
    }

    /// `self` on top of `base`, attribute by attribute.
    fn over(&self, base: &FontSpec) -> Self {
        let pick = |top: &Option<String>, below: &Option<String>| top.clone().or_else(|| below.clone());
        Self {
            ascii: pick(&self.ascii, &base.ascii),
            h_ansi: pick(&self.h_ansi, &base.h_ansi),
            east_asia: pick(&self.east_asia, &base.east_asia),
            ascii_theme: pick(&self.ascii_theme, &base.ascii_theme),
            h_ansi_theme: pick(&self.h_ansi_theme, &base.h_ansi_theme),
            east_asia_theme: pick(&self.east_asia_theme, &base.east_asia_theme),
        }
    }
}

/// Formatting a style (or the document defaults) sets directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct StyleProps {
    pub fonts: FontSpec,
    pub size_pt: Option<f32>,
    pub bold: Option<bool>,
    pub alignment: Option<Alignment>,
    pub space_before_pt: Option<f32>,
    pub space_after_pt: Option<f32>,
    pub line_rule: Option<String>,
    pub line_twips: Option<i64>,
    pub outline_level: Option<u32>,
}

impl StyleProps {
    fn parse(rpr: Option<roxmltree::Node>, ppr: Option<roxmltree::Node>) -> Self {
        let mut props = StyleProps::default();
        if let Some(rpr) = rpr {
            if let Some(rfonts) = wml(rpr, "rFonts") {
                props.fonts = FontSpec::parse(rfonts);
            }
            props.size_pt = wml_attr(rpr, "sz")
                .and_then(|v| v.parse::<f32>().ok())
                .map(|hp| hp / 2.0);
            props.bold = wml(rpr, "b").map(on_off);
        }
        if let Some(ppr) = ppr {
            props.alignment = wml_attr(ppr, "jc").map(Alignment::from_jc);
            if let Some(spacing) = wml(ppr, "spacing") {
                props.space_before_pt = twips_attr(spacing, "before");
                props.space_after_pt = twips_attr(spacing, "after");
                props.line_rule = attr(spacing, "lineRule").map(str::to_string);
                props.line_twips = attr(spacing, "line").and_then(|v| v.parse().ok());
            }
            if props.space_before_pt.is_none() {
                props.space_before_pt = wml(ppr, "before").and_then(|n| twips_attr(n, "val"));
            }
            if props.space_after_pt.is_none() {
                props.space_after_pt = wml(ppr, "after").and_then(|n| twips_attr(n, "val"));
            }
            props.outline_level = wml_attr(ppr, "outlineLvl").and_then(|v| v.parse().ok());
        }
        props
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StyleKind {
    Paragraph,
    Character,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StyleDefinition {
    pub id: String,
    pub name: Option<String>,
    pub based_on: Option<String>,
    pub kind: StyleKind,
    pub is_default: bool,
    pub props: StyleProps,
}

#[derive(Clone, Debug, Default)]
struct TableStyle {
    name: Option<String>,
    borders: Option<TableBorders>,
}

/// A style after walking its `basedOn` chain and merging the defaults.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResolvedStyle {
    pub style_id: String,
    pub name: Option<String>,
    pub fonts: FontSpec,
    pub font_name: Option<String>,
    pub size_pt: Option<f32>,
    pub bold: Option<bool>,
    pub alignment: Option<Alignment>,
    pub space_before_pt: Option<f32>,
    pub space_after_pt: Option<f32>,
    pub line_rule: Option<String>,
    pub line_twips: Option<i64>,
    pub outline_level: Option<u32>,
}

impl ResolvedStyle {
    /// Line spacing implied by the resolved `w:spacing` attributes.
    pub fn line_spacing(&self) -> Option<LineSpacing> {
        let twips = self.line_twips?;
        let points = twips as f32 / 20.0;
        match self.line_rule.as_deref() {
            Some("exact") => Some(LineSpacing::points(LineSpacingRule::Exactly, points)),
            Some("atLeast") => Some(LineSpacing::points(LineSpacingRule::AtLeast, points)),
            None | Some("auto") => Some(LineSpacing::auto(twips)),
            Some(_) => None,
        }
    }
}

/// Paragraph and character styles of a template, in definition order.
#[derive(Debug, Default)]
pub(crate) struct StyleCatalog {
    styles: Vec<StyleDefinition>,
    index: HashMap<String, usize>,
    defaults: StyleProps,
    theme: ThemeFonts,
    table_styles: HashMap<String, TableStyle>,
}

impl StyleCatalog {
    pub fn parse(xml: &str, theme: ThemeFonts) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let mut catalog = StyleCatalog {
            theme,
            ..StyleCatalog::default()
        };
        if let Some(doc_defaults) = wml(root, "docDefaults") {
            let rpr = wml(doc_defaults, "rPrDefault").and_then(|n| wml(n, "rPr"));
            let ppr = wml(doc_defaults, "pPrDefault").and_then(|n| wml(n, "pPr"));
            catalog.defaults = StyleProps::parse(rpr, ppr);
        }

        for style_node in root.children().filter(|n| is_wml(*n, "style")) {
            let Some(style_id) = attr(style_node, "styleId").filter(|id| !id.is_empty()) else {
                continue;
            };
            let name = wml_attr(style_node, "name").map(str::to_string);
            let rpr = wml(style_node, "rPr");
            let ppr = wml(style_node, "pPr");
            let kind = match attr(style_node, "type") {
                Some("paragraph") => StyleKind::Paragraph,
                Some("character") => StyleKind::Character,
                Some("table") => {
                    let borders = wml(style_node, "tblPr")
                        .and_then(TableBorders::parse)
                        .filter(TableBorders::any);
                    catalog
                        .table_styles
                        .insert(style_id.to_string(), TableStyle { name, borders });
                    continue;
                }
                None if rpr.is_some() || ppr.is_some() => StyleKind::Paragraph,
                _ => continue,
            };
            let is_default = attr(style_node, "default").is_some_and(|v| on_off_value(v));
            catalog.index.insert(style_id.to_string(), catalog.styles.len());
            catalog.styles.push(StyleDefinition {
                id: style_id.to_string(),
                name,
                based_on: wml_attr(style_node, "basedOn").map(str::to_string),
                kind,
                is_default,
                props: StyleProps::parse(rpr, ppr),
            });
        }
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn styles(&self) -> &[StyleDefinition] {
        &self.styles
    }

    pub fn get(&self, style_id: &str) -> Option<&StyleDefinition> {
        self.index.get(style_id).map(|&i| &self.styles[i])
    }

    pub fn contains(&self, style_id: &str) -> bool {
        self.index.contains_key(style_id)
    }

    /// The style a paragraph renders with: its `w:pStyle` when that names a
    /// paragraph style, otherwise the default paragraph style.
    pub fn paragraph_style(&self, p_style: Option<&str>) -> Option<&StyleDefinition> {
        p_style
            .and_then(|id| self.get(id))
            .filter(|s| s.kind == StyleKind::Paragraph)
            .or_else(|| {
                self.styles
                    .iter()
                    .find(|s| s.kind == StyleKind::Paragraph && s.is_default)
            })
    }

    pub fn has_table_style(&self, style_id: &str) -> bool {
        self.table_styles.contains_key(style_id)
    }

    pub fn table_style_name(&self, style_id: &str) -> Option<&str> {
        self.table_styles.get(style_id)?.name.as_deref()
    }

    pub fn table_style_borders(&self, style_id: &str) -> Option<TableBorders> {
        self.table_styles.get(style_id)?.borders
    }

    /// Walks the `basedOn` chain of `style_id`, root first. The walk stops
    /// at a missing parent or at the first repeated id.
    fn chain(&self, style_id: &str) -> Vec<&StyleDefinition> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(style_id);
        while let Some(id) = current {
            if !visited.insert(id) {
                log::debug!("style inheritance cycle at {id}");
                break;
            }
            let Some(style) = self.get(id) else {
                break;
            };
            chain.push(style);
            current = style.based_on.as_deref();
        }
        chain.reverse();
        chain
    }

    pub fn resolve(&self, style_id: &str) -> Result<ResolvedStyle, Error> {
        let Some(target) = self.get(style_id) else {
            return Err(Error::UnknownStyle(style_id.to_string()));
        };
        let mut merged = StyleProps {
            fonts: FontSpec::default(),
            ..self.defaults.clone()
        };
        for style in self.chain(style_id) {
            let props = &style.props;
            merged.fonts = props.fonts.over(&merged.fonts);
            merged.size_pt = props.size_pt.or(merged.size_pt);
            merged.bold = props.bold.or(merged.bold);
            merged.alignment = props.alignment.or(merged.alignment);
            merged.space_before_pt = props.space_before_pt.or(merged.space_before_pt);
            merged.space_after_pt = props.space_after_pt.or(merged.space_after_pt);
            merged.line_rule = props.line_rule.clone().or(merged.line_rule);
            merged.line_twips = props.line_twips.or(merged.line_twips);
            merged.outline_level = props.outline_level.or(merged.outline_level);
        }
        let default_fonts = self.defaults.fonts.apply_theme(&self.theme);
        merged.fonts = merged.fonts.apply_theme(&self.theme).over(&default_fonts);
        Ok(self.finish(style_id, target.name.clone(), merged))
    }

    /// The document defaults alone, for paragraphs without a usable style.
    pub fn resolve_defaults(&self, style_id: &str) -> ResolvedStyle {
        let mut props = self.defaults.clone();
        props.fonts = props.fonts.apply_theme(&self.theme);
        self.finish(style_id, None, props)
    }

    fn finish(&self, style_id: &str, name: Option<String>, props: StyleProps) -> ResolvedStyle {
        ResolvedStyle {
            style_id: style_id.to_string(),
            name,
            font_name: props.fonts.preferred_name().map(str::to_string),
            fonts: props.fonts,
            size_pt: props.size_pt,
            bold: props.bold,
            alignment: props.alignment,
            space_before_pt: props.space_before_pt,
            space_after_pt: props.space_after_pt,
            line_rule: props.line_rule,
            line_twips: props.line_twips,
            outline_level: props.outline_level,
        }
    }
}

fn on_off_value(val: &str) -> bool {
    !matches!(val.to_ascii_lowercase().as_str(), "0" | "false" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:asciiTheme="minorHAnsi" w:eastAsiaTheme="minorEastAsia"/><w:sz w:val="21"/></w:rPr></w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:pPr><w:jc w:val="both"/></w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Base">
    <w:name w:val="Base"/>
    <w:basedOn w:val="Normal"/>
    <w:rPr><w:rFonts w:eastAsia="黑体"/><w:b/><w:sz w:val="32"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Child">
    <w:name w:val="Child"/>
    <w:basedOn w:val="Base"/>
    <w:pPr><w:jc w:val="center"/><w:spacing w:line="300" w:lineRule="exact"/></w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="LoopA"><w:basedOn w:val="LoopB"/><w:rPr><w:sz w:val="24"/></w:rPr></w:style>
  <w:style w:type="paragraph" w:styleId="LoopB"><w:basedOn w:val="LoopA"/><w:rPr><w:b w:val="0"/></w:rPr></w:style>
  <w:style w:type="table" w:styleId="Grid">
    <w:name w:val="Table Grid"/>
    <w:tblPr><w:tblBorders><w:top w:val="single"/><w:bottom w:val="single"/><w:left w:val="single"/><w:right w:val="single"/><w:insideH w:val="single"/><w:insideV w:val="single"/></w:tblBorders></w:tblPr>
  </w:style>
  <w:style w:type="numbering" w:styleId="List"/>
</w:styles>"#;

    const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <a:themeElements><a:fontScheme name="Office">
    <a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/></a:majorFont>
    <a:minorFont><a:latin typeface="Calibri"/><a:ea typeface="等线"/></a:minorFont>
  </a:fontScheme></a:themeElements>
</a:theme>"#;

    fn catalog() -> StyleCatalog {
        StyleCatalog::parse(STYLES, ThemeFonts::parse(THEME).unwrap()).unwrap()
    }

    #[test]
    fn child_overrides_parent_per_attribute() {
        let resolved = catalog().resolve("Child").unwrap();
        assert_eq!(resolved.alignment, Some(Alignment::Center));
        assert_eq!(resolved.size_pt, Some(16.0));
        assert_eq!(resolved.bold, Some(true));
        assert_eq!(resolved.font_name.as_deref(), Some("黑体"));
        assert_eq!(resolved.fonts.ascii.as_deref(), Some("Calibri"));
        assert_eq!(
            resolved.line_spacing(),
            Some(LineSpacing::points(LineSpacingRule::Exactly, 15.0))
        );
    }

    #[test]
    fn defaults_fill_through_theme() {
        let resolved = catalog().resolve("Normal").unwrap();
        assert_eq!(resolved.size_pt, Some(10.5));
        assert_eq!(resolved.font_name.as_deref(), Some("等线"));
        assert_eq!(resolved.alignment, Some(Alignment::Justify));
        assert_eq!(resolved.line_spacing(), Some(LineSpacing::SINGLE));
    }

    #[test]
    fn cycles_terminate() {
        let resolved = catalog().resolve("LoopA").unwrap();
        assert_eq!(resolved.size_pt, Some(12.0));
        assert_eq!(resolved.bold, Some(false));
    }

    #[test]
    fn unknown_style_is_an_error() {
        assert!(matches!(catalog().resolve("Missing"), Err(Error::UnknownStyle(_))));
    }

    #[test]
    fn table_and_numbering_styles_stay_out_of_the_catalog() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 5);
        assert!(!catalog.contains("Grid"));
        assert_eq!(catalog.table_style_name("Grid"), Some("Table Grid"));
        assert!(catalog.table_style_borders("Grid").is_some_and(|b| b.inside_v));
    }

    #[test]
    fn unstyled_paragraphs_use_the_default_style() {
        let catalog = catalog();
        assert_eq!(catalog.paragraph_style(None).map(|s| s.id.as_str()), Some("Normal"));
        assert_eq!(
            catalog.paragraph_style(Some("Nope")).map(|s| s.id.as_str()),
            Some("Normal")
        );
        assert_eq!(
            catalog.paragraph_style(Some("Child")).map(|s| s.id.as_str()),
            Some("Child")
        );
    }
}
