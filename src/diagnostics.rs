use std::fmt;

use serde::Serialize;

use crate::role::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    LineSpacing,
    RoleMap,
    ConflictResolved,
    SharedStyle,
    MissingFields,
    ThemeFont,
    PageMargins,
    TableBorders,
    FootnoteNumbering,
    Footnotes,
    HeaderFooter,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::LineSpacing => "line_spacing",
            WarningKind::RoleMap => "role_map",
            WarningKind::ConflictResolved => "conflict_resolved",
            WarningKind::SharedStyle => "shared_style",
            WarningKind::MissingFields => "missing_fields",
            WarningKind::ThemeFont => "theme_font",
            WarningKind::PageMargins => "page_margins",
            WarningKind::TableBorders => "table_borders",
            WarningKind::FootnoteNumbering => "footnote_numbering",
            WarningKind::Footnotes => "footnotes",
            WarningKind::HeaderFooter => "header_footer",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal finding recorded while parsing a template.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
}

impl Warning {
    pub fn new(kind: WarningKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            role: None,
            style_id: None,
            paragraph_index: None,
        }
    }

    pub fn with_role(mut self, role: &Role) -> Self {
        self.role = Some(role.clone());
        self
    }

    pub fn with_style(mut self, style_id: &str) -> Self {
        if !style_id.is_empty() {
            self.style_id = Some(style_id.to_string());
        }
        self
    }

    pub fn at_paragraph(mut self, index: usize) -> Self {
        self.paragraph_index = Some(index);
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.reason)?;
        if let Some(role) = &self.role {
            write!(f, " role={role}")?;
        }
        if let Some(style_id) = &self.style_id {
            write!(f, " style={style_id}")?;
        }
        if let Some(index) = self.paragraph_index {
            write!(f, " paragraph={index}")?;
        }
        Ok(())
    }
}

/// Warnings collected over one parse, in the order they were raised.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// Attributes untagged warnings about `style_id` to the role that ended
    /// up owning the style.
    pub fn tag_style(&mut self, style_id: &str, role: &Role) {
        if style_id.is_empty() {
            return;
        }
        for warning in &mut self.warnings {
            if warning.role.is_none() && warning.style_id.as_deref() == Some(style_id) {
                warning.role = Some(role.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_style_only_fills_untagged_entries() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(Warning::new(WarningKind::LineSpacing, "inferred").with_style("Body"));
        diagnostics.push(
            Warning::new(WarningKind::SharedStyle, "shared")
                .with_style("Body")
                .with_role(&Role::Body(2)),
        );
        diagnostics.push(Warning::new(WarningKind::LineSpacing, "inferred").with_style("Other"));

        diagnostics.tag_style("Body", &Role::Body(1));

        let roles: Vec<_> = diagnostics.warnings().iter().map(|w| w.role.clone()).collect();
        assert_eq!(roles, vec![Some(Role::Body(1)), Some(Role::Body(2)), None]);
    }

    #[test]
    fn display_lists_context() {
        let warning = Warning::new(WarningKind::RoleMap, "ambiguous key")
            .with_style("Heading1")
            .at_paragraph(4);
        assert_eq!(
            warning.to_string(),
            "[role_map] ambiguous key style=Heading1 paragraph=4"
        );
    }
}
