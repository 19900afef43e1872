mod classify;
mod config;
mod diagnostics;
mod docx;
mod error;
mod fallback;
mod footnotes;
mod header_footer;
mod headings;
mod layout;
mod matcher;
mod model;
mod output;
mod parser;
mod patterns;
mod resolve;
mod role;
mod rule;
mod sample;
mod sections;
mod template_types;

pub use config::{ParseOptions, ROLE_MAP_FILE_NAME, RoleMap};
pub use diagnostics::{Warning, WarningKind};
pub use error::Error;
pub use model::{Alignment, LineSpacingRule, LineSpacingUnit, REQUIRED_FIELDS, SpacingUnit, StyleRule};
pub use output::{ParseResult, RoleLink, SCHEMA_VERSION};
pub use role::{Role, SectionPart, SpecialRole};
pub use sections::{BodyRange, SectionPosition, SectionRule};
pub use template_types::TemplateType;

use std::path::Path;

/// Extracts the per-role style rules of the template at `path`.
pub fn extract_style_spec(path: &Path, options: &ParseOptions) -> Result<ParseResult, Error> {
    parser::parse(path, options)
}

/// Built-in template types and their section rules.
pub fn template_types() -> Vec<TemplateType> {
    template_types::builtin()
}
