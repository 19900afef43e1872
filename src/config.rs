use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::error::Error;
use crate::role::{COVER_SECTION_KEY, Role};
use crate::sections::{self, SectionRule};
use crate::template_types;

/// File picked up next to a template when no role map is configured.
pub const ROLE_MAP_FILE_NAME: &str = "role_mapping.json";

/// Caller-facing parse configuration. Every field has a default, so an
/// options file only needs the keys it changes.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Explicit style to role assignments. Read separately from options
    /// files so that malformed maps surface as role-mapping errors.
    #[serde(skip)]
    pub role_map: Option<RoleMap>,
    /// Role map file to load when `role_map` is unset. Must exist.
    pub role_map_path: Option<PathBuf>,
    pub max_heading_level: u32,
    /// Highest raw outline level treated as a heading; 0 means the highest
    /// level observed in the template.
    pub outline_level_max: u32,
    pub required_roles: Vec<String>,
    pub required_on_presence_map: BTreeMap<String, String>,
    pub allow_fallback: bool,
    pub strict: bool,
    pub template_type: String,
    pub section_rules: Option<Vec<SectionRule>>,
    pub caption_window: usize,
    pub note_window: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            role_map: None,
            role_map_path: None,
            max_heading_level: 6,
            outline_level_max: 0,
            required_roles: vec!["title_L1".into(), "body_L1".into()],
            required_on_presence_map: [
                ("abstract_title", "abstract_body"),
                ("abstract_en_title", "abstract_en_body"),
                ("reference_title", "reference_body"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            allow_fallback: true,
            strict: false,
            template_type: template_types::GENERIC.to_string(),
            section_rules: None,
            caption_window: 2,
            note_window: 2,
        }
    }
}

impl ParseOptions {
    /// Loads options from a JSON object. `role_map` may hold any JSON value
    /// and is validated as a role map.
    pub fn from_json_value(mut value: serde_json::Value) -> Result<Self, Error> {
        let raw_map = value
            .as_object_mut()
            .and_then(|object| object.remove("role_map"))
            .filter(|raw| !raw.is_null());
        let mut options: ParseOptions = serde_json::from_value(value)?;
        if let Some(raw) = raw_map {
            options.role_map = Some(RoleMap::from_json_value(&raw)?);
        }
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = read_config_file(path)?;
        Self::from_json_value(serde_json::from_str(&text)?)
    }
}

fn read_config_file(path: &Path) -> Result<String, Error> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(Error::NotAFile(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Ordered role map entries as written by the user, with role values
/// already normalised.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoleMap {
    entries: Vec<(String, Role)>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, role: &str) -> Result<(), Error> {
        let role: Role = role.parse()?;
        self.entries.push((key.to_string(), role));
        Ok(())
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = RoleMap::new();
        for (key, role) in pairs {
            map.insert(key.as_ref(), role.as_ref())?;
        }
        Ok(map)
    }

    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, Error> {
        let Some(object) = value.as_object() else {
            return Err(Error::InvalidRoleMapping(
                "role mapping must be a JSON object".into(),
            ));
        };
        let mut map = RoleMap::new();
        for (key, role) in object {
            let Some(role) = role.as_str() else {
                return Err(Error::InvalidRoleMapping(format!(
                    "value for {key:?} must be a string"
                )));
            };
            map.insert(key, role)?;
        }
        Ok(map)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = read_config_file(path)?;
        Self::from_json_value(&serde_json::from_str(&text)?)
    }
}

/// A role map bound to one template's style catalog.
#[derive(Debug, Default)]
pub(crate) struct BoundRoleMap {
    by_id: HashMap<String, Role>,
    by_name: HashMap<String, Role>,
}

impl BoundRoleMap {
    /// Splits entries into id and name lookups. A plain key that names a
    /// style id but no style name is ambiguous and dropped with a warning.
    pub fn bind<'a>(
        map: &RoleMap,
        style_ids: impl IntoIterator<Item = &'a str>,
        style_names: impl IntoIterator<Item = &'a str>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let ids: HashSet<String> = style_ids.into_iter().map(str::to_lowercase).collect();
        let names: HashSet<String> = style_names
            .into_iter()
            .map(|n| n.trim().to_lowercase())
            .collect();
        let mut bound = BoundRoleMap::default();
        for (key, role) in &map.entries {
            let key_lower = key.trim().to_lowercase();
            if let Some(id) = key_lower.strip_prefix("id:") {
                let id = id.trim();
                if !id.is_empty() {
                    bound.by_id.insert(id.to_string(), role.clone());
                }
                continue;
            }
            if ids.contains(&key_lower) && !names.contains(&key_lower) {
                diagnostics.push(
                    Warning::new(
                        WarningKind::RoleMap,
                        "ignored key matching a style id without 'id:' prefix",
                    )
                    .with_style(key),
                );
                continue;
            }
            if !key_lower.is_empty() {
                bound.by_name.insert(key_lower, role.clone());
            }
        }
        bound
    }

    pub fn lookup(&self, style_id: Option<&str>, style_name: Option<&str>) -> Option<&Role> {
        style_id
            .and_then(|id| self.by_id.get(&id.to_lowercase()))
            .or_else(|| style_name.and_then(|name| self.by_name.get(&name.trim().to_lowercase())))
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.by_name.values().chain(self.by_id.values())
    }
}

/// Validated options for one parse, with the section rules selected.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub max_heading_level: u32,
    pub outline_level_max: u32,
    pub required_roles: Vec<Role>,
    pub required_on_presence: Vec<(Role, Role)>,
    pub allow_fallback: bool,
    pub strict: bool,
    pub template_type: String,
    pub section_rules: Vec<SectionRule>,
    pub cover_detection: bool,
    pub caption_window: usize,
    pub note_window: usize,
}

impl Settings {
    pub fn new(options: &ParseOptions) -> Result<Self, Error> {
        if options.max_heading_level == 0 {
            return Err(Error::InvalidOption(
                "max_heading_level must be at least 1".into(),
            ));
        }
        let mut required_roles = Vec::new();
        for raw in &options.required_roles {
            let role: Role = raw.parse()?;
            if !required_roles.contains(&role) {
                required_roles.push(role);
            }
        }
        let mut required_on_presence = Vec::new();
        for (trigger, target) in &options.required_on_presence_map {
            required_on_presence.push((trigger.parse()?, target.parse()?));
        }
        if let Some(rules) = &options.section_rules {
            sections::validate_rules(rules)?;
        }
        let template_type = match options.template_type.trim() {
            "" => template_types::GENERIC.to_string(),
            key => key.to_string(),
        };
        Ok(Self {
            max_heading_level: options.max_heading_level,
            outline_level_max: options.outline_level_max,
            required_roles,
            required_on_presence,
            allow_fallback: options.allow_fallback,
            strict: options.strict,
            template_type,
            section_rules: Vec::new(),
            cover_detection: false,
            caption_window: options.caption_window,
            note_window: options.note_window,
        })
    }

    /// Chooses the section rules: explicit rules win, `auto` inspects the
    /// template text, any other key names a built-in template type.
    pub fn select_sections(&mut self, explicit: Option<&[SectionRule]>, texts: &[String]) {
        if let Some(rules) = explicit {
            self.section_rules = rules.to_vec();
        } else if self.template_type.eq_ignore_ascii_case(template_types::AUTO) {
            let detected = template_types::detect(texts);
            log::debug!("auto-detected template type {}", detected.key);
            self.template_type = detected.key.to_string();
            self.section_rules = detected.section_rules;
        } else {
            self.section_rules = template_types::resolve(&self.template_type).section_rules;
        }
        self.cover_detection = self
            .section_rules
            .iter()
            .any(|rule| rule.key == COVER_SECTION_KEY);
    }
}
