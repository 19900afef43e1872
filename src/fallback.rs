//! Required roles, default rules and strict-mode validation.

use std::collections::BTreeMap;

use crate::config::Settings;
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::error::Error;
use crate::model::{Alignment, LineSpacing, SpacingUnit, StyleRule};
use crate::role::Role;

const DEFAULT_FONT: &str = "宋体";

pub(crate) fn default_title_rule() -> StyleRule {
    let mut rule = StyleRule {
        font_name: Some(DEFAULT_FONT.into()),
        font_name_east_asia: Some(DEFAULT_FONT.into()),
        font_size_pt: Some(16.0),
        bold: Some(true),
        alignment: Some(Alignment::Center),
        space_before_pt: Some(12.0),
        space_after_pt: Some(12.0),
        space_before_value: Some(12.0),
        space_before_unit: Some(SpacingUnit::Pt),
        space_after_value: Some(12.0),
        space_after_unit: Some(SpacingUnit::Pt),
        ..zero_indents()
    };
    rule.set_line_spacing(LineSpacing::ONE_POINT_FIVE);
    rule.refresh_size_name();
    rule
}

pub(crate) fn default_body_rule() -> StyleRule {
    let mut rule = StyleRule {
        font_name: Some(DEFAULT_FONT.into()),
        font_name_east_asia: Some(DEFAULT_FONT.into()),
        font_size_pt: Some(12.0),
        bold: Some(false),
        alignment: Some(Alignment::Justify),
        space_before_pt: Some(0.0),
        space_after_pt: Some(0.0),
        space_before_value: Some(0.0),
        space_before_unit: Some(SpacingUnit::Pt),
        space_after_value: Some(0.0),
        space_after_unit: Some(SpacingUnit::Pt),
        ..zero_indents()
    };
    rule.set_line_spacing(LineSpacing::ONE_POINT_FIVE);
    rule.refresh_size_name();
    rule
}

fn zero_indents() -> StyleRule {
    StyleRule {
        indent_left_pt: Some(0.0),
        indent_right_pt: Some(0.0),
        indent_first_line_pt: Some(0.0),
        indent_hanging_pt: Some(0.0),
        ..StyleRule::default()
    }
}

/// Targets of presence triggers whose trigger role was emitted, in
/// configuration order.
fn conditional_roles(rules: &BTreeMap<Role, StyleRule>, settings: &Settings) -> Vec<Role> {
    let mut targets: Vec<Role> = Vec::new();
    for (trigger, target) in &settings.required_on_presence {
        if rules.contains_key(trigger) && !targets.contains(target) {
            targets.push(target.clone());
        }
    }
    targets
}

fn required_roles(rules: &BTreeMap<Role, StyleRule>, settings: &Settings) -> (Vec<Role>, Vec<Role>) {
    let conditional = conditional_roles(rules, settings);
    let mut required = settings.required_roles.clone();
    for role in &conditional {
        if !required.contains(role) {
            required.push(role.clone());
        }
    }
    (required, conditional)
}

/// Where a role's missing fields are taken from: the base rule (if one was
/// emitted) then a built-in default.
struct Chain {
    base: Option<StyleRule>,
    default: StyleRule,
    description: String,
}

fn chain_for(
    role: &Role,
    conditional: &[Role],
    rules: &BTreeMap<Role, StyleRule>,
    global_body: Option<&StyleRule>,
) -> Chain {
    if conditional.contains(role) {
        return Chain {
            base: rules.get(&Role::BASE_BODY).cloned(),
            default: default_body_rule(),
            description: "body_L1 -> default_body".into(),
        };
    }
    match role {
        Role::Title(level) if *level > 1 => Chain {
            base: rules.get(&Role::BASE_TITLE).cloned(),
            default: default_title_rule(),
            description: "title_L1 -> default_title".into(),
        },
        Role::Title(_) => Chain {
            base: None,
            default: default_title_rule(),
            description: "default_title".into(),
        },
        Role::Body(_) => Chain {
            base: global_body.cloned(),
            default: default_body_rule(),
            description: match global_body {
                Some(_) => "global_body -> default_body".into(),
                None => "default_body".into(),
            },
        },
        _ => Chain {
            base: None,
            default: zero_indents(),
            description: format!("default({role})"),
        },
    }
}

fn fill(rule: &mut StyleRule, chain: &Chain) {
    if let Some(base) = &chain.base {
        rule.fill_from(base);
    }
    rule.fill_from(&chain.default);
}

/// Adds missing required roles and, when fallback is allowed, fills the
/// gaps of every rule from its chain. Does nothing in strict mode.
pub(crate) fn apply_fallbacks(
    rules: &mut BTreeMap<Role, StyleRule>,
    settings: &Settings,
    global_body: Option<&StyleRule>,
    diagnostics: &mut Diagnostics,
) {
    if settings.strict {
        return;
    }
    let (required, conditional) = required_roles(rules, settings);

    for role in &required {
        let chain = chain_for(role, &conditional, rules, global_body);
        let rule = rules.entry(role.clone()).or_default();
        let missing = rule.missing_required();
        if missing.is_empty() {
            continue;
        }
        let fields = missing.join(", ");
        let reason = if settings.allow_fallback {
            format!("{fields} (fallback via {})", chain.description)
        } else {
            format!("{fields} (missing)")
        };
        diagnostics.push(Warning::new(WarningKind::MissingFields, reason).with_role(role));
        if settings.allow_fallback {
            fill(rule, &chain);
        }
    }

    if !settings.allow_fallback {
        return;
    }
    let roles: Vec<Role> = rules.keys().cloned().collect();
    for role in roles {
        let chain = chain_for(&role, &conditional, rules, global_body);
        if let Some(rule) = rules.get_mut(&role) {
            fill(rule, &chain);
        }
    }
}

/// Fails when a required role is absent or any rule lacks a required
/// field.
pub(crate) fn validate_strict(rules: &BTreeMap<Role, StyleRule>, settings: &Settings) -> Result<(), Error> {
    let (required, _) = required_roles(rules, settings);
    let missing_roles: Vec<String> = required
        .iter()
        .filter(|role| !rules.contains_key(*role))
        .map(Role::to_string)
        .collect();
    if !missing_roles.is_empty() {
        return Err(Error::StrictValidationFailed(format!(
            "strict mode missing roles: {}",
            missing_roles.join(", ")
        )));
    }

    let incomplete: Vec<String> = rules
        .iter()
        .filter_map(|(role, rule)| {
            let missing = rule.missing_required();
            (!missing.is_empty()).then(|| format!("{role}: {}", missing.join(", ")))
        })
        .collect();
    if !incomplete.is_empty() {
        return Err(Error::StrictValidationFailed(format!(
            "strict mode missing fields: {}",
            incomplete.join("; ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::model::LineSpacingRule;
    use crate::role::SpecialRole;

    fn settings(options: ParseOptions) -> Settings {
        Settings::new(&options).unwrap()
    }

    fn partial(size: f32) -> StyleRule {
        StyleRule {
            font_size_pt: Some(size),
            ..StyleRule::default()
        }
    }

    #[test]
    fn required_roles_are_synthesised_from_defaults() {
        let mut rules = BTreeMap::new();
        let mut diagnostics = Diagnostics::default();
        apply_fallbacks(&mut rules, &settings(ParseOptions::default()), None, &mut diagnostics);

        let title = &rules[&Role::BASE_TITLE];
        assert_eq!(title.font_size_pt, Some(16.0));
        assert_eq!(title.bold, Some(true));
        assert_eq!(title.alignment, Some(Alignment::Center));
        let body = &rules[&Role::BASE_BODY];
        assert_eq!(body.font_name.as_deref(), Some("宋体"));
        assert_eq!(body.line_spacing_rule, Some(LineSpacingRule::OnePointFive));
        assert_eq!(body.alignment, Some(Alignment::Justify));

        let reasons: Vec<&str> = diagnostics.warnings().iter().map(|w| w.reason.as_str()).collect();
        assert!(reasons[0].ends_with("(fallback via default_title)"));
        assert!(reasons[1].ends_with("(fallback via default_body)"));
    }

    #[test]
    fn deeper_levels_inherit_from_their_base() {
        let mut rules = BTreeMap::from([
            (Role::Title(1), StyleRule { font_name: Some("黑体".into()), ..partial(18.0) }),
            (Role::Title(2), partial(15.0)),
            (Role::Body(1), partial(12.0)),
            (Role::Body(2), StyleRule::default()),
        ]);
        let global = StyleRule {
            font_name: Some("楷体".into()),
            ..partial(10.5)
        };
        let mut diagnostics = Diagnostics::default();
        apply_fallbacks(
            &mut rules,
            &settings(ParseOptions::default()),
            Some(&global),
            &mut diagnostics,
        );
        assert_eq!(rules[&Role::Title(2)].font_name.as_deref(), Some("黑体"));
        assert_eq!(rules[&Role::Title(2)].font_size_pt, Some(15.0));
        assert_eq!(rules[&Role::Body(2)].font_name.as_deref(), Some("楷体"));
        assert_eq!(rules[&Role::Body(2)].font_size_pt, Some(10.5));
    }

    #[test]
    fn presence_trigger_requires_its_target() {
        let mut rules = BTreeMap::from([
            (Role::Special(SpecialRole::AbstractTitle), partial(16.0)),
            (Role::Body(1), StyleRule { font_name: Some("仿宋".into()), ..partial(12.0) }),
        ]);
        let mut diagnostics = Diagnostics::default();
        apply_fallbacks(&mut rules, &settings(ParseOptions::default()), None, &mut diagnostics);
        let body = &rules[&Role::Special(SpecialRole::AbstractBody)];
        assert_eq!(body.font_name.as_deref(), Some("仿宋"));
        assert!(diagnostics.warnings().iter().any(|w| {
            w.role == Some(Role::Special(SpecialRole::AbstractBody))
                && w.reason.contains("fallback via body_L1 -> default_body")
        }));
    }

    #[test]
    fn disabled_fallback_only_reports() {
        let options = ParseOptions {
            allow_fallback: false,
            ..ParseOptions::default()
        };
        let mut rules = BTreeMap::from([(Role::Body(1), partial(12.0))]);
        let mut diagnostics = Diagnostics::default();
        apply_fallbacks(&mut rules, &settings(options), None, &mut diagnostics);
        assert_eq!(rules[&Role::Body(1)].font_name, None);
        assert!(rules[&Role::Title(1)].missing_required().len() == 9);
        assert!(diagnostics.warnings().iter().all(|w| w.reason.ends_with("(missing)")));
    }

    #[test]
    fn strict_reports_roles_then_fields() {
        let options = ParseOptions {
            strict: true,
            ..ParseOptions::default()
        };
        let strict = settings(options);
        let rules = BTreeMap::from([(Role::Title(1), default_title_rule())]);
        let err = validate_strict(&rules, &strict).unwrap_err().to_string();
        assert!(err.contains("strict mode missing roles: body_L1"), "{err}");

        let rules = BTreeMap::from([
            (Role::Title(1), default_title_rule()),
            (Role::Body(1), partial(12.0)),
        ]);
        let err = validate_strict(&rules, &strict).unwrap_err().to_string();
        assert!(err.contains("body_L1: font_name, bold"), "{err}");

        let rules = BTreeMap::from([
            (Role::Title(1), default_title_rule()),
            (Role::Body(1), default_body_rule()),
        ]);
        assert!(validate_strict(&rules, &strict).is_ok());
    }
}
