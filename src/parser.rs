//! One parse from package to [`ParseResult`].

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use crate::classify::{Classification, Classifier, RoleEntry, Source};
use crate::config::{BoundRoleMap, ParseOptions, ROLE_MAP_FILE_NAME, RoleMap, Settings};
use crate::diagnostics::Diagnostics;
use crate::docx::{Body, Package, StyleCatalog, ThemeFonts};
use crate::error::Error;
use crate::fallback;
use crate::footnotes;
use crate::header_footer;
use crate::headings::HeadingLevels;
use crate::layout;
use crate::matcher;
use crate::model::StyleRule;
use crate::output::{self, Meta, ParseResult, TocLevels};
use crate::resolve::{self, Candidate};
use crate::role::Role;
use crate::sample::StyleSamples;

/// The configured role map, else `role_map_path`, else a map file next to
/// the template when there is one.
fn load_role_map(path: &Path, options: &ParseOptions) -> Result<RoleMap, Error> {
    if let Some(map) = &options.role_map {
        return Ok(map.clone());
    }
    if let Some(map_path) = &options.role_map_path {
        return RoleMap::from_json_file(map_path);
    }
    let sibling = path.with_file_name(ROLE_MAP_FILE_NAME);
    if sibling.is_file() {
        log::debug!("loading role map from {}", sibling.display());
        return RoleMap::from_json_file(&sibling);
    }
    Ok(RoleMap::new())
}

fn stack_candidate(catalog: &StyleCatalog, style_id: &str, entry: &RoleEntry) -> Result<Option<Candidate>, Error> {
    let stats = entry.stats.derive(entry.count, Some(entry.first_index));
    let resolved = if style_id.is_empty() || !catalog.contains(style_id) {
        if stats.count == 0 {
            return Ok(None);
        }
        catalog.resolve_defaults(style_id)
    } else {
        catalog.resolve(style_id)?
    };
    Ok(Some(Candidate {
        resolved,
        source: entry.source,
        stats,
        order: entry.first_index,
        prefer_samples: true,
    }))
}

/// Merges per-style matches with the classifier's per-role entries.
fn collect_candidates(
    catalog: &StyleCatalog,
    samples: &StyleSamples,
    role_map: &BoundRoleMap,
    headings: &HeadingLevels,
    settings: &Settings,
    classification: &Classification,
) -> Result<BTreeMap<Role, Vec<Candidate>>, Error> {
    let mut candidates: BTreeMap<Role, Vec<Candidate>> = BTreeMap::new();
    for (order, style) in catalog.styles().iter().enumerate() {
        let Some(stats) = samples.get(&style.id).filter(|s| s.count > 0) else {
            continue;
        };
        let resolved = catalog.resolve(&style.id)?;
        let Some((role, source)) =
            matcher::match_style(&resolved, stats, role_map, headings, settings.max_heading_level)
        else {
            continue;
        };
        log::debug!("matched style {} as {role} ({source:?})", style.id);
        candidates.entry(role).or_default().push(Candidate {
            resolved,
            source,
            stats: stats.clone(),
            order,
            prefer_samples: false,
        });
    }

    for (role, entries) in &classification.roles {
        for (style_id, entry) in entries {
            if let Some(candidate) = stack_candidate(catalog, style_id, entry)? {
                candidates.entry(role.clone()).or_default().push(candidate);
            }
        }
    }

    if !candidates.contains_key(&Role::BASE_BODY) {
        for (style_id, entry) in &classification.global_body {
            if let Some(candidate) = stack_candidate(catalog, style_id, entry)? {
                candidates.entry(Role::BASE_BODY).or_default().push(candidate);
            }
        }
    }
    Ok(candidates)
}

/// The best of the body paragraphs seen before any heading, as a rule.
fn global_body_rule(catalog: &StyleCatalog, classification: &Classification) -> Result<Option<StyleRule>, Error> {
    let mut globals = Vec::new();
    for (style_id, entry) in &classification.global_body {
        if let Some(mut candidate) = stack_candidate(catalog, style_id, entry)? {
            candidate.source = Source::Global;
            globals.push(candidate);
        }
    }
    Ok(resolve::rank(&Role::BASE_BODY, globals)
        .first()
        .map(Candidate::build_rule))
}

pub(crate) fn parse(path: &Path, options: &ParseOptions) -> Result<ParseResult, Error> {
    let started = Instant::now();
    let mut settings = Settings::new(options)?;
    let package = Package::open(path)?;
    let role_map = load_role_map(path, options)?;
    let mut diagnostics = Diagnostics::default();

    let theme = ThemeFonts::load(package.theme_xml(), &mut diagnostics);
    let catalog = StyleCatalog::parse(package.styles_xml(), theme)?;
    if catalog.is_empty() {
        return Err(Error::NoStylesFound);
    }
    let body = Body::parse(package.document_xml())?;

    let texts: Vec<String> = body
        .paragraphs
        .iter()
        .filter(|p| !p.in_table)
        .map(|p| p.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    settings.select_sections(options.section_rules.as_deref(), &texts);

    let page_margins = layout::page_margins(&body, &settings, &mut diagnostics);
    let table_borders = layout::table_borders(&body, &catalog, &mut diagnostics);
    let footnote_numbering = footnotes::footnote_numbering(&package, &mut diagnostics);
    let header_footer =
        header_footer::header_footer(&package, &body, &catalog, &page_margins.sections, &mut diagnostics);

    let bound = BoundRoleMap::bind(
        &role_map,
        catalog.styles().iter().map(|s| s.id.as_str()),
        catalog.styles().iter().filter_map(|s| s.name.as_deref()),
        &mut diagnostics,
    );
    let samples = StyleSamples::collect(&body.paragraphs, &catalog, &mut diagnostics);
    let headings = HeadingLevels::detect(
        &catalog,
        &samples,
        &bound,
        &body.paragraphs,
        settings.max_heading_level,
        settings.outline_level_max,
    );
    let classification = Classifier::new(&body, &catalog, &bound, &settings, &headings).run();

    let candidates = collect_candidates(&catalog, &samples, &bound, &headings, &settings, &classification)?;
    let global_body = global_body_rule(&catalog, &classification)?;
    let selected = resolve::resolve_conflicts(candidates, &mut diagnostics);

    let mut rules: BTreeMap<Role, StyleRule> = BTreeMap::new();
    for (role, candidate) in &selected {
        rules.insert(role.clone(), candidate.build_rule());
        diagnostics.tag_style(candidate.style_id(), role);
    }
    for (role, rule) in footnotes::footnote_rules(&package, &catalog, &mut diagnostics) {
        rules.entry(role).or_insert(rule);
    }

    fallback::apply_fallbacks(&mut rules, &settings, global_body.as_ref(), &mut diagnostics);
    if settings.strict {
        fallback::validate_strict(&rules, &settings)?;
    }
    if !settings.allow_fallback && !settings.strict {
        for rule in rules.values_mut() {
            rule.missing_fields = Some(rule.missing_required());
        }
    }

    let role_links = output::role_links(&rules);
    let meta = Meta {
        max_heading_level: settings.max_heading_level,
        detected_heading_levels: headings.detected.clone(),
        detected_heading_levels_overflow: headings.overflow.clone(),
        required_roles: settings.required_roles.clone(),
        required_on_presence_map: settings.required_on_presence.iter().cloned().collect(),
        allow_fallback: settings.allow_fallback,
        strict: settings.strict,
        template_type: settings.template_type.clone(),
        section_rules: settings.section_rules.clone(),
        cover_detection_enabled: settings.cover_detection,
        page_margins,
        table_borders,
        title_spacing: classification.title_spacing.iter().cloned().collect(),
        footnote_numbering,
        toc_levels: TocLevels::new(&classification.toc_levels),
        header_footer,
    };

    log::info!(
        "parsed {}: {} styles, heading levels {:?}, {} roles, {} warnings in {:.1?}",
        path.display(),
        catalog.len(),
        meta.detected_heading_levels,
        rules.len(),
        diagnostics.warnings().len(),
        started.elapsed()
    );
    Ok(ParseResult {
        roles: rules,
        role_links,
        warnings: diagnostics.into_warnings(),
        meta,
    })
}
