//! Single pass over the paragraph stream that decides which role each
//! paragraph plays and collects per-role, per-style samples.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::config::{BoundRoleMap, Settings};
use crate::docx::{Block, Body, Paragraph, StyleCatalog, VertAlign};
use crate::headings::HeadingLevels;
use crate::model::Alignment;
use crate::patterns::{self, ObjectKind};
use crate::role::{COVER_SECTION_KEY, Role, RoleGroup, SectionPart, SpecialRole};
use crate::sample::SampleStats;
use crate::sections::{BodyRange, PositionWindow, SectionRule};

const TITLE_FONT_SIZE_PT: f32 = 16.0;
/// Paragraphs after the document title searched for its English version.
const ENGLISH_TITLE_WINDOW: usize = 6;
const ENGLISH_TITLE_MIN_LETTERS: usize = 10;

/// Where a candidate came from. Lower priority values win.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Source {
    Explicit,
    Stack,
    Outline,
    Keyword,
    Text,
    Global,
    Fallback,
}

impl Source {
    pub fn priority(self) -> u32 {
        match self {
            Source::Explicit => 0,
            Source::Stack => 1,
            Source::Outline => 2,
            Source::Keyword => 3,
            Source::Text => 4,
            Source::Global => 5,
            Source::Fallback => 99,
        }
    }
}

/// Usage of one style in one role.
#[derive(Clone, Debug)]
pub(crate) struct RoleEntry {
    pub count: usize,
    pub first_index: usize,
    pub source: Source,
    pub stats: SampleStats,
}

/// Blank top-level paragraphs around a special title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct TitleSpacing {
    pub before: usize,
    pub after: usize,
}

/// Everything the classifier observed, keyed by role then style id. Runs
/// and formula numbers may be keyed by the empty id.
#[derive(Debug, Default)]
pub(crate) struct Classification {
    pub roles: BTreeMap<Role, BTreeMap<String, RoleEntry>>,
    /// Body paragraphs seen before any heading.
    pub global_body: BTreeMap<String, RoleEntry>,
    pub toc_levels: BTreeMap<u32, BTreeSet<String>>,
    pub title_spacing: Vec<(Role, TitleSpacing)>,
}

/// Where the reader is in the paragraph stream.
#[derive(Clone, Copy, Debug)]
enum State<'a> {
    /// Before the first title. `pending` is a prominent line held as the
    /// document title until a title or the end of the stream confirms it.
    Opening { pending: Option<Context<'a>> },
    /// A cover page was recognised before the first title.
    Cover {
        title_recorded: bool,
        section: Option<ActiveSection<'a>>,
    },
    Body,
    Abstract,
    AbstractEn,
    Reference,
    Toc,
    Section(ActiveSection<'a>),
}

impl<'a> State<'a> {
    fn section(&self) -> Option<ActiveSection<'a>> {
        match *self {
            State::Section(active) | State::Cover { section: Some(active), .. } => Some(active),
            _ => None,
        }
    }

    fn before_first_title(&self) -> bool {
        matches!(self, State::Opening { .. } | State::Cover { .. })
    }
}

/// What a paragraph looks like, before the state decides what it means.
#[derive(Clone, Debug)]
enum Signal<'a> {
    Blank,
    TableCell,
    /// A picture or an equation with no text of its own.
    Object,
    TocEntry,
    CoverContent(&'a SectionRule),
    SectionContent(&'a SectionRule),
    EnglishTitle,
    DocumentTitle,
    InlineAbstract(Role),
    CoverHeading,
    SectionTitle(&'a SectionRule),
    ExplicitBody(Role),
    Title { role: Role, explicit: bool },
    KeywordLine,
    /// A note for the pending caption at this position.
    Note(usize),
    Text,
}

#[derive(Clone, Copy, Debug)]
struct ActiveSection<'a> {
    rule: &'a SectionRule,
    remaining: i64,
}

impl<'a> ActiveSection<'a> {
    fn new(rule: &'a SectionRule) -> Self {
        Self {
            rule,
            remaining: rule.body_paragraph_limit.map_or(0, i64::from),
        }
    }

    /// State after `rule` consumed one body paragraph without a title.
    fn after_first_body(rule: &'a SectionRule) -> Option<Self> {
        Self::new(rule).advance()
    }

    /// The section left after one more body paragraph.
    fn advance(mut self) -> Option<Self> {
        if self.rule.body_range == BodyRange::FixedParagraphs {
            self.remaining -= 1;
            if self.remaining <= 0 {
                return None;
            }
        }
        Some(self)
    }

    fn body_role(&self) -> Role {
        Role::section(&self.rule.key, SectionPart::Body)
    }
}

/// A paragraph together with the style it renders with.
#[derive(Clone, Copy, Debug)]
struct Context<'a> {
    /// 1-based position in the paragraph stream.
    index: usize,
    paragraph: &'a Paragraph,
    style_id: &'a str,
    style_name: Option<&'a str>,
    style_alignment: Option<Alignment>,
    style_outline: Option<u32>,
}

impl Context<'_> {
    fn outline_level(&self) -> Option<u32> {
        self.paragraph.props.outline_level.or(self.style_outline)
    }

    fn alignment(&self) -> Option<Alignment> {
        self.paragraph.props.alignment.or(self.style_alignment)
    }

    fn first_run_size(&self) -> Option<f32> {
        self.paragraph
            .runs
            .iter()
            .find(|r| !r.is_blank())
            .and_then(|r| r.size_pt)
    }

    fn looks_prominent(&self) -> bool {
        self.alignment() == Some(Alignment::Center)
            || self.first_run_size().is_some_and(|pt| pt >= TITLE_FONT_SIZE_PT)
    }
}

/// Confirmed captions keyed by paragraph position, plus which object
/// kinds the body contains at all.
#[derive(Debug, Default)]
struct Captions {
    confirmed: HashMap<usize, ObjectKind>,
    has_figures: bool,
    has_tables: bool,
}

impl Captions {
    /// A caption is confirmed when no object of its kind exists or one sits
    /// within `window` top-level blocks of it.
    fn resolve(body: &Body, window: usize) -> Self {
        let mut figures = Vec::new();
        let mut tables = Vec::new();
        let mut candidates = Vec::new();
        for (position, block) in body.blocks.iter().enumerate() {
            match *block {
                Block::Table => tables.push(position),
                Block::Paragraph(i) => {
                    let paragraph = &body.paragraphs[i];
                    if paragraph.has_drawing {
                        figures.push(position);
                    }
                    if let Some(kind) = patterns::caption_kind(paragraph.text.trim()) {
                        candidates.push((position, i, kind));
                    }
                }
            }
        }
        let mut confirmed = HashMap::new();
        for (position, paragraph, kind) in candidates {
            let objects = match kind {
                ObjectKind::Figure => &figures,
                ObjectKind::Table => &tables,
            };
            let near = objects.is_empty()
                || objects.iter().any(|obj| obj.abs_diff(position) <= window);
            if near {
                confirmed.insert(paragraph, kind);
            }
        }
        Self {
            confirmed,
            has_figures: !figures.is_empty(),
            has_tables: !tables.is_empty(),
        }
    }

    fn has_objects(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Figure => self.has_figures,
            ObjectKind::Table => self.has_tables,
        }
    }
}

pub(crate) struct Classifier<'a> {
    body: &'a Body,
    catalog: &'a StyleCatalog,
    role_map: &'a BoundRoleMap,
    settings: &'a Settings,
    headings: &'a HeadingLevels,
    window: PositionWindow,
    captions: Captions,
    out: Classification,

    state: State<'a>,
    stack: Vec<u32>,
    content_index: Option<usize>,
    /// Position of the document title while its English line may follow.
    english_title_after: Option<usize>,
    /// Captions still open for a note, with their positions.
    pending_captions: Vec<(ObjectKind, usize)>,
}

impl<'a> Classifier<'a> {
    pub fn new(
        body: &'a Body,
        catalog: &'a StyleCatalog,
        role_map: &'a BoundRoleMap,
        settings: &'a Settings,
        headings: &'a HeadingLevels,
    ) -> Self {
        Self {
            body,
            catalog,
            role_map,
            settings,
            headings,
            window: PositionWindow::new(body.content_pages()),
            captions: Captions::resolve(body, settings.caption_window),
            out: Classification::default(),
            state: State::Opening { pending: None },
            stack: Vec::new(),
            content_index: None,
            english_title_after: None,
            pending_captions: Vec::new(),
        }
    }

    pub fn run(mut self) -> Classification {
        let body = self.body;
        let catalog = self.catalog;
        for (position, paragraph) in body.paragraphs.iter().enumerate() {
            let style = catalog.paragraph_style(paragraph.style_id.as_deref());
            let ctx = Context {
                index: position + 1,
                paragraph,
                style_id: style.map_or("", |s| s.id.as_str()),
                style_name: style.and_then(|s| s.name.as_deref()),
                style_alignment: style.and_then(|s| s.props.alignment),
                style_outline: style.and_then(|s| s.props.outline_level),
            };
            self.visit(position, ctx);
            let window = self.settings.note_window;
            self.pending_captions
                .retain(|(_, at)| ctx.index - at <= window);
        }
        let state = self.state;
        self.close_opening(state);
        log::debug!(
            "classified {} paragraphs into {} roles ({} global body styles)",
            body.paragraphs.len(),
            self.out.roles.len(),
            self.out.global_body.len()
        );
        self.out
    }

    fn visit(&mut self, position: usize, ctx: Context<'a>) {
        let paragraph = ctx.paragraph;
        if !paragraph.is_blank() && !paragraph.in_table {
            self.content_index = Some(self.content_index.map_or(0, |i| i + 1));
        }
        self.annotate(&ctx);
        let signal = self.signal(position, &ctx);
        let state = self.state;
        self.state = self.step(state, signal, &ctx);
    }

    /// Roles a paragraph carries next to its main one: script runs,
    /// equations and pictures.
    fn annotate(&mut self, ctx: &Context) {
        self.record_scripts(ctx);
        let paragraph = ctx.paragraph;
        if paragraph.has_math {
            let role = if has_text_beside_formula(paragraph) {
                SpecialRole::FormulaInline
            } else {
                SpecialRole::FormulaBlock
            };
            self.record(Role::Special(role), ctx);
            if patterns::has_formula_number(&paragraph.text) {
                self.record_entry(
                    Role::Special(SpecialRole::FormulaNumber),
                    ctx,
                    Source::Stack,
                    true,
                    true,
                );
            }
        }
        if paragraph.has_drawing && !paragraph.in_table {
            self.record(Role::Special(SpecialRole::FigureBody), ctx);
        }
    }

    /// Strongest signal of a paragraph in the current state.
    fn signal(&self, position: usize, ctx: &Context<'a>) -> Signal<'a> {
        let paragraph = ctx.paragraph;
        if paragraph.has_math && !has_text_beside_formula(paragraph) {
            return Signal::Object;
        }
        if paragraph.in_table {
            return Signal::TableCell;
        }
        if paragraph.is_blank() {
            return if paragraph.has_drawing {
                Signal::Object
            } else {
                Signal::Blank
            };
        }
        if matches!(self.state, State::Toc)
            && (ctx.style_name.is_some_and(patterns::is_toc_style_name)
                || patterns::looks_like_toc_entry(&paragraph.text))
        {
            return Signal::TocEntry;
        }

        let text = paragraph.text.trim();
        let active_key = self.state.section().map(|a| a.rule.key.as_str());
        let title_rule = self.match_section_title(text, ctx.style_name);
        if title_rule.is_none()
            && let Some(rule) = self.match_section_content(text)
            && active_key != Some(rule.key.as_str())
        {
            if rule.key != COVER_SECTION_KEY {
                return Signal::SectionContent(rule);
            }
            if self.settings.cover_detection {
                return Signal::CoverContent(rule);
            }
        }

        if self
            .english_title_after
            .is_some_and(|at| ctx.index.saturating_sub(at) <= ENGLISH_TITLE_WINDOW)
            && is_english_title(ctx)
        {
            return Signal::EnglishTitle;
        }

        let role_map: &'a BoundRoleMap = self.role_map;
        let explicit = role_map.lookup(Some(ctx.style_id).filter(|id| !id.is_empty()), ctx.style_name);
        if self.state.before_first_title()
            && explicit.is_none()
            && !self.has_heading_signal(ctx)
            && is_document_title(ctx)
        {
            return Signal::DocumentTitle;
        }

        if let Some(token) = patterns::inline_abstract(&paragraph.text) {
            return Signal::InlineAbstract(patterns::inline_abstract_role(&token, &paragraph.text));
        }

        if let Some(rule) = title_rule
            && active_key != Some(rule.key.as_str())
        {
            if rule.key == COVER_SECTION_KEY && self.settings.cover_detection {
                return Signal::CoverHeading;
            }
            return Signal::SectionTitle(rule);
        }

        if let Some(role) = explicit
            && matches!(
                role.group(),
                Some(RoleGroup::Body | RoleGroup::SpecialBody | RoleGroup::Note)
            )
        {
            return Signal::ExplicitBody(role.clone());
        }
        if let Some(role) = self.title_role(position, ctx, explicit) {
            let explicit = explicit == Some(&role);
            return Signal::Title { role, explicit };
        }
        if patterns::is_keyword_line(&paragraph.text) {
            return Signal::KeywordLine;
        }
        if !self.pending_captions.is_empty()
            && patterns::is_note_paragraph(&paragraph.text, ctx.style_name)
            && let Some(chosen) = self.note_caption(ctx.index)
        {
            return Signal::Note(chosen);
        }
        Signal::Text
    }

    /// Records what `signal` means in `state` and returns the next state.
    fn step(&mut self, state: State<'a>, signal: Signal<'a>, ctx: &Context<'a>) -> State<'a> {
        match (state, signal) {
            (state, Signal::Object) => state,
            (state, Signal::TableCell) => {
                if !ctx.paragraph.is_blank() {
                    self.record(Role::Special(SpecialRole::TableBody), ctx);
                }
                state
            }

            (State::Section(active), Signal::Blank)
                if active.rule.body_range == BodyRange::UntilBlank =>
            {
                State::Body
            }
            (
                State::Cover {
                    title_recorded,
                    section: Some(active),
                },
                Signal::Blank,
            ) if active.rule.body_range == BodyRange::UntilBlank => State::Cover {
                title_recorded,
                section: None,
            },
            (State::Abstract | State::AbstractEn, Signal::Blank) => State::Body,
            (state, Signal::Blank) => state,

            (state, Signal::TocEntry) => {
                let role = match self.record_toc_level(ctx) {
                    Some(level) => Role::TocBody(level),
                    None => Role::Special(SpecialRole::TocBody),
                };
                self.record(role, ctx);
                state
            }
            (State::Toc, signal) => self.step(State::Body, signal, ctx),

            (state, Signal::CoverContent(rule)) => {
                self.record_entry(
                    Role::Special(SpecialRole::CoverInfo),
                    ctx,
                    Source::Stack,
                    true,
                    false,
                );
                self.enter_cover(state, ActiveSection::after_first_body(rule))
            }
            (state, Signal::CoverHeading) => self.enter_cover(state, None),
            (state, Signal::SectionContent(rule)) => {
                self.record(Role::section(&rule.key, SectionPart::Body), ctx);
                match ActiveSection::after_first_body(rule) {
                    Some(active) => {
                        self.close_opening(state);
                        State::Section(active)
                    }
                    None => state,
                }
            }
            (state, Signal::SectionTitle(rule)) => {
                self.close_opening(state);
                self.record(Role::section(&rule.key, SectionPart::Title), ctx);
                State::Section(ActiveSection::new(rule))
            }

            (state, Signal::EnglishTitle) => {
                self.record(Role::Special(SpecialRole::DocumentTitleEn), ctx);
                self.english_title_after = None;
                state
            }
            (State::Opening { pending: None }, Signal::DocumentTitle) => {
                self.english_title_after = Some(ctx.index);
                State::Opening { pending: Some(*ctx) }
            }
            (
                State::Cover {
                    title_recorded: false,
                    section,
                },
                Signal::DocumentTitle,
            ) => {
                self.record(Role::Special(SpecialRole::CoverTitle), ctx);
                State::Cover {
                    title_recorded: true,
                    section,
                }
            }
            // A title is already held.
            (state, Signal::DocumentTitle) => state,

            (state, Signal::InlineAbstract(title)) => {
                self.close_opening(state);
                let (body, next) = if title.is_special(SpecialRole::AbstractTitle) {
                    (SpecialRole::AbstractBody, State::Abstract)
                } else {
                    (SpecialRole::AbstractEnBody, State::AbstractEn)
                };
                self.record(title, ctx);
                self.record(Role::Special(body), ctx);
                self.stack.clear();
                next
            }

            (State::Section(active), signal) => match signal {
                Signal::Title { .. } if active.rule.body_range == BodyRange::UntilNextTitle => {
                    self.step(State::Body, signal, ctx)
                }
                _ => {
                    self.record(active.body_role(), ctx);
                    active.advance().map_or(State::Body, State::Section)
                }
            },
            (
                State::Cover {
                    title_recorded,
                    section: Some(active),
                },
                signal,
            ) => match signal {
                Signal::Title { .. } if active.rule.body_range == BodyRange::UntilNextTitle => {
                    let state = State::Cover {
                        title_recorded,
                        section: None,
                    };
                    self.step(state, signal, ctx)
                }
                _ => {
                    self.record(active.body_role(), ctx);
                    State::Cover {
                        title_recorded,
                        section: active.advance(),
                    }
                }
            },

            (state, Signal::ExplicitBody(role)) => {
                self.record_entry(role, ctx, Source::Explicit, false, false);
                state
            }
            (state, Signal::Title { role, explicit }) => {
                self.close_opening(state);
                self.record_title_spacing(&role, ctx.paragraph);
                let source = if explicit {
                    Source::Explicit
                } else {
                    Source::Stack
                };
                self.record_entry(role.clone(), ctx, source, false, false);
                self.enter(state, &role, ctx.index)
            }
            (state, Signal::KeywordLine) => {
                self.record_entry(
                    Role::Special(SpecialRole::KeywordLine),
                    ctx,
                    Source::Stack,
                    true,
                    false,
                );
                state
            }

            (State::Abstract, Signal::Note(_) | Signal::Text) => {
                self.record(Role::Special(SpecialRole::AbstractBody), ctx);
                State::Abstract
            }
            (State::AbstractEn, Signal::Note(_) | Signal::Text) => {
                self.record(Role::Special(SpecialRole::AbstractEnBody), ctx);
                State::AbstractEn
            }
            (State::Reference, Signal::Note(_) | Signal::Text) => {
                self.record(Role::Special(SpecialRole::ReferenceBody), ctx);
                State::Reference
            }
            (state, Signal::Note(chosen)) => {
                let (kind, _) = self.pending_captions.remove(chosen);
                self.record(kind.note_role(), ctx);
                state
            }
            (state, Signal::Text) => {
                match self.stack.last() {
                    Some(&level) => self.record(Role::Body(level), ctx),
                    None => self.record_global(ctx),
                }
                state
            }
        }
    }

    /// Title-like role of a paragraph, strongest signal first.
    fn title_role(&self, position: usize, ctx: &Context, explicit: Option<&Role>) -> Option<Role> {
        if let Some(role) = explicit
            && matches!(
                role.group(),
                Some(RoleGroup::Title | RoleGroup::SpecialTitle | RoleGroup::Caption)
            )
        {
            return Some(role.clone());
        }
        let cap = self.settings.max_heading_level;
        let paragraph = ctx.paragraph;

        let special = match self.captions.confirmed.get(&position) {
            Some(kind) => Some(kind.caption_role()),
            None => patterns::special_role_from_text(&paragraph.text).filter(|role| {
                !patterns::caption_kind(&paragraph.text)
                    .is_some_and(|kind| role == &kind.caption_role() && self.captions.has_objects(kind))
            }),
        };
        if special.is_some() {
            return special;
        }

        if let Some(outline) = ctx.outline_level()
            && let Some(level) = self.headings.level_for_outline(outline, cap)
        {
            return Some(Role::Title(level));
        }

        if let Some(name) = ctx.style_name {
            if let Some(role) = patterns::special_role_from_name(name) {
                return Some(role);
            }
            if let Some(level) = patterns::heading_level_from_name(name)
                && level <= cap
            {
                return Some(Role::Title(level));
            }
        }

        patterns::heading_level_from_text(&paragraph.text)
            .filter(|level| *level <= cap)
            .map(Role::Title)
    }

    fn has_heading_signal(&self, ctx: &Context) -> bool {
        let cap = self.settings.max_heading_level;
        ctx.outline_level()
            .is_some_and(|outline| self.headings.level_for_outline(outline, cap).is_some())
            || ctx.style_name.is_some_and(|n| patterns::heading_level_from_name(n).is_some())
            || patterns::heading_level_from_text(&ctx.paragraph.text).is_some()
    }

    /// State a recognised title leads to.
    fn enter(&mut self, state: State<'a>, role: &Role, index: usize) -> State<'a> {
        let next = match role {
            Role::Special(SpecialRole::AbstractTitle) => State::Abstract,
            Role::Special(SpecialRole::AbstractEnTitle) => State::AbstractEn,
            Role::Special(SpecialRole::ReferenceTitle) => State::Reference,
            Role::Special(SpecialRole::TocTitle) => State::Toc,
            Role::Title(level) => {
                while self.stack.last().is_some_and(|top| top >= level) {
                    self.stack.pop();
                }
                self.stack.push(*level);
                return State::Body;
            }
            Role::Special(kind @ (SpecialRole::FigureCaption | SpecialRole::TableCaption)) => {
                let kind = if *kind == SpecialRole::FigureCaption {
                    ObjectKind::Figure
                } else {
                    ObjectKind::Table
                };
                self.pending_captions.push((kind, index));
                return match state {
                    State::AbstractEn => State::AbstractEn,
                    _ => State::Body,
                };
            }
            _ if state.before_first_title() => return State::Body,
            _ => return state,
        };
        self.stack.clear();
        next
    }

    /// Leaving the opening confirms the held line as the document title.
    fn close_opening(&mut self, state: State<'a>) {
        if let State::Opening { pending: Some(held) } = state {
            self.record(Role::Special(SpecialRole::DocumentTitle), &held);
        }
    }

    /// State after a cover page is recognised. Only the opening turns into
    /// the cover phase, and a line held as the document title there becomes
    /// the cover title.
    fn enter_cover(&mut self, state: State<'a>, section: Option<ActiveSection<'a>>) -> State<'a> {
        match state {
            State::Opening { pending } => {
                if let Some(held) = pending {
                    self.record(Role::Special(SpecialRole::CoverTitle), &held);
                }
                self.english_title_after = None;
                State::Cover {
                    title_recorded: pending.is_some(),
                    section,
                }
            }
            State::Cover { title_recorded, .. } => State::Cover {
                title_recorded,
                section,
            },
            other => section.map_or(other, State::Section),
        }
    }

    /// Pending caption a note at `index` belongs to: the nearest one within
    /// the note window.
    fn note_caption(&self, index: usize) -> Option<usize> {
        let window = self.settings.note_window;
        self.pending_captions
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| (1..=window).contains(&(index - at)))
            .min_by_key(|(_, (_, at))| (index - at, Reverse(*at)))
            .map(|(i, _)| i)
    }

    fn match_section_title(&self, text: &str, style_name: Option<&str>) -> Option<&'a SectionRule> {
        let index = self.content_index?;
        if text.is_empty() {
            return None;
        }
        let settings: &'a Settings = self.settings;
        settings.section_rules.iter().find(|rule| {
            self.window.contains(rule.position, index) && rule.matches_title(text, style_name)
        })
    }

    fn match_section_content(&self, text: &str) -> Option<&'a SectionRule> {
        let index = self.content_index?;
        if text.is_empty() {
            return None;
        }
        let settings: &'a Settings = self.settings;
        settings.section_rules.iter().find(|rule| {
            self.window.contains(rule.position, index) && rule.matches_content(text)
        })
    }

    fn record_toc_level(&mut self, ctx: &Context) -> Option<u32> {
        let level = ctx
            .style_name
            .and_then(patterns::toc_level_from_name)
            .or_else(|| patterns::toc_level_from_text(&ctx.paragraph.text))
            .filter(|level| (1..=3).contains(level))?;
        let names = self.out.toc_levels.entry(level).or_default();
        if let Some(name) = ctx.style_name.map(str::trim).filter(|n| !n.is_empty()) {
            names.insert(name.to_string());
        }
        Some(level)
    }

    fn record_title_spacing(&mut self, role: &Role, paragraph: &Paragraph) {
        let tracked = matches!(
            role,
            Role::Special(
                SpecialRole::AbstractTitle | SpecialRole::AbstractEnTitle | SpecialRole::TocTitle
            )
        );
        if !tracked || self.out.title_spacing.iter().any(|(r, _)| r == role) {
            return;
        }
        let Some(block) = paragraph.block else {
            return;
        };
        let blocks = &self.body.blocks;
        let is_blank = |b: &&Block| matches!(b, Block::Paragraph(i) if self.body.paragraphs[*i].is_blank());
        let spacing = TitleSpacing {
            before: blocks[..block].iter().rev().take_while(is_blank).count(),
            after: blocks[block + 1..].iter().take_while(is_blank).count(),
        };
        self.out.title_spacing.push((role.clone(), spacing));
    }

    fn record(&mut self, role: Role, ctx: &Context) {
        self.record_entry(role, ctx, Source::Stack, false, false);
    }

    fn record_entry(
        &mut self,
        role: Role,
        ctx: &Context,
        source: Source,
        first_run: bool,
        allow_missing_style: bool,
    ) {
        if ctx.style_id.is_empty() && !allow_missing_style {
            return;
        }
        let entries = self.out.roles.entry(role).or_default();
        add_to_entry(entries, ctx, source, first_run);
    }

    fn record_global(&mut self, ctx: &Context) {
        if ctx.style_id.is_empty() {
            return;
        }
        add_to_entry(&mut self.out.global_body, ctx, Source::Global, false);
    }

    /// Superscript and subscript runs, one vote per run.
    fn record_scripts(&mut self, ctx: &Context) {
        for run in ctx.paragraph.runs.iter().filter(|r| !r.is_blank()) {
            let role = match run.vert_align {
                Some(VertAlign::Superscript) => SpecialRole::Superscript,
                Some(VertAlign::Subscript) => SpecialRole::Subscript,
                None => continue,
            };
            let entry = self
                .out
                .roles
                .entry(Role::Special(role))
                .or_default()
                .entry(ctx.style_id.to_string())
                .or_insert_with(|| RoleEntry {
                    count: 0,
                    first_index: ctx.index,
                    source: Source::Fallback,
                    stats: SampleStats::default(),
                });
            entry.count += 1;
            entry.first_index = entry.first_index.min(ctx.index);
            entry.stats.count += 1;
            entry.stats.add_run(run, 1.0);
        }
    }
}

fn add_to_entry(
    entries: &mut BTreeMap<String, RoleEntry>,
    ctx: &Context,
    source: Source,
    first_run: bool,
) {
    let entry = entries
        .entry(ctx.style_id.to_string())
        .or_insert_with(|| RoleEntry {
            count: 0,
            first_index: ctx.index,
            source,
            stats: SampleStats::default(),
        });
    entry.count += 1;
    entry.first_index = entry.first_index.min(ctx.index);
    if source == Source::Explicit {
        entry.source = Source::Explicit;
    }
    let stats = &mut entry.stats;
    stats.note_paragraph(ctx.paragraph, ctx.index, ctx.style_name);
    if !ctx.style_id.is_empty() {
        stats.add_paragraph_format(ctx.paragraph, ctx.style_alignment);
    }
    if first_run {
        stats.add_first_run(&ctx.paragraph.runs);
    }
    stats.add_runs(&ctx.paragraph.runs);
}

fn has_text_beside_formula(paragraph: &Paragraph) -> bool {
    !patterns::strip_formula_numbers(&paragraph.text).is_empty()
}

fn is_document_title(ctx: &Context) -> bool {
    let text = &ctx.paragraph.text;
    let excluded = patterns::is_abstract(text)
        || patterns::is_reference(text)
        || patterns::is_toc_title(text)
        || patterns::caption_kind(text).is_some()
        || patterns::is_keyword_line(text);
    !excluded && ctx.looks_prominent()
}

fn is_english_title(ctx: &Context) -> bool {
    let text = &ctx.paragraph.text;
    if patterns::is_abstract(text) || patterns::is_reference(text) || patterns::is_keyword_line(text)
    {
        return false;
    }
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    patterns::is_english_title(text.trim())
        && letters >= ENGLISH_TITLE_MIN_LETTERS
        && ctx.looks_prominent()
}
