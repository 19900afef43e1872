use serde::Serialize;

use super::{
    MATH_NS, OFFICE_NS, REL_NS, WML_NS, attr, is_wml, on_off, twips_attr, wml, wml_attr,
    wml_children,
};
use crate::error::Error;
use crate::model::Alignment;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VertAlign {
    Superscript,
    Subscript,
}

/// Direct run formatting plus the run's text.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Run {
    pub text: String,
    pub ascii: Option<String>,
    pub h_ansi: Option<String>,
    pub east_asia: Option<String>,
    pub size_pt: Option<f32>,
    pub bold: Option<bool>,
    pub vert_align: Option<VertAlign>,
    pub style_id: Option<String>,
    pub footnote_ref: bool,
}

impl Run {
    fn parse(node: roxmltree::Node) -> Self {
        let mut run = Run::default();
        for child in node.children().filter(|n| n.tag_name().namespace() == Some(WML_NS)) {
            match child.tag_name().name() {
                "t" => run.text.push_str(child.text().unwrap_or_default()),
                "tab" | "ptab" => run.text.push('\t'),
                "br" if attr(child, "type") != Some("page") => run.text.push('\n'),
                "cr" => run.text.push('\n'),
                "noBreakHyphen" => run.text.push('-'),
                "footnoteRef" | "footnoteReference" => run.footnote_ref = true,
                _ => {}
            }
        }
        let Some(rpr) = wml(node, "rPr") else {
            return run;
        };
        if let Some(rfonts) = wml(rpr, "rFonts") {
            let get = |name| attr(rfonts, name).map(str::to_string);
            run.ascii = get("ascii");
            run.h_ansi = get("hAnsi");
            run.east_asia = get("eastAsia");
        }
        run.size_pt = wml_attr(rpr, "sz")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|hp| hp as f32 / 2.0);
        run.bold = wml(rpr, "b").map(on_off);
        run.vert_align = match wml_attr(rpr, "vertAlign") {
            Some("superscript") => Some(VertAlign::Superscript),
            Some("subscript") => Some(VertAlign::Subscript),
            _ => None,
        };
        run.style_id = wml_attr(rpr, "rStyle")
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        run
    }

    pub fn preferred_font(&self) -> Option<&str> {
        self.east_asia
            .as_deref()
            .or(self.h_ansi.as_deref())
            .or(self.ascii.as_deref())
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Formatting set directly in a paragraph's `w:pPr`.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ParagraphProps {
    pub alignment: Option<Alignment>,
    pub line_twips: Option<i64>,
    pub line_rule: Option<String>,
    pub space_before_pt: Option<f32>,
    pub space_after_pt: Option<f32>,
    pub before_lines: Option<f32>,
    pub after_lines: Option<f32>,
    pub indent_left_pt: Option<f32>,
    pub indent_right_pt: Option<f32>,
    /// Signed: a hanging indent is stored as a negative first line.
    pub first_line_pt: Option<f32>,
    pub outline_level: Option<u32>,
}

fn hundredths(node: roxmltree::Node, name: &str) -> Option<f32> {
    attr(node, name)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .map(|v| v / 100.0)
}

impl ParagraphProps {
    fn parse(ppr: roxmltree::Node) -> Self {
        let mut props = ParagraphProps {
            alignment: wml_attr(ppr, "jc").map(Alignment::from_jc),
            outline_level: wml_attr(ppr, "outlineLvl")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|level| *level < 9),
            ..ParagraphProps::default()
        };
        if let Some(spacing) = wml(ppr, "spacing") {
            props.line_twips = attr(spacing, "line").and_then(|v| v.trim().parse().ok());
            props.line_rule = attr(spacing, "lineRule").map(str::to_string);
            props.space_before_pt = twips_attr(spacing, "before");
            props.space_after_pt = twips_attr(spacing, "after");
            props.before_lines = hundredths(spacing, "beforeLines");
            props.after_lines = hundredths(spacing, "afterLines");
        }
        if let Some(ind) = wml(ppr, "ind") {
            props.indent_left_pt = twips_attr(ind, "left").or_else(|| twips_attr(ind, "start"));
            props.indent_right_pt = twips_attr(ind, "right").or_else(|| twips_attr(ind, "end"));
            props.first_line_pt = match twips_attr(ind, "hanging") {
                Some(hanging) => Some(-hanging),
                None => twips_attr(ind, "firstLine"),
            };
        }
        props
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Paragraph {
    /// Raw `w:pStyle` value, which may name an unknown style.
    pub style_id: Option<String>,
    pub props: ParagraphProps,
    pub runs: Vec<Run>,
    pub text: String,
    pub has_drawing: bool,
    pub has_math: bool,
    pub page_break: bool,
    pub in_table: bool,
    /// Index into [`Body::blocks`] for top-level paragraphs.
    pub block: Option<usize>,
}

fn has_math_object(node: roxmltree::Node) -> bool {
    node.descendants().any(|n| {
        let tag = n.tag_name();
        match (tag.namespace(), tag.name()) {
            (Some(MATH_NS), "oMath" | "oMathPara") => true,
            (Some(OFFICE_NS), "OLEObject") => n
                .attribute("ProgID")
                .or_else(|| n.attribute("progId"))
                .is_some_and(|id| id.contains("Equation") || id.contains("MathType")),
            _ => false,
        }
    })
}

fn has_page_break(node: roxmltree::Node) -> bool {
    node.descendants().any(|n| {
        is_wml(n, "lastRenderedPageBreak") || (is_wml(n, "br") && attr(n, "type") == Some("page"))
    })
}

impl Paragraph {
    pub(crate) fn parse(node: roxmltree::Node, in_table: bool) -> Self {
        let ppr = wml(node, "pPr");
        let runs: Vec<Run> = node
            .children()
            .flat_map(|child| {
                if is_wml(child, "hyperlink") {
                    wml_children(child, "r").collect::<Vec<_>>()
                } else if is_wml(child, "r") {
                    vec![child]
                } else {
                    Vec::new()
                }
            })
            .map(Run::parse)
            .collect();
        let text = runs.iter().map(|r| r.text.as_str()).collect();
        Paragraph {
            style_id: ppr
                .and_then(|p| wml_attr(p, "pStyle"))
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            props: ppr.map(ParagraphProps::parse).unwrap_or_default(),
            runs,
            text,
            has_drawing: node
                .descendants()
                .any(|n| matches!(n.tag_name().name(), "drawing" | "pict")),
            has_math: has_math_object(node),
            page_break: has_page_break(node),
            in_table,
            block: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Border flags of a table (or table style). An edge counts when its
/// element is present and its value is not `nil`/`none`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct TableBorders {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
    #[serde(rename = "insideH")]
    pub inside_h: bool,
    #[serde(rename = "insideV")]
    pub inside_v: bool,
}

impl TableBorders {
    /// Reads `w:tblBorders` from a `w:tblPr`; `None` when it is absent.
    pub fn parse(tbl_pr: roxmltree::Node) -> Option<Self> {
        let borders = wml(tbl_pr, "tblBorders")?;
        let edge = |name| {
            wml(borders, name)
                .is_some_and(|n| !matches!(attr(n, "val"), Some("nil" | "none")))
        };
        Some(Self {
            top: edge("top"),
            bottom: edge("bottom"),
            left: edge("left"),
            right: edge("right"),
            inside_h: edge("insideH"),
            inside_v: edge("insideV"),
        })
    }

    pub fn any(&self) -> bool {
        self.top || self.bottom || self.left || self.right || self.inside_h || self.inside_v
    }

    pub fn pattern(&self) -> &'static str {
        let outer = [self.top, self.bottom, self.left, self.right];
        let inner = [self.inside_h, self.inside_v];
        let outer_any = outer.iter().any(|b| *b);
        let inner_any = inner.iter().any(|b| *b);
        let outer_all = outer.iter().all(|b| *b);
        let inner_all = inner.iter().all(|b| *b);
        match (outer_any, inner_any) {
            (false, false) => "none",
            _ if outer_all && inner_all => "grid",
            _ if outer_all && !inner_any => "outer_only",
            _ if inner_all && !outer_any => "inner_only",
            _ => "mixed",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TableInfo {
    pub style_id: Option<String>,
    pub borders: Option<TableBorders>,
}

/// Page margins in points; only the edges the section sets.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub(crate) struct PageMargins {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gutter: Option<f32>,
}

impl PageMargins {
    fn parse(sect_pr: roxmltree::Node) -> Self {
        let Some(pg_mar) = wml(sect_pr, "pgMar") else {
            return Self::default();
        };
        Self {
            top: twips_attr(pg_mar, "top"),
            bottom: twips_attr(pg_mar, "bottom"),
            left: twips_attr(pg_mar, "left"),
            right: twips_attr(pg_mar, "right"),
            header: twips_attr(pg_mar, "header"),
            footer: twips_attr(pg_mar, "footer"),
            gutter: twips_attr(pg_mar, "gutter"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum HeaderFooterKind {
    Header,
    Footer,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct HeaderFooterRef {
    pub kind: HeaderFooterKind,
    /// `default`, `first` or `even`.
    pub variant: String,
    pub rel_id: String,
}

/// One `w:sectPr` and the paragraphs it closes. Paragraph numbers count
/// every `w:p` in the body from 1, nested ones included.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SectionProps {
    pub start: usize,
    pub end: usize,
    pub margins: PageMargins,
    pub references: Vec<HeaderFooterRef>,
    /// The body-level `w:sectPr` closing the document.
    pub is_final: bool,
}

impl SectionProps {
    fn parse(sect_pr: roxmltree::Node, start: usize, end: usize, is_final: bool) -> Self {
        let references = sect_pr
            .children()
            .filter_map(|n| {
                let kind = if is_wml(n, "headerReference") {
                    HeaderFooterKind::Header
                } else if is_wml(n, "footerReference") {
                    HeaderFooterKind::Footer
                } else {
                    return None;
                };
                let rel_id = n.attribute((REL_NS, "id"))?;
                Some(HeaderFooterRef {
                    kind,
                    variant: attr(n, "type").unwrap_or("default").to_string(),
                    rel_id: rel_id.to_string(),
                })
            })
            .collect();
        Self {
            start,
            end,
            margins: PageMargins::parse(sect_pr),
            references,
            is_final,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Block {
    Paragraph(usize),
    Table,
}

/// The parsed main document body.
#[derive(Debug, Default)]
pub(crate) struct Body {
    /// Top-level paragraphs in order, then table cell paragraphs table by
    /// table, depth first.
    pub paragraphs: Vec<Paragraph>,
    /// Top-level blocks; content controls are flattened into their parent.
    pub blocks: Vec<Block>,
    /// Every table, nested ones included, in document order.
    pub tables: Vec<TableInfo>,
    pub sections: Vec<SectionProps>,
    /// Trimmed text of every non-empty `w:p`, keyed by its section
    /// paragraph number.
    pub numbered_texts: Vec<(usize, String)>,
}

impl Body {
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let doc = roxmltree::Document::parse(xml)?;
        let body = wml(doc.root_element(), "body")
            .ok_or_else(|| Error::InvalidPackage("missing w:body".into()))?;

        let mut parsed = Body::default();
        let mut top_tables = Vec::new();
        parsed.collect_blocks(body, &mut top_tables);
        for table in top_tables {
            parsed.collect_table(table);
        }

        parsed.tables = body
            .descendants()
            .filter(|n| is_wml(*n, "tbl"))
            .map(|tbl| {
                let tbl_pr = wml(tbl, "tblPr");
                TableInfo {
                    style_id: tbl_pr
                        .and_then(|p| wml_attr(p, "tblStyle"))
                        .filter(|v| !v.is_empty())
                        .map(str::to_string),
                    borders: tbl_pr.and_then(TableBorders::parse),
                }
            })
            .collect();

        parsed.collect_sections(body);
        log::debug!(
            "body: {} paragraphs, {} blocks, {} tables, {} sections",
            parsed.paragraphs.len(),
            parsed.blocks.len(),
            parsed.tables.len(),
            parsed.sections.len()
        );
        Ok(parsed)
    }

    fn collect_blocks<'a>(
        &mut self,
        parent: roxmltree::Node<'a, 'a>,
        tables: &mut Vec<roxmltree::Node<'a, 'a>>,
    ) {
        for child in parent.children() {
            if is_wml(child, "p") {
                let mut paragraph = Paragraph::parse(child, false);
                paragraph.block = Some(self.blocks.len());
                self.blocks.push(Block::Paragraph(self.paragraphs.len()));
                self.paragraphs.push(paragraph);
            } else if is_wml(child, "tbl") {
                self.blocks.push(Block::Table);
                tables.push(child);
            } else if is_wml(child, "sdt")
                && let Some(content) = wml(child, "sdtContent")
            {
                self.collect_blocks(content, tables);
            }
        }
    }

    fn collect_table(&mut self, table: roxmltree::Node) {
        for cell in wml_children(table, "tr").flat_map(|row| wml_children(row, "tc")) {
            for paragraph in wml_children(cell, "p") {
                self.paragraphs.push(Paragraph::parse(paragraph, true));
            }
            for nested in wml_children(cell, "tbl") {
                self.collect_table(nested);
            }
        }
    }

    fn collect_sections(&mut self, body: roxmltree::Node) {
        let mut start = 1;
        let mut number = 0;
        for paragraph in body.descendants().filter(|n| is_wml(*n, "p")) {
            number += 1;
            let text: String = paragraph
                .descendants()
                .filter(|n| is_wml(*n, "t"))
                .filter_map(|n| n.text())
                .collect();
            let text = text.trim();
            if !text.is_empty() {
                self.numbered_texts.push((number, text.to_string()));
            }
            if let Some(sect_pr) = wml(paragraph, "pPr").and_then(|p| wml(p, "sectPr")) {
                self.sections.push(SectionProps::parse(sect_pr, start, number, false));
                start = number + 1;
            }
        }
        if let Some(sect_pr) = wml(body, "sectPr") {
            self.sections.push(SectionProps::parse(sect_pr, start, number, true));
        }
    }

    /// Page number of every content paragraph (non-blank, outside tables),
    /// counting a page break after the paragraph that carries it.
    pub fn content_pages(&self) -> Vec<u32> {
        let mut page = 1;
        let mut pages = Vec::new();
        for paragraph in &self.paragraphs {
            if !paragraph.is_blank() && !paragraph.in_table {
                pages.push(page);
            }
            if paragraph.page_break {
                page += 1;
            }
        }
        pages
    }

    /// Sections that cover at least one paragraph.
    pub fn margin_sections(&self) -> impl Iterator<Item = &SectionProps> {
        self.sections.iter().filter(|s| !s.is_final || s.start <= s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(inner: &str) -> Body {
        let xml = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
                xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"
                xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{inner}</w:body></w:document>"#
        );
        Body::parse(&xml).unwrap()
    }

    #[test]
    fn table_paragraphs_follow_top_level_ones() {
        let body = body(
            r#"<w:p><w:r><w:t>one</w:t></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p>
                 <w:tbl><w:tr><w:tc><w:p><w:r><w:t>nested</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
               </w:tc></w:tr></w:tbl>
               <w:sdt><w:sdtContent><w:p><w:r><w:t>two</w:t></w:r></w:p></w:sdtContent></w:sdt>"#,
        );
        let texts: Vec<_> = body.paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "cell", "nested"]);
        assert_eq!(body.blocks, [Block::Paragraph(0), Block::Table, Block::Paragraph(1)]);
        assert_eq!(body.paragraphs[1].block, Some(2));
        assert!(body.paragraphs[3].in_table);
        assert_eq!(body.tables.len(), 2);
    }

    #[test]
    fn run_text_and_direct_formatting() {
        let body = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Body"/><w:ind w:hanging="420"/>
                 <w:spacing w:beforeLines="50" w:before="156" w:line="360"/></w:pPr>
               <w:r><w:rPr><w:rFonts w:ascii="Times" w:eastAsia="宋体"/><w:sz w:val="24"/><w:b w:val="0"/></w:rPr>
                 <w:t>a</w:t><w:tab/><w:t>b</w:t></w:r>
               <w:hyperlink><w:r><w:rPr><w:vertAlign w:val="superscript"/></w:rPr><w:t>[1]</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let p = &body.paragraphs[0];
        assert_eq!(p.text, "a\tb[1]");
        assert_eq!(p.style_id.as_deref(), Some("Body"));
        assert_eq!(p.props.first_line_pt, Some(-21.0));
        assert_eq!(p.props.before_lines, Some(0.5));
        assert_eq!(p.props.space_before_pt, Some(7.8));
        assert_eq!(p.props.line_rule, None);
        assert_eq!(p.runs[0].preferred_font(), Some("宋体"));
        assert_eq!(p.runs[0].size_pt, Some(12.0));
        assert_eq!(p.runs[0].bold, Some(false));
        assert_eq!(p.runs[1].vert_align, Some(VertAlign::Superscript));
    }

    #[test]
    fn math_and_page_breaks() {
        let body = body(
            r#"<w:p><m:oMath/><w:r><w:br w:type="page"/></w:r></w:p><w:p><w:r><w:t>x</w:t></w:r></w:p>"#,
        );
        assert!(body.paragraphs[0].has_math);
        assert!(body.paragraphs[0].page_break);
        assert_eq!(body.content_pages(), vec![2]);
    }

    #[test]
    fn sections_split_on_paragraph_sect_pr() {
        let body = body(
            r#"<w:p><w:r><w:t>cover</w:t></w:r></w:p>
               <w:p><w:pPr><w:sectPr><w:pgMar w:top="1440" w:left="1800"/>
                 <w:headerReference w:type="first" r:id="rId7"/></w:sectPr></w:pPr></w:p>
               <w:p><w:r><w:t>main</w:t></w:r></w:p>
               <w:sectPr><w:pgMar w:top="1440"/></w:sectPr>"#,
        );
        assert_eq!(body.sections.len(), 2);
        assert_eq!((body.sections[0].start, body.sections[0].end), (1, 2));
        assert_eq!(body.sections[0].margins.left, Some(90.0));
        assert_eq!(body.sections[0].references[0].variant, "first");
        assert_eq!((body.sections[1].start, body.sections[1].end), (3, 3));
        assert_eq!(body.numbered_texts, vec![(1, "cover".into()), (3, "main".into())]);
    }

    #[test]
    fn border_patterns() {
        let all = TableBorders {
            top: true,
            bottom: true,
            left: true,
            right: true,
            inside_h: true,
            inside_v: true,
        };
        assert_eq!(all.pattern(), "grid");
        let outer = TableBorders { inside_h: false, inside_v: false, ..all };
        assert_eq!(outer.pattern(), "outer_only");
        let inner = TableBorders { inside_h: true, inside_v: true, ..TableBorders::default() };
        assert_eq!(inner.pattern(), "inner_only");
        assert_eq!(TableBorders::default().pattern(), "none");
        assert_eq!(TableBorders { top: true, ..TableBorders::default() }.pattern(), "mixed");
    }
}
