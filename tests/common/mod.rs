#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const HEADER_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const FOOTER_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";

pub const DEFAULT_SECT_PR: &str = r#"<w:sectPr><w:pgMar w:top="1440" w:bottom="1440" w:left="1800" w:right="1800" w:header="851" w:footer="992" w:gutter="0"/></w:sectPr>"#;

pub const DOC_DEFAULTS: &str = r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman" w:eastAsia="宋体"/><w:sz w:val="24"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr/></w:pPrDefault></w:docDefaults>"#;

pub fn paragraph_style(id: &str, name: &str, inner: &str) -> String {
    format!(r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{name}"/>{inner}</w:style>"#)
}

pub fn default_paragraph_style(id: &str, name: &str, inner: &str) -> String {
    format!(
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="{id}"><w:name w:val="{name}"/>{inner}</w:style>"#
    )
}

pub fn character_style(id: &str, name: &str, inner: &str) -> String {
    format!(r#"<w:style w:type="character" w:styleId="{id}"><w:name w:val="{name}"/>{inner}</w:style>"#)
}

pub fn table_style(id: &str, name: &str, borders: &str) -> String {
    format!(
        r#"<w:style w:type="table" w:styleId="{id}"><w:name w:val="{name}"/><w:tblPr>{borders}</w:tblPr></w:style>"#
    )
}

/// `w:tblBorders` with a single line on each named edge.
pub fn borders(edges: &[&str]) -> String {
    let edges: String = edges
        .iter()
        .map(|edge| format!(r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#))
        .collect();
    format!("<w:tblBorders>{edges}</w:tblBorders>")
}

pub fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

/// A paragraph with one run; an empty `style` leaves out `w:pStyle`.
pub fn para(style: &str, text: &str) -> String {
    if style.is_empty() {
        return format!("<w:p>{}</w:p>", run(text));
    }
    format!(r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr>{}</w:p>"#, run(text))
}

pub fn blank() -> String {
    "<w:p/>".to_string()
}

pub fn table(style: Option<&str>, borders: Option<&str>, text: &str) -> String {
    let style = style
        .map(|id| format!(r#"<w:tblStyle w:val="{id}"/>"#))
        .unwrap_or_default();
    let borders = borders.unwrap_or_default();
    format!(
        r#"<w:tbl><w:tblPr>{style}{borders}</w:tblPr><w:tr><w:tc><w:p>{}</w:p></w:tc></w:tr></w:tbl>"#,
        run(text)
    )
}

/// Normal (justified, 1.5 lines), a centred bold 16pt Heading 1 and a
/// left bold 14pt Heading 2.
pub fn standard_styles() -> Vec<String> {
    vec![
        default_paragraph_style(
            "Normal",
            "Normal",
            r#"<w:pPr><w:jc w:val="both"/><w:spacing w:line="360" w:lineRule="auto"/></w:pPr>"#,
        ),
        paragraph_style(
            "Heading1",
            "heading 1",
            r#"<w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="0"/><w:jc w:val="center"/><w:spacing w:before="240" w:after="240"/></w:pPr><w:rPr><w:rFonts w:eastAsia="黑体"/><w:b/><w:sz w:val="32"/></w:rPr>"#,
        ),
        paragraph_style(
            "Heading2",
            "heading 2",
            r#"<w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="1"/><w:jc w:val="left"/></w:pPr><w:rPr><w:rFonts w:eastAsia="黑体"/><w:b/><w:sz w:val="28"/></w:rPr>"#,
        ),
    ]
}

/// Builds a minimal DOCX package on disk.
#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    doc_defaults: String,
    styles: Vec<String>,
    body: Vec<String>,
    sect_pr: String,
    parts: Vec<(String, String)>,
    relationships: Vec<(String, String, String)>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self {
            doc_defaults: DOC_DEFAULTS.to_string(),
            styles: Vec::new(),
            body: Vec::new(),
            sect_pr: DEFAULT_SECT_PR.to_string(),
            parts: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn standard() -> Self {
        let mut builder = Self::new();
        builder.styles = standard_styles();
        builder
    }

    pub fn style(mut self, xml: impl Into<String>) -> Self {
        self.styles.push(xml.into());
        self
    }

    pub fn para(mut self, style: &str, text: &str) -> Self {
        self.body.push(para(style, text));
        self
    }

    pub fn blank(mut self) -> Self {
        self.body.push(blank());
        self
    }

    pub fn raw(mut self, xml: impl Into<String>) -> Self {
        self.body.push(xml.into());
        self
    }

    pub fn sect_pr(mut self, xml: impl Into<String>) -> Self {
        self.sect_pr = xml.into();
        self
    }

    pub fn part(mut self, name: &str, xml: impl Into<String>) -> Self {
        self.parts.push((name.to_string(), xml.into()));
        self
    }

    /// Adds a header part under `word/` and its relationship.
    pub fn header(mut self, rel_id: &str, file: &str, paragraphs: &str) -> Self {
        let xml = format!(r#"<w:hdr xmlns:w="{W_NS}" xmlns:r="{R_NS}">{paragraphs}</w:hdr>"#);
        self.parts.push((format!("word/{file}"), xml));
        self.relationships
            .push((rel_id.to_string(), HEADER_REL.to_string(), file.to_string()));
        self
    }

    pub fn footer(mut self, rel_id: &str, file: &str, paragraphs: &str) -> Self {
        let xml = format!(r#"<w:ftr xmlns:w="{W_NS}" xmlns:r="{R_NS}">{paragraphs}</w:ftr>"#);
        self.parts.push((format!("word/{file}"), xml));
        self.relationships
            .push((rel_id.to_string(), FOOTER_REL.to_string(), file.to_string()));
        self
    }

    pub fn settings(self, inner: &str) -> Self {
        let xml = format!(r#"<w:settings xmlns:w="{W_NS}">{inner}</w:settings>"#);
        self.part("word/settings.xml", xml)
    }

    pub fn footnotes(self, inner: &str) -> Self {
        let xml = format!(r#"<w:footnotes xmlns:w="{W_NS}" xmlns:r="{R_NS}">{inner}</w:footnotes>"#);
        self.part("word/footnotes.xml", xml)
    }

    pub fn styles_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}">{}{}</w:styles>"#,
            self.doc_defaults,
            self.styles.concat()
        )
    }

    pub fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{}{}</w:body></w:document>"#,
            self.body.concat(),
            self.sect_pr
        )
    }

    fn relationships_xml(&self) -> String {
        let rels: String = self
            .relationships
            .iter()
            .map(|(id, kind, target)| format!(r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#))
            .collect();
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#)
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let mut parts = vec![
            ("[Content_Types].xml".to_string(), CONTENT_TYPES.to_string()),
            ("word/document.xml".to_string(), self.document_xml()),
            ("word/styles.xml".to_string(), self.styles_xml()),
        ];
        if !self.relationships.is_empty() {
            parts.push(("word/_rels/document.xml.rels".to_string(), self.relationships_xml()));
        }
        parts.extend(self.parts.iter().cloned());
        write_zip(dir, name, &parts)
    }
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

pub fn write_zip(dir: &Path, name: &str, parts: &[(String, String)]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (part, content) in parts {
        zip.start_file(part.as_str(), options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}
