mod document;
mod parts;
mod styles;

pub(crate) use document::{
    Block, Body, HeaderFooterKind, PageMargins, Paragraph, ParagraphProps, Run, TableBorders, VertAlign,
};
pub(crate) use parts::{FootnoteNumbering, HeaderFooterPart, footnote_paragraphs};
pub(crate) use styles::{ResolvedStyle, StyleCatalog, ThemeFonts};
#[cfg(test)]
pub(crate) use styles::FontSpec;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::Error;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const MATH_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
const OFFICE_NS: &str = "urn:schemas-microsoft-com:office:office";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const SETTINGS_PART: &str = "word/settings.xml";
pub(crate) const FOOTNOTES_PART: &str = "word/footnotes.xml";

fn twips_to_pts(twips: f32) -> f32 {
    twips / 20.0
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_children<'a>(
    node: roxmltree::Node<'a, 'a>,
    name: &str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    node.children().filter(move |n| is_wml(*n, name))
}

fn attr<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<&'a str> {
    node.attribute((WML_NS, name))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| attr(n, "val"))
}

/// Integer twips attribute in points. Fractional values are rejected the
/// way Word rejects them.
fn twips_attr(node: roxmltree::Node, name: &str) -> Option<f32> {
    node.attribute((WML_NS, name))
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| twips_to_pts(v as f32))
}

/// `w:b`-style toggle: present means on unless `w:val` says otherwise.
fn on_off(node: roxmltree::Node) -> bool {
    match attr(node, "val") {
        None => true,
        Some(val) => !matches!(val.to_ascii_lowercase().as_str(), "0" | "false" | "off"),
    }
}

fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

/// The XML parts of an opened template, keyed by their zip entry name.
pub(crate) struct Package {
    parts: HashMap<String, String>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Error::Unreadable(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let mut zip = zip::ZipArchive::new(file)?;

        let mut parts = HashMap::new();
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let name = entry.name().to_string();
            if !name.ends_with(".xml") && !name.ends_with(".rels") {
                continue;
            }
            let mut content = String::new();
            if entry.read_to_string(&mut content).is_err() {
                log::debug!("skipping unreadable part {name}");
                continue;
            }
            parts.insert(name, content);
        }

        for required in [DOCUMENT_PART, STYLES_PART] {
            if !parts.contains_key(required) {
                return Err(Error::InvalidPackage(format!("missing {required}")));
            }
        }
        log::debug!("opened {} with {} XML parts", path.display(), parts.len());
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&str> {
        self.parts.get(name).map(String::as_str)
    }

    pub fn document_xml(&self) -> &str {
        self.part(DOCUMENT_PART).unwrap_or_default()
    }

    pub fn styles_xml(&self) -> &str {
        self.part(STYLES_PART).unwrap_or_default()
    }

    /// The first theme part in name order, usually `word/theme/theme1.xml`.
    pub fn theme_xml(&self) -> Option<&str> {
        let mut names: Vec<&String> = self
            .parts
            .keys()
            .filter(|n| n.starts_with("word/theme/") && n.ends_with(".xml"))
            .collect();
        names.sort();
        names.first().and_then(|name| self.part(name))
    }

    /// Relationship id to part name for the main document.
    pub fn document_relationships(&self) -> Result<HashMap<String, String>, roxmltree::Error> {
        let mut targets = HashMap::new();
        let Some(xml) = self.part(DOCUMENT_RELS_PART) else {
            return Ok(targets);
        };
        let doc = roxmltree::Document::parse(xml)?;
        for rel in doc.root_element().children().filter(|n| {
            n.tag_name().name() == "Relationship" && n.tag_name().namespace() == Some(PKG_REL_NS)
        }) {
            let (Some(id), Some(target)) = (rel.attribute("Id"), rel.attribute("Target")) else {
                continue;
            };
            let target = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("word/{target}"),
            };
            targets.insert(id.to_string(), target);
        }
        Ok(targets)
    }
}
