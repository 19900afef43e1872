use serde::Serialize;

use super::{Paragraph, attr, is_wml, wml_attr, wml_children};

/// `w:footnotePr` from the settings part.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub(crate) struct FootnoteNumbering {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

impl FootnoteNumbering {
    pub fn parse(settings_xml: &str) -> Result<Option<Self>, roxmltree::Error> {
        let doc = roxmltree::Document::parse(settings_xml)?;
        let Some(footnote_pr) = doc.descendants().find(|n| is_wml(*n, "footnotePr")) else {
            return Ok(None);
        };
        Ok(Some(Self {
            format: wml_attr(footnote_pr, "numFmt").map(str::to_string),
            start: wml_attr(footnote_pr, "numStart").and_then(|v| v.trim().parse().ok()),
            restart: wml_attr(footnote_pr, "numRestart").map(str::to_string),
        }))
    }
}

/// Paragraphs of every real footnote; separator footnotes are skipped.
pub(crate) fn footnote_paragraphs(footnotes_xml: &str) -> Result<Vec<Paragraph>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(footnotes_xml)?;
    let paragraphs = wml_children(doc.root_element(), "footnote")
        .filter(|n| !matches!(attr(*n, "type"), Some("separator" | "continuationSeparator")))
        .flat_map(|footnote| wml_children(footnote, "p"))
        .map(|p| Paragraph::parse(p, false))
        .collect();
    Ok(paragraphs)
}

/// A header or footer part and its top-level paragraphs.
#[derive(Clone, Debug, Default)]
pub(crate) struct HeaderFooterPart {
    pub paragraphs: Vec<Paragraph>,
}

impl HeaderFooterPart {
    pub fn parse(xml: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        let paragraphs: Vec<Paragraph> = wml_children(root, "p")
            .map(|p| Paragraph::parse(p, false))
            .collect();
        log::debug!("{} part with {} paragraphs", root.tag_name().name(), paragraphs.len());
        Ok(Self { paragraphs })
    }

    pub fn has_content(&self) -> bool {
        self.paragraphs.iter().any(|p| !p.is_blank())
    }
}
