use std::ops::Range;
use strum::{EnumIter, IntoEnumIterator};

use super::markup::is_element_named;
use super::tags::SemanticTag;

/// Inline XBRL fact element kinds that can anchor a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum FactKind {
    NonNumeric,
    Numeric,
    NonFraction,
    Fraction,
}

impl FactKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            FactKind::NonNumeric => "nonNumeric",
            FactKind::Numeric => "numeric",
            FactKind::NonFraction => "nonFraction",
            FactKind::Fraction => "fraction",
        }
    }

    /// Matches on the local element name only, ignoring case.
    pub fn from_element_name(local: &str) -> Option<Self> {
        FactKind::iter().find(|kind| kind.element_name().eq_ignore_ascii_case(local))
    }
}

/// One tagged fact and where its nearest table sits in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedFact {
    pub tag: SemanticTag,
    pub kind: FactKind,
    /// Byte range of the nearest enclosing `<table>` element.
    pub table: Option<Range<usize>>,
}

/// Walks the document in order and returns every recognized fact in the
/// `prefix` namespace.
pub fn extract_facts(doc: &roxmltree::Document, prefix: &str) -> Vec<TaggedFact> {
    let mut facts = Vec::new();

    for node in doc.descendants().filter(|n| n.is_element()) {
        let Some(kind) = FactKind::from_element_name(node.tag_name().name()) else {
            continue;
        };
        let Some(tag) = node.attribute("name").and_then(SemanticTag::parse) else {
            continue;
        };
        if tag.prefix != prefix {
            continue;
        }

        let table = node
            .ancestors()
            .skip(1)
            .find(|a| is_element_named(a, "table"))
            .map(|t| t.range());

        log::debug!("Fact: {} {:?} in_table={}", tag, kind, table.is_some());

        facts.push(TaggedFact { tag, kind, table });
    }

    facts
}
