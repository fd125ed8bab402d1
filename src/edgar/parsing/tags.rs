use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::markup::{is_element_named, normalize_entities, parse_document};

/// A namespaced taxonomy concept such as `us-gaap:Revenues`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemanticTag {
    pub prefix: String,
    pub local: String,
}

impl SemanticTag {
    pub fn new(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            local: local.into(),
        }
    }

    /// Splits `prefix:Local`; both halves must be non-empty.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (prefix, local) = qualified.trim().split_once(':')?;
        if prefix.is_empty() || local.is_empty() {
            return None;
        }
        Some(Self::new(prefix, local))
    }

    pub fn qualified(&self) -> String {
        format!("{}:{}", self.prefix, self.local)
    }
}

impl fmt::Display for SemanticTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}

/// Collects every distinct tag in the `prefix` namespace.
///
/// Tags come from `name` attributes on any element and from `measure`
/// elements whose text references a concept. Malformed markup yields an
/// empty set.
pub fn build_tag_index(markup: &str, prefix: &str) -> BTreeSet<SemanticTag> {
    let markup = normalize_entities(markup);
    match parse_document(&markup) {
        Some(doc) => tag_index_from(&doc, prefix),
        None => BTreeSet::new(),
    }
}

pub(crate) fn tag_index_from(doc: &roxmltree::Document, prefix: &str) -> BTreeSet<SemanticTag> {
    let mut tags = BTreeSet::new();

    for node in doc.descendants().filter(|n| n.is_element()) {
        if let Some(tag) = node.attribute("name").and_then(SemanticTag::parse) {
            if tag.prefix == prefix {
                tags.insert(tag);
            }
        }

        if is_element_named(&node, "measure") {
            if let Some(tag) = node.text().and_then(SemanticTag::parse) {
                if tag.prefix == prefix {
                    tags.insert(tag);
                }
            }
        }
    }

    log::debug!("Indexed {} distinct {} tags", tags.len(), prefix);
    tags
}

/// Keeps tags whose local name starts with any keyword, ignoring ASCII case.
pub fn filter_tags<'a, I>(tags: I, keywords: &[String]) -> BTreeSet<SemanticTag>
where
    I: IntoIterator<Item = &'a SemanticTag>,
{
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    tags.into_iter()
        .filter(|tag| {
            let local = tag.local.to_lowercase();
            keywords.iter().any(|k| local.starts_with(k.as_str()))
        })
        .cloned()
        .collect()
}
