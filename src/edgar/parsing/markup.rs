use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("valid entity regex"));

const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// Rewrites HTML named entities that XML does not predefine (`&nbsp;` etc.)
/// into numeric character references so filings parse as XML.
pub fn normalize_entities(markup: &str) -> Cow<'_, str> {
    NAMED_ENTITY.replace_all(markup, |caps: &Captures| {
        let whole = &caps[0];
        if XML_ENTITIES.contains(&&caps[1]) {
            return whole.to_string();
        }
        let decoded = decode_html_entities(whole);
        if decoded == whole {
            // Unknown entity, leave it for the parser to reject.
            return whole.to_string();
        }
        decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
    })
}

pub fn parse_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parses a filing as XML. A parse failure is logged and yields `None`.
pub fn parse_document(markup: &str) -> Option<roxmltree::Document<'_>> {
    match roxmltree::Document::parse_with_options(markup, parse_options()) {
        Ok(doc) => Some(doc),
        Err(e) => {
            log::warn!("Malformed markup, treating as empty: {}", e);
            None
        }
    }
}

pub fn is_element_named(node: &roxmltree::Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(local)
}
