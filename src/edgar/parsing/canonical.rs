use html_escape::{encode_double_quoted_attribute, encode_text};
use scraper::{ElementRef, Html, Node};
use serde::Serialize;

use super::locator::CandidateTable;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Raw-text containers. Their content is not entity-decoded on parse, so it
/// cannot be re-encoded stably; they carry no table data either.
const DROPPED_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "script", "style", "template", "xmp",
];

/// A table stripped down to structure plus indentation hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTable {
    pub markup: String,
}

#[derive(Debug, Clone)]
pub struct CanonicalizeOptions {
    /// Attribute names removed from every element, lowercase.
    pub strip_attributes: Vec<String>,
}

impl Default for CanonicalizeOptions {
    fn default() -> Self {
        Self {
            strip_attributes: [
                "id",
                "name",
                "contextref",
                "unitref",
                "format",
                "decimals",
                "scale",
                "continuedat",
                "escape",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl CanonicalizeOptions {
    fn strips(&self, attr: &str) -> bool {
        attr == "xmlns"
            || attr.starts_with("xmlns:")
            || self.strip_attributes.iter().any(|a| a == attr)
    }
}

pub fn canonicalize(table: &CandidateTable) -> CanonicalTable {
    canonicalize_with(table, &CanonicalizeOptions::default())
}

pub fn canonicalize_with(table: &CandidateTable, options: &CanonicalizeOptions) -> CanonicalTable {
    CanonicalTable {
        markup: canonicalize_markup(&table.markup, options),
    }
}

/// Re-serializes `markup` without bookkeeping attributes.
///
/// Returns the input unchanged when it does not parse into any element.
pub fn canonicalize_markup(markup: &str, options: &CanonicalizeOptions) -> String {
    let fragment = Html::parse_fragment(markup);
    let root = fragment.root_element();

    if !root.children().any(|c| c.value().is_element()) {
        log::warn!("Table markup did not re-parse, keeping it as-is");
        return markup.to_string();
    }

    let mut out = String::with_capacity(markup.len());
    write_children(root, options, &mut out);
    out
}

fn write_children(parent: ElementRef<'_>, options: &CanonicalizeOptions, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&encode_text(&**text)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, options, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, options: &CanonicalizeOptions, out: &mut String) {
    let name = element.value().name();
    if DROPPED_ELEMENTS.contains(&name) {
        return;
    }

    let mut attrs: Vec<(String, String)> = element
        .value()
        .attrs()
        .filter(|(key, _)| !options.strips(key))
        .filter_map(|(key, value)| {
            if key == "style" {
                indentation_style(value).map(|style| (key.to_string(), style))
            } else {
                Some((key.to_string(), value.to_string()))
            }
        })
        .collect();
    attrs.sort();

    out.push('<');
    out.push_str(name);
    for (key, value) in &attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(element, options, out);

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Keeps only padding and text-indent declarations, normalized as
/// `prop:value;`. `None` when nothing survives.
pub fn indentation_style(style: &str) -> Option<String> {
    let kept: String = style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() || !is_indentation_property(&prop) {
                return None;
            }
            Some(format!("{}:{};", prop, value))
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

fn is_indentation_property(prop: &str) -> bool {
    prop.starts_with("padding") || prop == "text-indent"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(markup: &str) -> String {
        canonicalize_markup(markup, &CanonicalizeOptions::default())
    }

    const TABLE: &str = r#"<table id="t1" style="border-collapse:collapse;width:100%">
<tr id="r1"><td style="padding-left:12pt;font-family:Arial;font-size:10pt">Product A</td>
<td style="text-align:right"><ix:nonFraction contextRef="c-1" name="us-gaap:Revenues" unitRef="usd" decimals="-6" scale="6" format="ixt:num-dot-decimal" id="f-1">100</ix:nonFraction></td></tr>
<!-- generated -->
<tr><td colspan="2" style="font-weight:bold;padding:0 0 0 24pt">Total&#160;&amp; more</td></tr>
</table>"#;

    #[test]
    fn test_strips_bookkeeping_attributes() {
        let out = canon(TABLE);
        assert!(!out.contains("id="));
        assert!(!out.contains("contextref"));
        assert!(!out.contains("unitref"));
        assert!(!out.contains("decimals"));
        assert!(!out.contains("format="));
        assert!(!out.contains("name="));
        assert!(!out.contains("generated"));
        assert!(out.contains("<ix:nonfraction>100</ix:nonfraction>"));
        assert!(out.contains(r#"colspan="2""#));
    }

    #[test]
    fn test_keeps_only_indentation_styles() {
        let out = canon(TABLE);
        assert!(out.contains(r#"<td style="padding-left:12pt;">Product A</td>"#));
        assert!(out.contains(r#"style="padding:0 0 0 24pt;""#));
        assert!(!out.contains("font-family"));
        assert!(!out.contains("text-align"));
        assert!(out.starts_with("<table>"));
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canon(TABLE);
        let twice = canon(&once);
        assert_eq!(once, twice);

        let odd = "<table><tr><td>a < b &amp; c<br/>d</td></tr></table>";
        let once = canon(odd);
        assert_eq!(canon(&once), once);
    }

    #[test]
    fn test_raw_text_elements_are_dropped() {
        let markup = "<table><tr><td><style>td > span { color: red }</style>A &amp; B\
            <script>if (a < b) {}</script></td></tr></table>";
        let once = canon(markup);
        assert!(once.contains("<td>A &amp; B</td>"));
        assert!(!once.contains("style"));
        assert!(!once.contains("script"));
        assert_eq!(canon(&once), once);
    }

    #[test]
    fn test_unparseable_markup_is_returned_unchanged() {
        assert_eq!(canon("just text"), "just text");
        assert_eq!(canon(""), "");
    }

    #[test]
    fn test_indentation_style() {
        assert_eq!(
            indentation_style("PADDING-LEFT: 9pt ; color:red; text-indent:-9pt"),
            Some("padding-left:9pt;text-indent:-9pt;".to_string())
        );
        assert_eq!(indentation_style("color:red"), None);
        assert_eq!(indentation_style("padding-left:"), None);
    }
}
