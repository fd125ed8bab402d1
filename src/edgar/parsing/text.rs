use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use unicode_normalization::UnicodeNormalization;

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid row selector"));
static STYLED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[style]").expect("valid style selector"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Prefix for cells whose source shows indentation.
pub const INDENT_MARKER: &str = "- ";

#[derive(Debug, Clone)]
pub struct TextGridOptions {
    /// Rows with fewer non-empty cells than this are skipped.
    pub min_non_empty_cells: usize,
}

impl Default for TextGridOptions {
    fn default() -> Self {
        Self {
            min_non_empty_cells: 1,
        }
    }
}

pub fn to_text_grid(markup: &str) -> Option<String> {
    to_text_grid_with(markup, &TextGridOptions::default())
}

/// Renders a table as a pipe-delimited grid: header, separator, body rows.
///
/// Every row is normalized to the header's column count. Returns `None`
/// when no body row survives.
pub fn to_text_grid_with(markup: &str, options: &TextGridOptions) -> Option<String> {
    let fragment = Html::parse_fragment(markup);
    let mut rows = fragment.select(&ROW).map(row_cells);

    let first = rows.next()?;
    let mut body: Vec<Vec<String>> = rows
        .filter(|row| non_empty(row) >= options.min_non_empty_cells)
        .collect();

    let headers = if non_empty(&first) > 0 {
        first
    } else {
        let width = body.iter().map(Vec::len).max().unwrap_or(0);
        (1..=width).map(|i| format!("Column {}", i)).collect()
    };

    if headers.is_empty() || body.is_empty() {
        return None;
    }

    for row in body.iter_mut() {
        row.resize(headers.len(), String::new());
    }

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!("| {} |", headers.iter().map(|_| "---").join(" | ")));
    for row in &body {
        lines.push(format!("| {} |", row.join(" | ")));
    }

    Some(lines.join("\n"))
}

/// Only the row label, the first cell, can carry the indent marker.
fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .enumerate()
        .map(|(position, cell)| {
            let text = cell_text(cell);
            if position == 0 && !text.is_empty() && is_indented(cell) {
                format!("{}{}", INDENT_MARKER, text)
            } else {
                text
            }
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let raw: String = cell.text().collect::<String>().nfkc().collect();
    WHITESPACE
        .replace_all(&raw, " ")
        .trim()
        .replace('|', "\\|")
}

fn is_indented(cell: ElementRef<'_>) -> bool {
    std::iter::once(cell)
        .chain(cell.select(&STYLED))
        .filter_map(|el| el.value().attr("style"))
        .any(|style| {
            style.split(';').any(|decl| {
                decl.split_once(':').is_some_and(|(prop, value)| {
                    left_offset(&prop.trim().to_ascii_lowercase(), value)
                        .is_some_and(is_nonzero_length)
                })
            })
        })
}

/// The part of a declaration that pushes content away from the left edge.
fn left_offset<'a>(prop: &str, value: &'a str) -> Option<&'a str> {
    match prop {
        "padding-left" | "text-indent" => Some(value.trim()),
        // CSS shorthand: the left side is the 4th value, else the 2nd, else the only one.
        "padding" => {
            let parts: Vec<&str> = value.split_whitespace().collect();
            match parts.len() {
                1 => parts.first().copied(),
                2 | 3 => parts.get(1).copied(),
                _ => parts.get(3).copied(),
            }
        }
        _ => None,
    }
}

fn is_nonzero_length(value: &str) -> bool {
    !value.starts_with('-') && value.chars().any(|c| c.is_ascii_digit() && c != '0')
}

fn non_empty(row: &[String]) -> usize {
    row.iter().filter(|cell| !cell.trim().is_empty()).count()
}
