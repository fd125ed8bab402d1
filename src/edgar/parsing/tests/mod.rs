use std::fs;
use std::path::PathBuf;

pub fn get_test_file_path(filename: &str) -> PathBuf {
    PathBuf::from("src/edgar/parsing/tests/data").join(filename)
}

pub fn read_test_file(filename: &str) -> String {
    fs::read_to_string(get_test_file_path(filename))
        .unwrap_or_else(|e| panic!("Failed to read test file {}: {}", filename, e))
}

#[test]
fn test_sample_filing_locates_revenue_tables() {
    use super::{canonicalize, locate_candidate_tables, to_text_grid};

    let markup = read_test_file("sample-10k.htm");
    let tables = locate_candidate_tables(&markup, "us-gaap", &["revenue".to_string()]);

    assert_eq!(tables.len(), 2);
    assert_eq!(
        tables[0].tag.local,
        "RevenueFromContractWithCustomerExcludingAssessedTax"
    );
    assert!(tables[0].markup.contains("Product A"));
    assert!(tables[1].markup.contains("United States"));

    let canonical = canonicalize(&tables[0]);
    assert!(!canonical.markup.contains("contextref"));
    assert!(canonical.markup.contains("padding-left:10pt;"));

    let grid = to_text_grid(&canonical.markup).unwrap();
    assert!(grid.contains("| - Product A |"));
    assert!(grid.contains("| Total revenue |"));
}
