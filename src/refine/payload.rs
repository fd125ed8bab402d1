use serde::de::DeserializeOwned;

use crate::core::error::FormatError;
use crate::core::types::{RevenueLineItem, RevenueTable};

/// How the model is asked to fence its JSON answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadDelimiter {
    /// `<![CDATA[ ... ]]>`
    #[default]
    Cdata,
    /// A fenced code block opened with three backticks and `json`.
    JsonFence,
}

impl PayloadDelimiter {
    fn markers(&self) -> (&'static str, &'static str) {
        match self {
            PayloadDelimiter::Cdata => ("<![CDATA[", "]]>"),
            PayloadDelimiter::JsonFence => ("```json", "```"),
        }
    }

    /// Text between the first opening marker and the next closing marker.
    pub fn extract<'a>(&self, answer: &'a str) -> Option<&'a str> {
        let (open, close) = self.markers();
        let start = answer.find(open)? + open.len();
        let end = answer[start..].find(close)? + start;
        Some(answer[start..end].trim())
    }
}

/// Structural checks serde cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), FormatError>;
}

impl Validate for RevenueLineItem {
    fn validate(&self) -> Result<(), FormatError> {
        if self.title.trim().is_empty() {
            return Err(FormatError::Schema("line item with empty title".to_string()));
        }
        if !self.amount.is_finite() {
            return Err(FormatError::Schema(format!(
                "non-finite amount for {}",
                self.title
            )));
        }
        Ok(())
    }
}

impl Validate for RevenueTable {
    fn validate(&self) -> Result<(), FormatError> {
        if self.table_title.trim().is_empty() {
            return Err(FormatError::Schema("empty table title".to_string()));
        }
        self.items.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), FormatError> {
        self.iter().try_for_each(Validate::validate)
    }
}

/// Pulls the delimited JSON out of `answer` and decodes it as `T`.
pub fn parse_payload<T>(answer: &str, delimiter: PayloadDelimiter) -> Result<T, FormatError>
where
    T: DeserializeOwned + Validate,
{
    let json = delimiter
        .extract(answer)
        .ok_or(FormatError::MissingDelimiter)?;
    let value: T = serde_json::from_str(json)?;
    value.validate()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_JSON: &str = r#"{
        "table_title": "Revenue by segment",
        "items": [
            {"title": "Product A", "amount": 100, "is_subtotal": false},
            {"title": "Product B", "amount": 50, "is_subtotal": false}
        ],
        "table_total": 200
    }"#;

    #[test]
    fn test_cdata_payload() {
        let answer = format!("Here you go:\n<![CDATA[\n{}\n]]>\nDone.", TABLE_JSON);
        let table: RevenueTable = parse_payload(&answer, PayloadDelimiter::Cdata).unwrap();
        assert_eq!(table.items.len(), 2);
        assert_eq!(table.items[0].title, "Product A");
        // Totals that disagree with the rows are still accepted.
        assert_eq!(table.table_total, 200.0);
        assert_eq!(table.total_discrepancy(), 50.0);
    }

    #[test]
    fn test_json_fence_payload() {
        let answer = format!("```json\n{}\n```", TABLE_JSON);
        let table: RevenueTable = parse_payload(&answer, PayloadDelimiter::JsonFence).unwrap();
        assert_eq!(table.table_title, "Revenue by segment");
        assert!(matches!(
            parse_payload::<RevenueTable>(&answer, PayloadDelimiter::Cdata),
            Err(FormatError::MissingDelimiter)
        ));
    }

    #[test]
    fn test_missing_delimiter() {
        let err = parse_payload::<RevenueTable>(TABLE_JSON, PayloadDelimiter::Cdata).unwrap_err();
        assert!(matches!(err, FormatError::MissingDelimiter));

        let unterminated = format!("<![CDATA[{}", TABLE_JSON);
        let err = parse_payload::<RevenueTable>(&unterminated, PayloadDelimiter::Cdata).unwrap_err();
        assert!(matches!(err, FormatError::MissingDelimiter));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_payload::<RevenueTable>("<![CDATA[{\"table_title\": ]]>", PayloadDelimiter::Cdata)
            .unwrap_err();
        assert!(matches!(err, FormatError::InvalidJson(_)));

        let wrong_shape = r#"<![CDATA[{"table_title": "Revenue", "items": "none", "table_total": 1}]]>"#;
        let err = parse_payload::<RevenueTable>(wrong_shape, PayloadDelimiter::Cdata).unwrap_err();
        assert!(matches!(err, FormatError::InvalidJson(_)));
    }

    #[test]
    fn test_schema_violation() {
        let answer = r#"<![CDATA[{
            "table_title": "Revenue",
            "items": [{"title": "  ", "amount": 1, "is_subtotal": false}],
            "table_total": 1
        }]]>"#;
        let err = parse_payload::<RevenueTable>(answer, PayloadDelimiter::Cdata).unwrap_err();
        assert!(matches!(err, FormatError::Schema(_)));
    }

    #[test]
    fn test_list_shape() {
        let answer = format!("<![CDATA[[{}, {}]]]>", TABLE_JSON, TABLE_JSON);
        let tables: Vec<RevenueTable> = parse_payload(&answer, PayloadDelimiter::Cdata).unwrap();
        assert_eq!(tables.len(), 2);
    }
}
