use serde::{Deserialize, Serialize};

use super::error::RefineError;

/// One row of a revenue breakdown. Amounts are in millions of USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueLineItem {
    pub title: String,
    pub amount: f64,
    pub is_subtotal: bool,
}

/// A revenue breakdown table as transcribed by the model.
///
/// # JSON Format
/// ```json
/// {
///   "table_title": "Revenue by segment",
///   "items": [
///     { "title": "Product A", "amount": 100.0, "is_subtotal": false }
///   ],
///   "table_total": 100.0
/// }
/// ```
///
/// `revenue_items` and `table_total_revenue` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueTable {
    pub table_title: String,
    #[serde(alias = "revenue_items")]
    pub items: Vec<RevenueLineItem>,
    #[serde(alias = "table_total_revenue")]
    pub table_total: f64,
}

impl RevenueTable {
    /// Sum of all rows not flagged as subtotals.
    pub fn line_item_sum(&self) -> f64 {
        self.items
            .iter()
            .filter(|item| !item.is_subtotal)
            .map(|item| item.amount)
            .sum()
    }

    /// Difference between the declared total and the line items.
    ///
    /// A non-zero value is a signal for consumers, not an extraction failure.
    pub fn total_discrepancy(&self) -> f64 {
        self.table_total - self.line_item_sum()
    }
}

/// Result of refining one candidate table.
#[derive(Debug)]
pub enum ExtractionOutcome {
    Accepted(RevenueTable),
    /// The model judged the content not to be a revenue table.
    Rejected,
    /// Retries exhausted, or a non-retryable failure.
    Failed(RefineError),
}

impl ExtractionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ExtractionOutcome::Accepted(_))
    }

    pub fn into_table(self) -> Option<RevenueTable> {
        match self {
            ExtractionOutcome::Accepted(table) => Some(table),
            _ => None,
        }
    }
}
