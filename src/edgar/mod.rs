pub mod fetch;
pub mod filing;
pub mod parsing;
pub mod report;
pub mod tickers;

pub use fetch::{DocumentSource, FileDocumentSource, HttpDocumentSource};
pub use filing::{latest_filing, latest_filing_url, Filing};
pub use report::ReportType;
pub use tickers::{resolve_cik, Ticker};
