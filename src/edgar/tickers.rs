use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;

use super::fetch::DocumentSource;
use crate::core::error::AcquisitionError;

pub const TICKER_URL: &str = "https://www.sec.gov/files/company_tickers.json";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(ticker: String) -> Result<Self> {
        let uppercase_ticker = ticker.trim().to_uppercase();
        if uppercase_ticker.is_empty() {
            return Err(anyhow!("Ticker cannot be empty"));
        }
        if !uppercase_ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(anyhow!(
                "Ticker must contain only alphanumeric characters, dots or hyphens: {}",
                ticker
            ));
        }
        Ok(Ticker(uppercase_ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
    title: String,
}

/// A company as listed in the SEC ticker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    /// Zero-padded to ten digits.
    pub cik: String,
    pub name: String,
}

/// Parses `company_tickers.json` into a ticker -> company map.
pub fn parse_ticker_map(json: &str) -> Result<HashMap<String, Company>, serde_json::Error> {
    let entries: HashMap<String, TickerEntry> = serde_json::from_str(json)?;
    log::debug!("Found {} ticker entries", entries.len());

    Ok(entries
        .into_values()
        .map(|entry| {
            (
                entry.ticker.trim().to_uppercase(),
                Company {
                    cik: format!("{:010}", entry.cik_str),
                    name: entry.title,
                },
            )
        })
        .collect())
}

/// Looks up the company behind `ticker` from the SEC ticker file.
pub async fn resolve_company(
    source: &dyn DocumentSource,
    ticker: &Ticker,
) -> Result<Company, AcquisitionError> {
    let json = source.fetch(TICKER_URL).await?;
    let map = parse_ticker_map(&json).map_err(|e| AcquisitionError::Decode {
        url: TICKER_URL.to_string(),
        message: e.to_string(),
    })?;

    map.get(ticker.as_str())
        .cloned()
        .ok_or_else(|| AcquisitionError::NotFound(format!("No CIK found for ticker: {}", ticker)))
}

pub async fn resolve_cik(
    source: &dyn DocumentSource,
    ticker: &Ticker,
) -> Result<String, AcquisitionError> {
    let company = resolve_company(source, ticker).await?;
    log::info!("Resolved {} to CIK {} ({})", ticker, company.cik, company.name);
    Ok(company.cik)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const TICKERS: &str = r#"{
        "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "1": {"cik_str": 789019, "ticker": "msft", "title": "MICROSOFT CORP"}
    }"#;

    struct Fixed(&'static str);

    #[async_trait]
    impl DocumentSource for Fixed {
        async fn fetch(&self, _locator: &str) -> Result<String, AcquisitionError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_ticker_validation() {
        assert_eq!(Ticker::new("aapl".to_string()).unwrap().as_str(), "AAPL");
        assert_eq!(Ticker::new("brk.b".to_string()).unwrap().as_str(), "BRK.B");
        assert!(Ticker::new("".to_string()).is_err());
        assert!(Ticker::new("A$PL".to_string()).is_err());
    }

    #[test]
    fn test_parse_ticker_map() {
        let map = parse_ticker_map(TICKERS).unwrap();
        assert_eq!(map["AAPL"].cik, "0000320193");
        assert_eq!(map["MSFT"].name, "MICROSOFT CORP");
    }

    #[tokio::test]
    async fn test_resolve_cik() {
        let source = Fixed(TICKERS);
        let aapl = Ticker::new("aapl".to_string()).unwrap();
        assert_eq!(resolve_cik(&source, &aapl).await.unwrap(), "0000320193");

        let missing = Ticker::new("ZZZZ".to_string()).unwrap();
        let err = resolve_cik(&source, &missing).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::NotFound(_)));

        let err = resolve_cik(&Fixed("[]"), &aapl).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Decode { .. }));
    }
}
