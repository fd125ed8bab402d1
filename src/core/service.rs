use std::time::Duration;

use super::error::ExtractError;
use crate::edgar::{filing, tickers, DocumentSource, ReportType, Ticker};
use crate::extract::{Extraction, Extractor};
use crate::refine::ExtractionInstruction;

/// Acquisition plus extraction for one document at a time.
pub struct ExtractionService<S: DocumentSource> {
    source: S,
    extractor: Extractor,
    keywords: Vec<String>,
    instruction: ExtractionInstruction,
    timeout: Option<Duration>,
}

impl<S: DocumentSource> ExtractionService<S> {
    pub fn new(source: S, extractor: Extractor, keywords: Vec<String>) -> Self {
        Self {
            source,
            extractor,
            keywords,
            instruction: ExtractionInstruction::default(),
            timeout: None,
        }
    }

    pub fn with_instruction(mut self, instruction: ExtractionInstruction) -> Self {
        self.instruction = instruction;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches `locator` and extracts its revenue tables. A failed fetch
    /// aborts the run.
    pub async fn extract_from(&self, locator: &str) -> Result<Extraction, ExtractError> {
        let markup = self.source.fetch(locator).await?;
        log::info!("Fetched {} ({} bytes)", locator, markup.len());
        self.extract_markup(&markup).await
    }

    pub async fn extract_markup(&self, markup: &str) -> Result<Extraction, ExtractError> {
        match self.timeout {
            Some(timeout) => {
                self.extractor
                    .extract_with_deadline(markup, &self.keywords, &self.instruction, timeout)
                    .await
            }
            None => {
                self.extractor
                    .extract_revenue_tables(markup, &self.keywords, &self.instruction)
                    .await
            }
        }
    }

    /// Resolves the most recent `form` filing for `ticker` and extracts it.
    pub async fn extract_latest(
        &self,
        ticker: &Ticker,
        form: &ReportType,
    ) -> Result<Extraction, ExtractError> {
        let url = self.latest_filing_url(ticker, form).await?;
        self.extract_from(&url).await
    }

    pub async fn latest_filing_url(
        &self,
        ticker: &Ticker,
        form: &ReportType,
    ) -> Result<String, ExtractError> {
        let cik = tickers::resolve_cik(&self.source, ticker).await?;
        Ok(filing::latest_filing_url(&self.source, &cik, form).await?)
    }
}
