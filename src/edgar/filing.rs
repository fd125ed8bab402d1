use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fetch::DocumentSource;
use super::report::ReportType;
use crate::core::error::AcquisitionError;

pub const EDGAR_DATA_URL: &str = "https://data.sec.gov";
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// Column-oriented `filings.recent` block of the submissions JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilingEntry {
    #[serde(rename = "accessionNumber")]
    pub accession_number: Vec<String>,
    #[serde(rename = "filingDate")]
    pub filing_date: Vec<NaiveDate>,
    #[serde(rename = "form")]
    pub report_type: Vec<ReportType>,
    #[serde(rename = "primaryDocument")]
    pub primary_document: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilingsData {
    pub recent: FilingEntry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyFilings {
    pub cik: String,
    pub name: String,
    pub filings: FilingsData,
}

/// One filing, flattened out of the columnar listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filing {
    pub cik: String,
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub report_type: ReportType,
    pub primary_document: String,
}

impl Filing {
    /// Archive URL of the primary document.
    pub fn document_url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            EDGAR_ARCHIVES_URL,
            self.cik.trim_start_matches('0'),
            self.accession_number.replace('-', ""),
            self.primary_document
        )
    }
}

pub fn submissions_url(cik: &str) -> String {
    format!("{}/submissions/CIK{:0>10}.json", EDGAR_DATA_URL, cik)
}

/// Most recent filing of `form` in a submissions JSON document.
pub fn latest_from_submissions(
    json: &str,
    form: &ReportType,
) -> Result<Option<Filing>, serde_json::Error> {
    let company: CompanyFilings = serde_json::from_str(json)?;
    let recent = company.filings.recent;

    let latest = recent
        .report_type
        .iter()
        .enumerate()
        .filter(|(_, report_type)| *report_type == form)
        .filter_map(|(i, report_type)| {
            Some(Filing {
                cik: company.cik.clone(),
                accession_number: recent.accession_number.get(i)?.clone(),
                filing_date: *recent.filing_date.get(i)?,
                report_type: report_type.clone(),
                primary_document: recent.primary_document.get(i)?.clone(),
            })
        })
        .max_by_key(|filing| filing.filing_date);

    Ok(latest)
}

pub async fn latest_filing(
    source: &dyn DocumentSource,
    cik: &str,
    form: &ReportType,
) -> Result<Filing, AcquisitionError> {
    let url = submissions_url(cik);
    log::info!("Fetching company filings from {}", url);

    let json = source.fetch(&url).await?;
    let filing = latest_from_submissions(&json, form)
        .map_err(|e| AcquisitionError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?
        .ok_or_else(|| {
            AcquisitionError::NotFound(format!("No {} filing found for CIK {}", form, cik))
        })?;

    log::info!(
        "Latest {} for CIK {} filed {} ({})",
        form,
        cik,
        filing.filing_date,
        filing.accession_number
    );
    Ok(filing)
}

pub async fn latest_filing_url(
    source: &dyn DocumentSource,
    cik: &str,
    form: &ReportType,
) -> Result<String, AcquisitionError> {
    Ok(latest_filing(source, cik, form).await?.document_url())
}
