use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::core::config::CONNECT_TIMEOUT;
use crate::core::error::AcquisitionError;
use crate::utils::rate_limit::RateLimiter;

/// SEC fair-access guidance allows 10 requests in flight.
pub const EDGAR_MAX_CONCURRENT: usize = 10;

/// Anything that can hand back a document body for a locator.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<String, AcquisitionError>;
}

/// Fetches documents over HTTP with an SEC-style `User-Agent`.
#[derive(Clone)]
pub struct HttpDocumentSource {
    client: Client,
    user_agent: String,
    limiter: Arc<RateLimiter>,
}

impl HttpDocumentSource {
    /// `timeout` bounds each request from connect through the full body.
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .gzip(true)
            .build()
            .map_err(|e| AcquisitionError::Client(e.to_string()))?;

        Ok(Self {
            client,
            user_agent: user_agent.into(),
            limiter: Arc::new(RateLimiter::new(EDGAR_MAX_CONCURRENT)),
        })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, locator: &str) -> Result<String, AcquisitionError> {
        let url = Url::parse(locator)
            .map_err(|e| AcquisitionError::InvalidLocator(format!("{}: {}", locator, e)))?;

        let _permit = self.limiter.acquire().await;
        log::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, accept_for(&url).as_ref())
            .send()
            .await
            .map_err(|e| AcquisitionError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        log::debug!("Response status: {}", response.status());

        if !response.status().is_success() {
            return Err(AcquisitionError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content = response
            .text()
            .await
            .map_err(|e| AcquisitionError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        log::debug!("Received content length: {}", content.len());

        Ok(content)
    }
}

/// EDGAR serves JSON indexes and HTML filings from the same hosts.
fn accept_for(url: &Url) -> mime::Mime {
    if url.path().ends_with(".json") {
        mime::APPLICATION_JSON
    } else {
        mime::TEXT_HTML
    }
}

/// Reads documents from the local filesystem, optionally under a root.
#[derive(Debug, Clone, Default)]
pub struct FileDocumentSource {
    root: Option<PathBuf>,
}

impl FileDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, locator: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(locator),
            None => PathBuf::from(locator),
        }
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    async fn fetch(&self, locator: &str) -> Result<String, AcquisitionError> {
        if locator.trim().is_empty() {
            return Err(AcquisitionError::InvalidLocator("empty path".to_string()));
        }
        let path = self.resolve(locator);
        log::debug!("Reading {:?}", path);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| AcquisitionError::Io {
                path: path.display().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_source_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("filing.htm")).unwrap();
        write!(file, "<html></html>").unwrap();

        let source = FileDocumentSource::with_root(dir.path());
        assert_eq!(source.fetch("filing.htm").await.unwrap(), "<html></html>");

        let err = source.fetch("missing.htm").await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Io { .. }));

        let err = source.fetch(" ").await.unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidLocator(_)));
    }

    #[test]
    fn test_accept_header_follows_extension() {
        let json = Url::parse("https://www.sec.gov/files/company_tickers.json").unwrap();
        let html = Url::parse("https://www.sec.gov/Archives/edgar/data/1/2/a.htm").unwrap();
        assert_eq!(accept_for(&json), mime::APPLICATION_JSON);
        assert_eq!(accept_for(&html), mime::TEXT_HTML);
    }

    fn http_source(timeout: Duration) -> HttpDocumentSource {
        HttpDocumentSource::new("tests@example.com", timeout).unwrap()
    }

    #[tokio::test]
    async fn test_http_source_rejects_bad_url() {
        let err = http_source(Duration::from_secs(5))
            .fetch("not a url")
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidLocator(_)));
    }

    #[tokio::test]
    async fn test_http_source_gives_up_on_stalled_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let source = http_source(Duration::from_millis(300));
        let locator = format!("http://{}/filing.htm", addr);
        let result = tokio::time::timeout(Duration::from_secs(5), source.fetch(&locator))
            .await
            .expect("fetch should give up on its own");
        assert!(matches!(result, Err(AcquisitionError::Transport { .. })));

        server.abort();
    }
}
