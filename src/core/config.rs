use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::extract::FailurePolicy;
use crate::refine::retry::{ExponentialBackoff, FixedDelay, RetryOn, RetryPolicy};

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_USER_AGENT: &str = "software@example.com";
pub const DEFAULT_TAG_PREFIX: &str = "us-gaap";
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on one completion request, connect through body.
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_TOKEN"))
            .map_err(|_| anyhow!("LLM_API_KEY (or OPENROUTER_TOKEN) environment variable not set"))?;

        let base_url =
            std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string());
        let request_timeout = parse_timeout("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_TIMEOUT);

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature: 0.0,
            request_timeout,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub user_agent: String,
    pub fetch_timeout: Duration,
    pub max_attempts: u32,
    /// Zero selects immediate retries, anything else exponential backoff.
    pub backoff: Duration,
    pub retry_on: RetryOn,
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub keywords: Vec<String>,
    pub tag_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_attempts: 3,
            backoff: Duration::ZERO,
            retry_on: RetryOn::AllFailures,
            concurrency: 4,
            failure_policy: FailurePolicy::Isolate,
            keywords: vec!["revenue".to_string()],
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
        }
    }
}

impl ExtractorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let user_agent = std::env::var("USER_AGENT").unwrap_or(defaults.user_agent);
        let fetch_timeout =
            parse_timeout("EXTRACTOR_FETCH_TIMEOUT_SECS")?.unwrap_or(defaults.fetch_timeout);

        let max_attempts = parse_env("EXTRACTOR_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(anyhow!("EXTRACTOR_MAX_ATTEMPTS must be at least 1"));
        }

        let backoff = parse_env::<u64>("EXTRACTOR_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff);

        let concurrency = parse_env("EXTRACTOR_CONCURRENCY")?.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(anyhow!("EXTRACTOR_CONCURRENCY must be at least 1"));
        }

        let retry_on = match std::env::var("EXTRACTOR_RETRY_ON").ok().as_deref() {
            None | Some("all") => RetryOn::AllFailures,
            Some("transport") => RetryOn::TransportOnly,
            Some(other) => return Err(anyhow!("Unknown EXTRACTOR_RETRY_ON value: {}", other)),
        };

        let failure_policy = match std::env::var("EXTRACTOR_FAILURE_POLICY").ok().as_deref() {
            None | Some("isolate") => FailurePolicy::Isolate,
            Some("abort") => FailurePolicy::Abort,
            Some(other) => {
                return Err(anyhow!("Unknown EXTRACTOR_FAILURE_POLICY value: {}", other))
            }
        };

        let keywords = std::env::var("EXTRACTOR_KEYWORDS")
            .map(|raw| parse_keywords(&raw))
            .unwrap_or(defaults.keywords);

        let tag_prefix = std::env::var("EXTRACTOR_TAG_PREFIX").unwrap_or(defaults.tag_prefix);

        Ok(Self {
            user_agent,
            fetch_timeout,
            max_attempts,
            backoff,
            retry_on,
            concurrency,
            failure_policy,
            keywords,
            tag_prefix,
        })
    }

    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        if self.backoff.is_zero() {
            Arc::new(FixedDelay::immediate(self.max_attempts))
        } else {
            Arc::new(ExponentialBackoff::new(self.max_attempts, self.backoff))
        }
    }
}

pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("Invalid value for {}: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_timeout(key: &str) -> Result<Option<Duration>> {
    match parse_env::<u64>(key)? {
        Some(0) => Err(anyhow!("{} must be at least 1", key)),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_keywords(" revenue, Sales ,,"),
            vec!["revenue".to_string(), "Sales".to_string()]
        );
        assert!(parse_keywords("").is_empty());
    }

    #[test]
    fn test_retry_policy_selection() {
        let config = ExtractorConfig::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(1), Duration::ZERO);

        let config = ExtractorConfig {
            backoff: Duration::from_millis(100),
            ..ExtractorConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
    }
}
