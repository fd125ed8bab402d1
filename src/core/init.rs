use std::sync::Arc;

use super::config::{ExtractorConfig, LlmConfig};
use crate::core::error::{AcquisitionError, RefineError};
use crate::edgar::HttpDocumentSource;
use crate::extract::Extractor;
use crate::refine::{OpenAiCompatibleClient, Refiner, TextGenerator};

pub fn initialize_generator(llm: &LlmConfig) -> Result<Arc<dyn TextGenerator>, RefineError> {
    log::debug!(
        "Using model {} at {} ({}s timeout)",
        llm.model,
        llm.base_url,
        llm.request_timeout.as_secs()
    );
    Ok(Arc::new(OpenAiCompatibleClient::from_config(llm)?))
}

pub fn initialize_refiner(config: &ExtractorConfig, generator: Arc<dyn TextGenerator>) -> Refiner {
    Refiner::new(generator, config.retry_policy()).with_retry_on(config.retry_on)
}

pub fn initialize_extractor(
    config: &ExtractorConfig,
    llm: &LlmConfig,
) -> Result<Extractor, RefineError> {
    Ok(extractor_with_generator(config, initialize_generator(llm)?))
}

/// Same as [`initialize_extractor`] with a caller-supplied backend.
pub fn extractor_with_generator(
    config: &ExtractorConfig,
    generator: Arc<dyn TextGenerator>,
) -> Extractor {
    Extractor::new(initialize_refiner(config, generator), config.tag_prefix.clone())
        .with_max_concurrency(config.concurrency)
        .with_failure_policy(config.failure_policy)
}

pub fn initialize_document_source(
    config: &ExtractorConfig,
) -> Result<HttpDocumentSource, AcquisitionError> {
    HttpDocumentSource::new(config.user_agent.clone(), config.fetch_timeout)
}
