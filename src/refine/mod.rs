pub mod llm;
pub mod payload;
pub mod prompt;
pub mod retry;

use std::sync::Arc;

use crate::core::error::RefineError;
use crate::core::types::{ExtractionOutcome, RevenueTable};
use crate::edgar::parsing::CanonicalTable;

pub use llm::{OpenAiCompatibleClient, TextGenerator};
pub use payload::{parse_payload, PayloadDelimiter, Validate};
pub use prompt::ExtractionInstruction;
pub use retry::{retry, ExponentialBackoff, FixedDelay, RetryOn, RetryPolicy, Retried};

pub const DEFAULT_REJECTION_PHRASE: &str = "no table";

/// What a well-formed answer looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContract {
    pub delimiter: PayloadDelimiter,
    /// Matched case-insensitively anywhere in the answer.
    pub rejection_phrase: String,
}

impl Default for ResponseContract {
    fn default() -> Self {
        Self {
            delimiter: PayloadDelimiter::default(),
            rejection_phrase: DEFAULT_REJECTION_PHRASE.to_string(),
        }
    }
}

/// A successfully interpreted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Refinement {
    Table(RevenueTable),
    Rejected,
}

/// Classifies a raw answer. Rejection wins over any payload that may follow.
pub fn interpret_answer(answer: &str, contract: &ResponseContract) -> Result<Refinement, RefineError> {
    let phrase = contract.rejection_phrase.to_lowercase();
    if !phrase.is_empty() && answer.to_lowercase().contains(&phrase) {
        return Ok(Refinement::Rejected);
    }
    let table = parse_payload::<RevenueTable>(answer, contract.delimiter)?;
    Ok(Refinement::Table(table))
}

/// Turns canonical tables into revenue records through a text generator.
pub struct Refiner {
    generator: Arc<dyn TextGenerator>,
    policy: Arc<dyn RetryPolicy>,
    retry_on: RetryOn,
    contract: ResponseContract,
}

impl Refiner {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            generator,
            policy,
            retry_on: RetryOn::default(),
            contract: ResponseContract::default(),
        }
    }

    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    pub fn with_contract(mut self, contract: ResponseContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn contract(&self) -> &ResponseContract {
        &self.contract
    }

    /// A single attempt: one model call and one interpretation.
    pub async fn refine_once(
        &self,
        table: &CanonicalTable,
        instruction: &ExtractionInstruction,
    ) -> Result<Refinement, RefineError> {
        let user = instruction.render(&table.markup);
        let answer = self.generator.complete(&instruction.system, &user).await?;
        log::debug!("Model answer ({} chars): {}", answer.len(), answer);
        interpret_answer(&answer, &self.contract)
    }

    /// Refines `table` under the retry policy. Never returns an error:
    /// exhausted failures come back as [`ExtractionOutcome::Failed`].
    pub async fn refine(
        &self,
        table: &CanonicalTable,
        instruction: &ExtractionInstruction,
    ) -> ExtractionOutcome {
        let retry_on = self.retry_on;
        let should_retry = move |e: &RefineError| match retry_on {
            RetryOn::AllFailures => true,
            RetryOn::TransportOnly => e.is_transport(),
        };

        match retry(self.policy.as_ref(), should_retry, |_| {
            self.refine_once(table, instruction)
        })
        .await
        {
            Ok(Retried {
                value: Refinement::Table(revenue),
                attempts,
            }) => {
                log::info!(
                    "Accepted \"{}\" with {} item(s) after {} attempt(s)",
                    revenue.table_title,
                    revenue.items.len(),
                    attempts
                );
                ExtractionOutcome::Accepted(revenue)
            }
            Ok(Retried {
                value: Refinement::Rejected,
                ..
            }) => {
                log::info!("Model rejected table as not revenue related");
                ExtractionOutcome::Rejected
            }
            Err(e) => {
                log::error!("Refinement failed: {}", e);
                ExtractionOutcome::Failed(e)
            }
        }
    }
}
