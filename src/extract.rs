use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::error::ExtractError;
use crate::core::types::{ExtractionOutcome, RevenueTable};
use crate::edgar::parsing::{
    canonicalize_with, CanonicalTable, CanonicalizeOptions, SemanticTag, TableLocator,
};
use crate::refine::{ExtractionInstruction, Refiner};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// What to do when a table exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, skip the table, keep going.
    #[default]
    Isolate,
    /// Stop the run and surface the first failure.
    Abort,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    pub tag: SemanticTag,
    pub ordinal: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub tags_discovered: usize,
    pub tags_retained: usize,
    pub tables_located: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    pub failures: Vec<TableFailure>,
    /// The deadline passed before every table was refined.
    pub timed_out: bool,
}

impl ExtractionReport {
    /// Tables that never produced an outcome because the run timed out.
    pub fn skipped(&self) -> usize {
        self.tables_located
            .saturating_sub(self.accepted + self.rejected + self.failed)
    }
}

/// An accepted table and the tag that led to it.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedTable {
    pub tag: SemanticTag,
    pub ordinal: usize,
    #[serde(flatten)]
    pub table: RevenueTable,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub tables: Vec<ExtractedTable>,
    pub report: ExtractionReport,
}

impl Extraction {
    pub fn into_revenue_tables(self) -> Vec<RevenueTable> {
        self.tables.into_iter().map(|t| t.table).collect()
    }
}

struct TableJob {
    tag: SemanticTag,
    ordinal: usize,
    table: CanonicalTable,
}

struct TableResult {
    tag: SemanticTag,
    ordinal: usize,
    outcome: ExtractionOutcome,
}

/// Aborts every refinement still running when dropped.
struct TaskGuard(Vec<JoinHandle<()>>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Runs the locate, canonicalize, refine pipeline over one filing.
pub struct Extractor {
    refiner: Arc<Refiner>,
    locator: TableLocator,
    canonicalize: CanonicalizeOptions,
    max_concurrency: usize,
    failure_policy: FailurePolicy,
}

impl Extractor {
    pub fn new(refiner: Refiner, tag_prefix: impl Into<String>) -> Self {
        Self {
            refiner: Arc::new(refiner),
            locator: TableLocator::new(tag_prefix),
            canonicalize: CanonicalizeOptions::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_canonicalize_options(mut self, options: CanonicalizeOptions) -> Self {
        self.canonicalize = options;
        self
    }

    /// Extracts every revenue table the model accepts, in tag then discovery order.
    ///
    /// Rejections are dropped. Failures are dropped too under
    /// [`FailurePolicy::Isolate`] and recorded in the report.
    pub async fn extract_revenue_tables(
        &self,
        markup: &str,
        keywords: &[String],
        instruction: &ExtractionInstruction,
    ) -> Result<Extraction, ExtractError> {
        self.run(markup, keywords, instruction, None).await
    }

    /// Like [`Extractor::extract_revenue_tables`], but gives up after `timeout`
    /// and returns whatever finished in time with `report.timed_out` set.
    pub async fn extract_with_deadline(
        &self,
        markup: &str,
        keywords: &[String],
        instruction: &ExtractionInstruction,
        timeout: Duration,
    ) -> Result<Extraction, ExtractError> {
        self.run(markup, keywords, instruction, Some(Instant::now() + timeout))
            .await
    }

    async fn run(
        &self,
        markup: &str,
        keywords: &[String],
        instruction: &ExtractionInstruction,
        deadline: Option<Instant>,
    ) -> Result<Extraction, ExtractError> {
        let located = self.locator.locate(markup, keywords);
        let mut report = ExtractionReport {
            tags_discovered: located.tags_discovered,
            tags_retained: located.tags_retained(),
            tables_located: located.table_count(),
            ..ExtractionReport::default()
        };

        // Canonicalize up front: parsed fragments cannot cross task boundaries.
        let jobs: Vec<TableJob> = located
            .into_tables()
            .into_iter()
            .map(|candidate| TableJob {
                table: canonicalize_with(&candidate, &self.canonicalize),
                tag: candidate.tag,
                ordinal: candidate.ordinal,
            })
            .collect();

        if jobs.is_empty() {
            log::info!("No candidate tables to refine");
            return Ok(Extraction {
                tables: Vec::new(),
                report,
            });
        }

        let instruction = Arc::new(instruction.clone());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let (tx, mut rx) = mpsc::channel(jobs.len());
        let mut tasks = TaskGuard(Vec::with_capacity(jobs.len()));

        for job in jobs {
            let tx = tx.clone();
            let refiner = Arc::clone(&self.refiner);
            let instruction = Arc::clone(&instruction);
            let semaphore = Arc::clone(&semaphore);

            tasks.0.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                log::debug!("Refining table #{} for {}", job.ordinal, job.tag);
                let outcome = refiner.refine(&job.table, &instruction).await;
                let _ = tx
                    .send(TableResult {
                        tag: job.tag,
                        ordinal: job.ordinal,
                        outcome,
                    })
                    .await;
            }));
        }

        drop(tx);

        let mut results = Vec::with_capacity(tasks.0.len());
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        log::warn!(
                            "Deadline reached with {} of {} table(s) refined",
                            results.len(),
                            report.tables_located
                        );
                        report.timed_out = true;
                        break;
                    }
                },
                None => rx.recv().await,
            };

            let Some(result) = next else {
                break;
            };

            if self.failure_policy == FailurePolicy::Abort {
                if let ExtractionOutcome::Failed(source) = result.outcome {
                    log::error!(
                        "Aborting extraction: table #{} for {} failed",
                        result.ordinal,
                        result.tag
                    );
                    return Err(ExtractError::Refinement {
                        tag: result.tag,
                        ordinal: result.ordinal,
                        source,
                    });
                }
            }

            results.push(result);
        }

        // Stop anything still running after a timeout.
        drop(tasks);

        results.sort_by_key(|r| r.ordinal);

        let mut tables = Vec::new();
        for result in results {
            match result.outcome {
                ExtractionOutcome::Accepted(table) => {
                    report.accepted += 1;
                    tables.push(ExtractedTable {
                        tag: result.tag,
                        ordinal: result.ordinal,
                        table,
                    });
                }
                ExtractionOutcome::Rejected => {
                    log::debug!("Table #{} for {} rejected", result.ordinal, result.tag);
                    report.rejected += 1;
                }
                ExtractionOutcome::Failed(e) => {
                    log::warn!(
                        "Skipping table #{} for {}: {}",
                        result.ordinal,
                        result.tag,
                        e
                    );
                    report.failed += 1;
                    report.failures.push(TableFailure {
                        tag: result.tag,
                        ordinal: result.ordinal,
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Extracted {} revenue table(s): {} rejected, {} failed, {} skipped",
            report.accepted,
            report.rejected,
            report.failed,
            report.skipped()
        );

        Ok(Extraction { tables, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RefineError;
    use crate::refine::tests::{Scripted, GOOD_ANSWER};
    use crate::refine::{FixedDelay, TextGenerator};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DOC: &str = r#"<html xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"><body>
        <table id="a"><tr><td>Segment</td><td><ix:nonFraction name="us-gaap:Revenues">1</ix:nonFraction></td></tr></table>
        <table id="b"><tr><td>Region</td><td><ix:nonFraction name="us-gaap:Revenues">2</ix:nonFraction></td></tr></table>
    </body></html>"#;

    fn extractor(script: Vec<Result<String, RefineError>>) -> (Arc<Scripted>, Extractor) {
        let generator = Arc::new(Scripted::new(script));
        let refiner = Refiner::new(generator.clone(), Arc::new(FixedDelay::immediate(1)));
        // One at a time so the script is consumed in ordinal order.
        let extractor = Extractor::new(refiner, "us-gaap").with_max_concurrency(1);
        (generator, extractor)
    }

    fn keywords() -> Vec<String> {
        vec!["revenue".to_string()]
    }

    #[tokio::test]
    async fn test_rejections_are_dropped() {
        let (generator, extractor) =
            extractor(vec![Ok(GOOD_ANSWER.to_string()), Ok("no table".to_string())]);
        let extraction = extractor
            .extract_revenue_tables(DOC, &keywords(), &ExtractionInstruction::default())
            .await
            .unwrap();

        assert_eq!(generator.call_count(), 2);
        assert_eq!(extraction.tables.len(), 1);
        assert_eq!(extraction.tables[0].ordinal, 0);
        assert_eq!(extraction.report.tables_located, 2);
        assert_eq!(extraction.report.accepted, 1);
        assert_eq!(extraction.report.rejected, 1);
        assert_eq!(extraction.report.skipped(), 0);
    }

    #[tokio::test]
    async fn test_isolated_failures_are_reported() {
        let (_, extractor) = extractor(vec![
            Err(RefineError::Transport("boom".to_string())),
            Ok(GOOD_ANSWER.to_string()),
        ]);
        let extraction = extractor
            .extract_revenue_tables(DOC, &keywords(), &ExtractionInstruction::default())
            .await
            .unwrap();

        assert_eq!(extraction.tables.len(), 1);
        assert_eq!(extraction.tables[0].ordinal, 1);
        assert_eq!(extraction.report.failed, 1);
        let failure = &extraction.report.failures[0];
        assert_eq!(failure.ordinal, 0);
        assert_eq!(failure.tag.qualified(), "us-gaap:Revenues");
        assert!(failure.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_abort_policy_surfaces_failure() {
        let (_, extractor) = extractor(vec![Err(RefineError::Transport("boom".to_string()))]);
        let extractor = extractor.with_failure_policy(FailurePolicy::Abort);
        let err = extractor
            .extract_revenue_tables(DOC, &keywords(), &ExtractionInstruction::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Refinement { ordinal: 0, .. }));
    }

    /// Records how many completions overlap, and holds back the segment table.
    #[derive(Default)]
    struct Overlapping {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        slow_segment: bool,
    }

    #[async_trait::async_trait]
    impl TextGenerator for Overlapping {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, RefineError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = if self.slow_segment && user.contains("<td>Segment</td>") {
                Duration::from_millis(500)
            } else {
                Duration::from_millis(10)
            };
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(GOOD_ANSWER.to_string())
        }
    }

    fn overlapping_extractor(generator: Arc<Overlapping>, max_concurrency: usize) -> Extractor {
        let refiner = Refiner::new(generator, Arc::new(FixedDelay::immediate(1)));
        Extractor::new(refiner, "us-gaap").with_max_concurrency(max_concurrency)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_is_respected() {
        let rows: String = (0..6)
            .map(|i| {
                format!(
                    r#"<table><tr><td>Line {i}</td><td><ix:nonFraction name="us-gaap:Revenues">{i}</ix:nonFraction></td></tr></table>"#
                )
            })
            .collect();
        let doc = format!(
            r#"<html xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"><body>{rows}</body></html>"#
        );

        let generator = Arc::new(Overlapping::default());
        let extraction = overlapping_extractor(generator.clone(), 2)
            .extract_revenue_tables(&doc, &keywords(), &ExtractionInstruction::default())
            .await
            .unwrap();

        assert_eq!(extraction.report.accepted, 6);
        assert_eq!(generator.peak.load(Ordering::SeqCst), 2);
        assert_eq!(generator.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_ordinals_not_completion_order() {
        let generator = Arc::new(Overlapping {
            slow_segment: true,
            ..Overlapping::default()
        });
        let extraction = overlapping_extractor(generator.clone(), 2)
            .extract_revenue_tables(DOC, &keywords(), &ExtractionInstruction::default())
            .await
            .unwrap();

        assert_eq!(generator.peak.load(Ordering::SeqCst), 2);
        let ordinals: Vec<usize> = extraction.tables.iter().map(|t| t.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_nothing_to_refine() {
        let (generator, extractor) = extractor(vec![]);
        for markup in ["", "<html><body><p>No tables</p></body></html>", DOC] {
            let extraction = extractor
                .extract_revenue_tables(markup, &[], &ExtractionInstruction::default())
                .await
                .unwrap();
            assert!(extraction.tables.is_empty());
            assert_eq!(extraction.report.tables_located, 0);
        }
        assert_eq!(generator.call_count(), 0);
    }
}
