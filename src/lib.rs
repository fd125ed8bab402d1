pub mod core;
pub mod edgar;
pub mod extract;
pub mod refine;
pub mod utils;

// Re-exports
pub use crate::core::config::{ExtractorConfig, LlmConfig};
pub use crate::core::error::{AcquisitionError, ExtractError, FormatError, RefineError};
pub use crate::core::init;
pub use crate::core::types::{ExtractionOutcome, RevenueLineItem, RevenueTable};
pub use edgar::parsing::{
    build_tag_index, canonicalize, filter_tags, locate_candidate_tables, to_text_grid,
    CandidateTable, CanonicalTable, SemanticTag,
};
pub use extract::{Extraction, ExtractionReport, Extractor, FailurePolicy};
pub use refine::{ExtractionInstruction, Refiner, TextGenerator};
pub use utils::progress::ProgressTracker;
