pub mod canonical;
pub mod facts;
pub mod locator;
pub mod markup;
pub mod tags;
pub mod text;

#[cfg(test)]
pub(crate) mod tests;

pub use canonical::{canonicalize, canonicalize_with, CanonicalTable, CanonicalizeOptions};
pub use facts::{FactKind, TaggedFact};
pub use locator::{locate_candidate_tables, CandidateTable, LocatedTables, TableLocator, TagTables};
pub use tags::{build_tag_index, filter_tags, SemanticTag};
pub use text::{to_text_grid, to_text_grid_with, TextGridOptions};
