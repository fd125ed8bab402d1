use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::facts::extract_facts;
use super::markup::{normalize_entities, parse_document};
use super::tags::{filter_tags, tag_index_from, SemanticTag};

/// A table container that holds at least one fact of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTable {
    /// First tag, in filter order, that reached this table.
    pub tag: SemanticTag,
    /// Position in discovery order across the whole run.
    pub ordinal: usize,
    /// Content hash used for dedup.
    pub key: u64,
    /// Number of matching facts that resolved to this table.
    pub fact_count: usize,
    pub markup: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagTables {
    pub tag: SemanticTag,
    pub tables: Vec<CandidateTable>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LocatedTables {
    pub tags_discovered: usize,
    pub groups: Vec<TagTables>,
}

impl LocatedTables {
    pub fn tags_retained(&self) -> usize {
        self.groups.len()
    }

    pub fn table_count(&self) -> usize {
        self.groups.iter().map(|g| g.tables.len()).sum()
    }

    pub fn into_tables(self) -> Vec<CandidateTable> {
        self.groups.into_iter().flat_map(|g| g.tables).collect()
    }
}

pub fn content_key(markup: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    markup.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
pub struct TableLocator {
    prefix: String,
}

impl TableLocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Finds the tables behind every fact whose tag passes the keyword filter.
    ///
    /// Tags are visited in sorted order and facts in document order. Each
    /// distinct table appears once, under the first tag that reached it.
    pub fn locate(&self, markup: &str, keywords: &[String]) -> LocatedTables {
        let markup = normalize_entities(markup);
        let Some(doc) = parse_document(&markup) else {
            return LocatedTables::default();
        };

        let index = tag_index_from(&doc, &self.prefix);
        let retained = filter_tags(&index, keywords);
        let facts = extract_facts(&doc, &self.prefix);

        let mut seen: HashMap<u64, (usize, usize)> = HashMap::new();
        let mut groups: Vec<TagTables> = Vec::with_capacity(retained.len());
        let mut ordinal = 0;

        for tag in retained {
            let mut tables: Vec<CandidateTable> = Vec::new();

            for fact in facts.iter().filter(|f| f.tag == tag) {
                let Some(range) = fact.table.clone() else {
                    log::debug!("Dropping {} fact outside any table", fact.tag);
                    continue;
                };
                let table_markup = &markup[range];
                let key = content_key(table_markup);

                if let Some(&(group, position)) = seen.get(&key) {
                    match groups.get_mut(group) {
                        Some(existing) => existing.tables[position].fact_count += 1,
                        None => tables[position].fact_count += 1,
                    }
                    continue;
                }

                seen.insert(key, (groups.len(), tables.len()));
                tables.push(CandidateTable {
                    tag: tag.clone(),
                    ordinal,
                    key,
                    fact_count: 1,
                    markup: table_markup.to_string(),
                });
                ordinal += 1;
            }

            log::debug!("Tag {} located {} new table(s)", tag, tables.len());
            groups.push(TagTables { tag, tables });
        }

        let located = LocatedTables {
            tags_discovered: index.len(),
            groups,
        };
        log::info!(
            "Located {} candidate table(s) from {} of {} {} tag(s)",
            located.table_count(),
            located.tags_retained(),
            located.tags_discovered,
            self.prefix
        );
        located
    }
}

/// Flat, ordered list of deduplicated candidate tables.
pub fn locate_candidate_tables(
    markup: &str,
    prefix: &str,
    keywords: &[String],
) -> Vec<CandidateTable> {
    TableLocator::new(prefix).locate(markup, keywords).into_tables()
}
