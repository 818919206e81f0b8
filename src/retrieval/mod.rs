//! Retrieval: turning noisy web search results into trustworthy,
//! budget-bounded supplementary content for a slide.
//!
//! - `query`: search queries formed from slide fields
//! - `scoring`: similarity / domain trust / content richness
//! - `ranker`: near-duplicate grouping and corroboration-based selection
//! - `budget`: character-budgeted prompt block assembly

pub mod budget;
pub mod query;
pub mod ranker;
pub mod scoring;
pub mod text;

use std::collections::HashSet;

use crate::domain::{ExternalContentBundle, RetrievalHit, SearchQuery};

pub use budget::{build_query_block, build_reference_block, build_summary_block, PromptBudget};
pub use query::plan_queries;
pub use ranker::{group_hits, rank_hits, RankedContent, ResultGroup, GROUP_SIMILARITY_THRESHOLD};
pub use scoring::{score_hit, DEFAULT_EXCLUDED_DOMAINS, DOMAIN_TRUST};

/// Drop hits whose URL was already seen, keeping the first occurrence
pub fn dedup_by_url(hits: Vec<RetrievalHit>) -> Vec<RetrievalHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| !h.url.is_empty() && seen.insert(h.url.clone()))
        .collect()
}

/// Build the content bundle for one slide from its queries and gathered hits
pub fn build_bundle(queries: Vec<SearchQuery>, hits: &[RetrievalHit]) -> ExternalContentBundle {
    let ranked = rank_hits(hits);
    ExternalContentBundle {
        queries,
        summaries: ranked.summaries,
        references: ranked.references,
    }
}
