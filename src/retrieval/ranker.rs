//! Near-duplicate grouping and corroboration-based selection of search hits.
//!
//! Hits are clustered greedily by snippet similarity. A cluster backed by at
//! least two hits from at least two domains is "confirmed"; only confirmed
//! clusters feed the summaries unless none exist, in which case every hit is
//! used as-is.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Reference, RetrievalHit, Summary};

use super::text::{normalize_for_grouping, sequence_ratio};

/// Minimum normalized snippet similarity for two hits to share a group
pub const GROUP_SIMILARITY_THRESHOLD: f64 = 0.82;

/// A cluster of near-duplicate hits
#[derive(Debug, Clone)]
pub struct ResultGroup {
    /// Snippet of the hit that opened the group
    pub representative: String,
    normalized_rep: String,
    pub items: Vec<RetrievalHit>,
    /// Distinct non-empty domains, in first-seen order
    pub domains: Vec<String>,
}

impl ResultGroup {
    fn new(hit: RetrievalHit, normalized_rep: String) -> Self {
        let domains = if hit.domain.is_empty() {
            Vec::new()
        } else {
            vec![hit.domain.clone()]
        };
        Self {
            representative: hit.snippet.clone(),
            normalized_rep,
            items: vec![hit],
            domains,
        }
    }

    fn push(&mut self, hit: RetrievalHit) {
        if !hit.domain.is_empty() && !self.domains.contains(&hit.domain) {
            self.domains.push(hit.domain.clone());
        }
        self.items.push(hit);
    }

    /// Corroborated by at least two hits from at least two distinct domains
    pub fn is_confirmed(&self) -> bool {
        self.items.len() >= 2 && self.domains.len() >= 2
    }

    pub fn max_score(&self) -> f64 {
        self.items
            .iter()
            .map(|h| h.score)
            .fold(0.0, f64::max)
    }

    /// Highest-scoring member; ties keep the earliest
    pub fn top(&self) -> Option<&RetrievalHit> {
        self.items.iter().fold(None, |best: Option<&RetrievalHit>, h| match best {
            Some(b) if b.score >= h.score => Some(b),
            _ => Some(h),
        })
    }

    /// Highest-scoring member per domain, in first-seen domain order
    fn best_per_domain(&self) -> Vec<&RetrievalHit> {
        let mut picked: Vec<&RetrievalHit> = Vec::new();
        for hit in self.items.iter().filter(|h| !h.domain.is_empty()) {
            match picked.iter_mut().find(|p| p.domain == hit.domain) {
                Some(slot) if hit.score > slot.score => *slot = hit,
                Some(_) => {}
                None => picked.push(hit),
            }
        }
        picked
    }
}

/// Cluster hits greedily: each hit joins the first group whose
/// representative is similar enough, otherwise opens a new group.
///
/// Hits with empty snippets have nothing to compare and are not grouped.
pub fn group_hits(hits: &[RetrievalHit]) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();

    for hit in hits.iter().filter(|h| !h.snippet.is_empty()) {
        let normalized = normalize_for_grouping(&hit.snippet);
        match groups
            .iter_mut()
            .find(|g| sequence_ratio(&normalized, &g.normalized_rep) >= GROUP_SIMILARITY_THRESHOLD)
        {
            Some(group) => group.push(hit.clone()),
            None => groups.push(ResultGroup::new(hit.clone(), normalized)),
        }
    }

    groups
}

/// Summaries and references selected from a slide's hits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedContent {
    pub summaries: Vec<Summary>,
    pub references: Vec<Reference>,
    /// Whether the unfiltered fallback policy was used
    pub fallback: bool,
}

fn summary_of(hit: &RetrievalHit) -> Summary {
    Summary {
        text: hit.snippet.clone(),
        source: hit.title.clone(),
        score: hit.score,
    }
}

fn reference_of(hit: &RetrievalHit) -> Reference {
    Reference {
        title: hit.title.clone(),
        url: hit.url.clone(),
        score: hit.score,
    }
}

/// Rank one slide's hits into summaries and references
pub fn rank_hits(hits: &[RetrievalHit]) -> RankedContent {
    let mut confirmed: Vec<ResultGroup> = group_hits(hits)
        .into_iter()
        .filter(ResultGroup::is_confirmed)
        .collect();

    let mut ranked = if confirmed.is_empty() {
        debug!(hits = hits.len(), "No corroborated group, using all hits");
        RankedContent {
            summaries: hits
                .iter()
                .filter(|h| !h.snippet.is_empty())
                .map(summary_of)
                .collect(),
            // Fallback references keep every hit, duplicates by domain included
            references: hits.iter().map(reference_of).collect(),
            fallback: true,
        }
    } else {
        confirmed.sort_by(|a, b| b.max_score().total_cmp(&a.max_score()));

        let mut summaries = Vec::new();
        let mut references = Vec::new();
        let mut seen_domains: HashSet<&str> = HashSet::new();

        for group in &confirmed {
            if let Some(top) = group.top() {
                summaries.push(summary_of(top));
            }
            for hit in group.best_per_domain() {
                if seen_domains.insert(hit.domain.as_str()) {
                    references.push(reference_of(hit));
                }
            }
        }

        debug!(
            groups = confirmed.len(),
            summaries = summaries.len(),
            references = references.len(),
            "Selected corroborated content"
        );
        RankedContent {
            summaries,
            references,
            fallback: false,
        }
    };

    ranked.summaries.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.references.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
