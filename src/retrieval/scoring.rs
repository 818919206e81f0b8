//! Hit scoring: query similarity, domain trust and content richness.
//!
//! `score = 0.5 * similarity + 0.3 * domain_trust + 0.2 * content`, each
//! component in [0, 1].

use std::collections::HashSet;

use crate::domain::{RetrievalHit, ScoreDetail};

use super::text::{char_len, normalize_for_match, sequence_ratio};

pub const SIMILARITY_WEIGHT: f64 = 0.5;
pub const DOMAIN_WEIGHT: f64 = 0.3;
pub const CONTENT_WEIGHT: f64 = 0.2;

/// Snippet length at which content richness saturates
pub const CONTENT_SATURATION_CHARS: usize = 400;

/// Curated domain reliability, matched by substring against the hit domain.
///
/// The longest matching pattern wins; on equal length the earlier entry wins.
pub const DOMAIN_TRUST: &[(&str, f64)] = &[
    // official documentation / references
    ("microsoft.com", 0.95),
    ("learn.microsoft.com", 0.98),
    ("docs.python.org", 0.98),
    ("wikipedia.org", 0.9),
    ("mozilla.org", 0.9),
    // portals, news and engineering blogs
    ("naver.com", 0.8),
    ("cloud.naver.com", 0.9),
    ("daum.net", 0.75),
    ("kakao.com", 0.8),
    ("tech.ebay.com", 0.85),
];

/// Domains never used as sources
pub const DEFAULT_EXCLUDED_DOMAINS: &[&str] = &[
    "blog.naver.com",
    "m.blog.naver.com",
    "tistory.com",
    "brunch.co.kr",
    "medium.com",
    "velog.io",
    "kin.naver.com",
    "reddit.com",
    "youtube.com",
];

/// Query/snippet similarity: mean of token overlap and sequence ratio
pub fn similarity_score(query: &str, snippet: &str) -> f64 {
    let q = normalize_for_match(query);
    let t = normalize_for_match(snippet);
    if q.is_empty() || t.is_empty() {
        return 0.0;
    }

    let q_tokens: HashSet<&str> = q.split(' ').collect();
    let t_tokens: HashSet<&str> = t.split(' ').collect();
    let overlap = q_tokens.intersection(&t_tokens).count() as f64 / q_tokens.len() as f64;

    (overlap + sequence_ratio(&q, &t)) / 2.0
}

/// Trust for a domain from an explicit pattern table
pub fn domain_trust_with(table: &[(&str, f64)], domain: &str) -> f64 {
    let domain = domain.to_lowercase();
    if domain.is_empty() {
        return 0.4;
    }

    let mut best: Option<(usize, f64)> = None;
    for &(pattern, trust) in table {
        if domain.contains(pattern) && best.map_or(true, |(len, _)| pattern.len() > len) {
            best = Some((pattern.len(), trust));
        }
    }
    if let Some((_, trust)) = best {
        return trust;
    }

    // Unknown domains: longer (more specific) hosts get slightly more trust
    let adj = (domain.len() as f64 / 50.0).min(0.15);
    (0.5 + adj).clamp(0.45, 0.65)
}

pub fn domain_trust(domain: &str) -> f64 {
    domain_trust_with(DOMAIN_TRUST, domain)
}

/// Content richness from snippet length, floored at 0.1 for non-empty snippets
pub fn content_score(snippet: &str) -> f64 {
    if snippet.is_empty() {
        return 0.0;
    }
    let n = char_len(snippet) as f64;
    (n / CONTENT_SATURATION_CHARS as f64).min(1.0).max(0.1)
}

pub fn combined_score(detail: &ScoreDetail) -> f64 {
    SIMILARITY_WEIGHT * detail.similarity
        + DOMAIN_WEIGHT * detail.domain_trust
        + CONTENT_WEIGHT * detail.content
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Host part of a URL, empty if it cannot be parsed
pub fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

pub fn is_excluded(domain: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|ex| domain.contains(ex.as_str()))
}

/// Score one raw search result against the query that found it
pub fn score_hit(query: &str, title: &str, url: &str, snippet: &str) -> RetrievalHit {
    let domain = domain_of(url);
    let detail = ScoreDetail {
        similarity: similarity_score(query, snippet),
        domain_trust: domain_trust(&domain),
        content: content_score(snippet),
    };
    let score = combined_score(&detail);

    RetrievalHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
        domain,
        score: round4(score),
        score_detail: ScoreDetail {
            similarity: round4(detail.similarity),
            domain_trust: round4(detail.domain_trust),
            content: round4(detail.content),
        },
    }
}
