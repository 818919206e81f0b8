//! Character-budgeted supplementary block for content-synthesis prompts.

use serde::{Deserialize, Serialize};

use crate::domain::{ExternalContentBundle, SearchQuery, Summary};

use super::text::{char_len, clean_text, truncate_chars};

/// Limits for the supplementary block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBudget {
    /// Top summaries (by score) to draw from
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Chunks emitted per summary
    #[serde(default = "default_max_chunks_per_source")]
    pub max_chunks_per_source: usize,

    /// Hard ceiling on the whole block, in characters
    #[serde(default = "default_max_total_chars")]
    pub max_total_chars: usize,

    /// Maximum characters per chunk
    #[serde(default = "default_chunk_len")]
    pub chunk_len: usize,
}

fn default_max_sources() -> usize {
    3
}
fn default_max_chunks_per_source() -> usize {
    2
}
fn default_max_total_chars() -> usize {
    1500
}
fn default_chunk_len() -> usize {
    220
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            max_chunks_per_source: default_max_chunks_per_source(),
            max_total_chars: default_max_total_chars(),
            chunk_len: default_chunk_len(),
        }
    }
}

/// Split text after `.`, `!` or `?` followed by whitespace
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_terminal = false;

    for (idx, c) in text.char_indices() {
        if prev_terminal && c.is_whitespace() {
            sentences.push(&text[start..idx]);
            start = idx;
        }
        prev_terminal = matches!(c, '.' | '!' | '?');
    }
    sentences.push(&text[start..]);
    sentences
}

/// Break an over-long sentence into pieces of at most `max_len` characters,
/// preferring the last whitespace before the limit.
fn split_long(sentence: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = sentence.trim();

    while char_len(rest) > max_len {
        let head = truncate_chars(rest, max_len);
        let cut = match head.rfind(char::is_whitespace) {
            Some(ws) if ws > 0 => ws,
            _ => head.len(),
        };
        pieces.push(rest[..cut].trim().to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Group sentences into chunks of at most `max_len` characters
pub fn split_text_to_chunks(text: &str, max_len: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut buf = String::new();

    for sentence in split_sentences(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        for piece in split_long(sentence, max_len) {
            if buf.is_empty() {
                buf = piece;
            } else if char_len(&buf) + char_len(&piece) + 1 > max_len {
                chunks.push(std::mem::replace(&mut buf, piece));
            } else {
                buf.push(' ');
                buf.push_str(&piece);
            }
        }
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

/// Assemble the `[source] chunk` block from the best summaries.
///
/// Stops as soon as the next line would push the block past
/// `max_total_chars`; whatever was accumulated is returned.
pub fn build_summary_block(summaries: &[Summary], budget: &PromptBudget) -> String {
    let mut sorted: Vec<&Summary> = summaries.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut lines: Vec<String> = Vec::new();
    let mut total_len = 0;

    for summary in sorted.into_iter().take(budget.max_sources) {
        let source = clean_text(&summary.source);
        let text = clean_text(&summary.text);
        if text.is_empty() {
            continue;
        }

        for chunk in split_text_to_chunks(&text, budget.chunk_len)
            .into_iter()
            .take(budget.max_chunks_per_source)
        {
            let line = format!("[{}] {}", source, chunk);
            let line_len = char_len(&line);
            if total_len + line_len + 1 > budget.max_total_chars {
                return lines.join("\n");
            }
            total_len += line_len + 1;
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// `context: text` for the first three queries, each shortened to 40 characters
pub fn build_query_block(queries: &[SearchQuery]) -> String {
    queries
        .iter()
        .take(3)
        .map(|q| {
            let text = clean_text(&q.text);
            let mut short = truncate_chars(&text, 40).to_string();
            if !short.is_empty() && char_len(&q.text) > 40 {
                short.push_str("...");
            }
            format!("{}: {}", q.context, short)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Numbered citation list of the four best references
pub fn build_reference_block(bundle: &ExternalContentBundle) -> String {
    let mut refs: Vec<_> = bundle.references.iter().collect();
    refs.sort_by(|a, b| b.score.total_cmp(&a.score));

    refs.into_iter()
        .take(4)
        .enumerate()
        .map(|(i, r)| {
            let title = clean_text(&r.title);
            format!("[{}] {} — {}", i + 1, truncate_chars(&title, 100), r.url)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
