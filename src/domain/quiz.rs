//! Review quiz produced after the lecture is merged.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// First `[` through last `]`, across lines
static ARRAY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid quiz array regex"));

/// A four-option multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub options: [String; 4],
    /// 1-based index of the correct option
    pub answer_index: u8,
    pub explanation: String,
}

impl QuizItem {
    /// Text of the correct option; `None` when `answer_index` is outside 1..=4
    pub fn correct_option(&self) -> Option<&str> {
        let index = usize::from(self.answer_index).checked_sub(1)?;
        self.options.get(index).map(String::as_str)
    }

    /// Whether a picked option label ("2. ..." or "2") is the right answer
    pub fn is_correct(&self, picked: &str) -> bool {
        picked
            .split('.')
            .next()
            .and_then(|n| n.trim().parse::<u8>().ok())
            .is_some_and(|n| n == self.answer_index)
    }
}

/// Shape the language model is asked to produce
#[derive(Debug, Deserialize)]
struct RawQuizItem {
    question: String,
    options: Vec<String>,
    answer: serde_json::Value,
    #[serde(default)]
    explanation: String,
}

impl RawQuizItem {
    fn validate(self) -> Option<QuizItem> {
        let answer_index = match &self.answer {
            serde_json::Value::String(s) => s.trim().parse::<u8>().ok()?,
            serde_json::Value::Number(n) => u8::try_from(n.as_u64()?).ok()?,
            _ => return None,
        };
        if !(1..=4).contains(&answer_index) {
            return None;
        }
        let options: [String; 4] = self.options.try_into().ok()?;

        Some(QuizItem {
            question: self.question,
            options,
            answer_index,
            explanation: self.explanation,
        })
    }
}

/// Parse a model reply into quiz items.
///
/// The first `[...]` span of the reply is taken as a JSON array. An
/// unparsable reply yields an empty quiz; individually malformed items are
/// dropped.
pub fn parse_quiz(reply: &str) -> Vec<QuizItem> {
    let array = ARRAY_SPAN.find(reply).map_or("[]", |m| m.as_str());

    let raw: Vec<RawQuizItem> = match serde_json::from_str(array) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "Quiz reply is not valid JSON, dropping quiz");
            return Vec::new();
        }
    };

    let total = raw.len();
    let items: Vec<QuizItem> = raw.into_iter().filter_map(RawQuizItem::validate).collect();
    if items.len() < total {
        warn!(dropped = total - items.len(), "Dropped malformed quiz items");
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"Here is the quiz:
[
  {"question": "What is Rust?", "options": ["1. A language", "2. A fungus", "3. A car", "4. A game"], "answer": "1", "explanation": "It is a language."},
  {"question": "Bad", "options": ["1. a", "2. b"], "answer": "1"},
  {"question": "Range", "options": ["1. a", "2. b", "3. c", "4. d"], "answer": "5"}
]
Good luck!"#;

    #[test]
    fn test_parse_quiz_extracts_array_and_drops_invalid_items() {
        let quiz = parse_quiz(REPLY);
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].answer_index, 1);
        assert_eq!(quiz[0].correct_option(), Some("1. A language"));
    }

    #[test]
    fn test_parse_quiz_unparsable_is_empty() {
        assert!(parse_quiz("no json here").is_empty());
        assert!(parse_quiz("[{not json}]").is_empty());
    }

    #[test]
    fn test_numeric_answer_accepted() {
        let quiz = parse_quiz(
            r#"[{"question": "q", "options": ["a", "b", "c", "d"], "answer": 3, "explanation": ""}]"#,
        );
        assert_eq!(quiz[0].answer_index, 3);
        assert!(quiz[0].is_correct("3. c"));
        assert!(!quiz[0].is_correct("2. b"));
    }

    #[test]
    fn test_correct_option_out_of_range_is_none() {
        let mut item: QuizItem = serde_json::from_str(
            r#"{"question": "q", "options": ["a", "b", "c", "d"], "answer_index": 0, "explanation": ""}"#,
        )
        .unwrap();
        assert_eq!(item.correct_option(), None);

        item.answer_index = 5;
        assert_eq!(item.correct_option(), None);

        item.answer_index = 4;
        assert_eq!(item.correct_option(), Some("d"));
    }
}
