//! Prompt construction for the language-model stages, and cleanup of the
//! narration the model returns.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::SlidePosition;
use crate::retrieval::text::clean_text;
use crate::retrieval::{build_query_block, build_reference_block};

use super::{ContentRequest, NarrationRequest};

pub const CONTENT_SYSTEM_PROMPT: &str = "You are an expert instructor. From a slide's text, \
images, tables and charts you write lecture content, supplemented with trustworthy external \
material.";

pub const NARRATION_SYSTEM_PROMPT: &str = "You are a professional lecturer who turns page content \
into a natural spoken script. Write speech, not prose to be read. Keep the flow between slides \
unbroken, explain technical points with simple analogies and address the audience directly. Do \
not repeat what earlier slides already covered beyond a brief reminder.";

pub const QUIZ_SYSTEM_PROMPT: &str = "You write educational quizzes. From the full lecture script, \
produce four-option multiple-choice questions as JSON that test the learner's understanding.";

pub const SCRIPT_START: &str = "[SCRIPT START]";
pub const SCRIPT_END: &str = "[SCRIPT END]";

/// Transition phrases that make narration sound like slide reading
const BANNED_PHRASES: &[&str] = &[
    "on this slide",
    "in this slide",
    "as you can see on the slide",
    "on the next slide",
    "moving on to the next",
    "in this lecture",
];

const MAX_TABLE_ROWS: usize = 6;

static REPEATED_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid space regex"));
static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// First table rendered as `a | b | c` rows, at most six rows
fn table_text(request: &ContentRequest<'_>) -> String {
    request
        .slide
        .table_rows
        .first()
        .map(|table| {
            table
                .iter()
                .take(MAX_TABLE_ROWS)
                .map(|row| row.join(" | "))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

fn or_placeholder(block: &str, placeholder: &str) -> String {
    if block.is_empty() {
        placeholder.to_string()
    } else {
        block.to_string()
    }
}

/// User prompt for page-content synthesis
pub fn content_prompt(request: &ContentRequest<'_>) -> String {
    let slide = request.slide;
    let settings = request.settings;
    let query_block = build_query_block(&request.bundle.queries);
    let reference_block = build_reference_block(request.bundle);

    format!(
        "Below is one slide and supplementary external material.\n\
         Title: {title}\n\
         ---\n\
         [Text]\n{text}\n\n\
         [Table (first {rows} rows)]\n{table}\n\n\
         [Shape text]\n{shapes}\n\n\
         [Guidance]\ntone: {tone}; style: {style}\n\
         ---\n\
         How to read each element:\n\
         - Text: key terms, core sentences, emphasized concepts.\n\
         - Tables: comparison criteria and where items differ.\n\
         - Charts: trends, rising and falling ranges, relations between axes.\n\
         - Images: key text, main objects and their relations.\n\
         - Code: the input, processing and output flow and its purpose.\n\
         ---\n\
         [External material]\n\
         - Queries: {queries}\n\
         - Key supplementary summaries:\n{summaries}\n\
         - References:\n{references}\n\
         ---\n\
         Rules:\n\
         1) No exaggeration; summarize objectively.\n\
         2) 4 to 6 sentences as a paragraph, no bullet points.\n\
         3) Weave the meaning of images, tables and shapes into the explanation.\n\
         4) Use only the essentials of the external material and cite sources as bracketed numbers, e.g. [1][2].\n",
        title = clean_text(&slide.title),
        text = clean_text(&slide.body_text),
        rows = MAX_TABLE_ROWS,
        table = table_text(request),
        shapes = slide.shape_texts.join(" / "),
        tone = settings.tone,
        style = settings.style,
        queries = or_placeholder(&query_block, "(no queries)"),
        summaries = or_placeholder(request.summary_block, "(no summaries)"),
        references = or_placeholder(&reference_block, "(no references)"),
    )
}

fn flow_instruction(title: &str, position: SlidePosition) -> String {
    match position {
        SlidePosition::First => format!(
            "This is the first slide of the lecture. The first sentence must open the lecture by \
             naming the slide title, for example \"Let's explore {} together.\" Never greet the \
             audience; only convey that the lecture is starting.",
            title
        ),
        SlidePosition::Last => "This is the last slide. Wrap up the lecture briefly, restate the \
             key message and close naturally. Only here may you use a closing greeting."
            .to_string(),
        SlidePosition::Middle => "This is a middle slide. Open with one sentence that connects \
             naturally to the previous slide, without announcing the slide itself."
            .to_string(),
    }
}

/// User prompt for the narration script
pub fn narration_prompt(request: &NarrationRequest<'_>) -> String {
    let title = request
        .titles
        .get(request.slide_index)
        .filter(|t| !t.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| format!("Slide {}", request.slide_index + 1));

    let page_content = clean_text(request.page_content);
    let page_content = if page_content.is_empty() {
        format!(
            "This slide explains the core concepts of {}. Write a basic lecture script from its main points.",
            title
        )
    } else {
        page_content
    };

    let settings = request.settings;
    let (chars_min, chars_max, sent_min, sent_max) = settings.length_guide();
    let position = SlidePosition::of(request.slide_index, request.total);

    format!(
        "# Lecture outline\n{outline}\n\n\
         # Current slide\n- index: {index}\n- title: {title}\n\n\
         # Previous script\n{previous}\n\n\
         # Page content\n{page_content}\n\n\
         # Requirements\n\
         1) Tone: {tone}; style: {style}\n\
         2) Target length: about {secs} seconds ({chars_min} to {chars_max} characters, {sent_min} to {sent_max} sentences)\n\
         3) Position rule: {flow}\n\
         4) Rewrite the page content in a spoken lecture voice.\n\
         5) Never say: {banned}.\n\n\
         # Output format (mandatory)\n{start}\nthe script only\n{end}\n",
        outline = request.titles.join(" | "),
        index = request.slide_index,
        title = title,
        previous = request.previous_script.unwrap_or("(none, this is the first slide)"),
        page_content = page_content,
        tone = settings.tone,
        style = settings.style,
        secs = settings.target_duration_sec,
        chars_min = chars_min,
        chars_max = chars_max,
        sent_min = sent_min,
        sent_max = sent_max,
        flow = flow_instruction(&title, position),
        banned = BANNED_PHRASES
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", "),
        start = SCRIPT_START,
        end = SCRIPT_END,
    )
}

/// User prompt for the review quiz
pub fn quiz_prompt(scripts: &[String]) -> String {
    let full_script = scripts
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[Slide {}]\n{}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Here is the full lecture script:\n\n{}\n\n\
         Rules:\n\
         1. Write at least 10 questions.\n\
         2. Each question is a JSON object with four options formatted \"1. ...\", \"2. ...\", \"3. ...\", \"4. ...\".\n\
         3. \"answer\" holds only the number of the correct option as a string: \"1\", \"2\", \"3\" or \"4\".\n\
         4. Spread correct answers evenly over 1 to 4 and never repeat the same answer twice in a row.\n\n\
         Format:\n\
         [\n  {{\"question\": \"...\", \"options\": [\"1. ...\", \"2. ...\", \"3. ...\", \"4. ...\"], \"answer\": \"2\", \"explanation\": \"...\"}}\n]\n",
        full_script
    )
}

/// Extract and clean the narration from a model reply.
///
/// The text between the script markers is used (the whole reply when the
/// markers are missing), lines containing banned phrases are dropped and
/// whitespace is tidied.
pub fn clean_script(raw: &str) -> String {
    let body = match (raw.find(SCRIPT_START), raw.find(SCRIPT_END)) {
        (Some(start), Some(_)) => {
            let after = &raw[start + SCRIPT_START.len()..];
            after.split(SCRIPT_END).next().unwrap_or(after)
        }
        _ => raw,
    };

    let kept: Vec<&str> = body
        .trim()
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            !BANNED_PHRASES.iter().any(|p| lower.contains(p))
        })
        .collect();
    let script = kept.join("\n");

    let script = REPEATED_SPACES.replace_all(&script, " ");
    let script = BLANK_LINE_RUNS.replace_all(&script, "\n\n");
    script.trim().to_string()
}
