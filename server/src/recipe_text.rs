//! Turns pasted recipe instructions into separate steps.

use std::sync::LazyLock;

use regex::Regex;

static NUMBERED_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.?\s+(.+)$").ok());

static BULLET_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*•]\s+(.+)$").ok());

static SENTENCE_END: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[.!?]+\s+").ok());

/// Texts at most this long are never split into sentences.
const SENTENCE_SPLIT_THRESHOLD: usize = 100;
/// Sentence fragments this short or shorter are dropped.
const MIN_SENTENCE_LEN: usize = 10;

/// Splits `text` into instructions.
///
/// The first layout that yields anything wins: numbered lines, bullet lines,
/// paragraphs, plain lines, then sentences for long single blocks. Text with
/// none of those becomes a single step. Blank input gives no steps.
pub fn parse_steps(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return vec![];
    }

    let strategies: [fn(&str) -> Vec<String>; 5] = [
        |t| list_items(NUMBERED_LINE.as_ref(), t),
        |t| list_items(BULLET_LINE.as_ref(), t),
        paragraphs,
        lines,
        sentences,
    ];

    strategies
        .iter()
        .map(|strategy| strategy(text))
        .find(|steps| !steps.is_empty())
        .unwrap_or_else(|| vec![text.to_string()])
}

fn list_items(pattern: Option<&Regex>, text: &str) -> Vec<String> {
    let Some(pattern) = pattern else {
        return vec![];
    };

    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn paragraphs(text: &str) -> Vec<String> {
    if !text.contains("\n\n") {
        return vec![];
    }

    non_empty(text.split("\n\n"))
}

fn lines(text: &str) -> Vec<String> {
    if !text.contains('\n') {
        return vec![];
    }

    non_empty(text.split('\n'))
}

fn sentences(text: &str) -> Vec<String> {
    let Some(pattern) = SENTENCE_END.as_ref() else {
        return vec![];
    };
    if text.len() <= SENTENCE_SPLIT_THRESHOLD {
        return vec![];
    }

    pattern
        .split(text)
        .map(str::trim)
        .filter(|sentence| sentence.len() > MIN_SENTENCE_LEN)
        .map(|sentence| {
            if sentence.ends_with(['.', '!', '?']) {
                sentence.to_string()
            } else {
                format!("{sentence}.")
            }
        })
        .collect()
}

fn non_empty<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    parts
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
