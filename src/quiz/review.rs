// src/quiz/review.rs

use crate::config::CONCEPT_BREAK;

pub const LOADING_PLACEHOLDER: &str = "Loading explanation...";

pub const REVIEW_APOLOGY: &str =
    "Oops! I couldn't get the review for your mistakes. Please try again later.";

/// Splits a batched review reply into per-question explanations.
///
/// Segments are trimmed and keep their position, so the `i`-th segment always
/// belongs to the `i`-th missed question. Only an empty segment after a
/// trailing delimiter is dropped.
pub fn split_review(reply: &str) -> Vec<String> {
    let mut segments: Vec<String> = reply
        .split(CONCEPT_BREAK)
        .map(|segment| segment.trim().to_string())
        .collect();
    if segments.len() > 1 && segments.last().is_some_and(String::is_empty) {
        segments.pop();
    }
    segments
}

/// Explanation for the `index`-th missed question, or the placeholder when the
/// reply came back short or left that slot blank.
pub fn explanation_at(explanations: &[String], index: usize) -> &str {
    explanations
        .get(index)
        .map(String::as_str)
        .filter(|explanation| !explanation.is_empty())
        .unwrap_or(LOADING_PLACEHOLDER)
}
