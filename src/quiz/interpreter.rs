// src/quiz/interpreter.rs

//! Marker parsing for model replies.
//!
//! The model signals scoring and completion by embedding bracketed tokens in
//! free text. All knowledge of those tokens lives here.

use std::sync::LazyLock;

use regex::Regex;

static SCORE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[TOTAL_SCORE:\s*(\d+)\]").expect("valid score regex"));

static QUESTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Question \d{1,2}/10:").expect("valid question regex"));

static QUESTION_PREFIX_WITH_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Question \d{1,2}/10: ").expect("valid question regex"));

pub const COMPLETE_MARKER: &str = "[QUIZ_COMPLETE]";

/// Result of interpreting one raw model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretedTurn {
    /// Reply text with all markers removed and surrounding whitespace trimmed.
    pub display_text: String,
    /// Absolute total reported by the model, if the reply carried a score marker.
    pub score_update: Option<u32>,
    pub is_terminal: bool,
    /// Question the learner just missed. Set only for incorrect-answer turns
    /// that follow a question announcement.
    pub missed_question: Option<String>,
}

impl InterpretedTurn {
    /// Neither marker was present: the just-graded answer was wrong
    /// (or this is the opening greeting).
    pub fn is_incorrect(&self) -> bool {
        self.score_update.is_none() && !self.is_terminal
    }
}

/// Whether a model turn announces a question (`Question N/10:` at the very start).
pub fn is_question_announcement(text: &str) -> bool {
    QUESTION_PREFIX.is_match(text)
}

/// Removes a leading `Question N/10: ` so only the question itself remains.
pub fn strip_question_prefix(text: &str) -> &str {
    match QUESTION_PREFIX_WITH_SPACE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Parses a raw model reply for score and completion markers.
///
/// `preceding_question` is the most recent question announcement in the
/// transcript; it is reported back as `missed_question` when the reply carries
/// no marker at all.
pub fn interpret(raw_text: &str, preceding_question: Option<&str>) -> InterpretedTurn {
    let mut score_marker_seen = false;
    let mut score_update = None;

    // Last marker in the text wins if the model repeats it.
    for caps in SCORE_MARKER.captures_iter(raw_text) {
        score_marker_seen = true;
        match caps[1].parse::<u32>() {
            Ok(score) => score_update = Some(score),
            Err(e) => tracing::warn!("Unparseable score marker {:?}: {}", &caps[0], e),
        }
    }

    let mut display_text = SCORE_MARKER.replace_all(raw_text, "").into_owned();

    let is_terminal = display_text.contains(COMPLETE_MARKER);
    if is_terminal {
        display_text = display_text.replace(COMPLETE_MARKER, "");
    }

    let display_text = display_text.trim().to_string();

    let missed_question = if !score_marker_seen && !is_terminal {
        preceding_question.map(str::to_string)
    } else {
        None
    };

    InterpretedTurn {
        display_text,
        score_update,
        is_terminal,
        missed_question,
    }
}
