// src/models/transcript.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One exchange in the dialogue. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Append-only sequence of turns for the current play-through.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent model turn matching `is_question`, newest first.
    pub fn last_model_turn_where(&self, is_question: impl Fn(&str) -> bool) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .filter(|turn| turn.role == Role::Model)
            .map(|turn| turn.text.as_str())
            .find(|text| is_question(text))
    }
}

/// Distinct missed question texts in the order they were first missed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MistakeSet {
    questions: Vec<String>,
}

impl MistakeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts by exact string. Returns false when the question is already recorded.
    pub fn insert(&mut self, question: &str) -> bool {
        if self.questions.iter().any(|q| q == question) {
            return false;
        }
        self.questions.push(question.to_string());
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
