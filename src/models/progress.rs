// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::subject::{Difficulty, Subject};

/// One completed play-through. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttemptRecord {
    pub difficulty: Difficulty,
    pub topic: String,
    pub score: u32,
    /// Completion time, milliseconds since the Unix epoch.
    pub date: i64,
}

impl QuizAttemptRecord {
    pub fn new(difficulty: Difficulty, topic: &str, score: u32, completed_at: DateTime<Utc>) -> Self {
        Self {
            difficulty,
            topic: topic.to_string(),
            score,
            date: completed_at.timestamp_millis(),
        }
    }
}

/// Per-subject attempt history. This is the only durable entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressData {
    #[serde(rename = "Maths", default)]
    pub maths: Vec<QuizAttemptRecord>,
    #[serde(rename = "Science", default)]
    pub science: Vec<QuizAttemptRecord>,
}

impl ProgressData {
    pub fn attempts(&self, subject: Subject) -> &[QuizAttemptRecord] {
        match subject {
            Subject::Maths => &self.maths,
            Subject::Science => &self.science,
        }
    }

    pub fn push(&mut self, subject: Subject, record: QuizAttemptRecord) {
        match subject {
            Subject::Maths => self.maths.push(record),
            Subject::Science => self.science.push(record),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.maths.is_empty() && self.science.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn of(score: u32) -> Self {
        if score >= 70 {
            ScoreBand::High
        } else if score >= 40 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    #[serde(flatten)]
    pub record: QuizAttemptRecord,
    pub band: ScoreBand,
}

#[derive(Debug, Serialize)]
pub struct SubjectSummary {
    pub subject: Subject,
    pub attempts: usize,
    pub average_score: u32,
    pub best_score: u32,
    pub history: Vec<AttemptView>,
}

impl SubjectSummary {
    pub fn from_attempts(subject: Subject, attempts: &[QuizAttemptRecord]) -> Self {
        let total: u64 = attempts.iter().map(|a| u64::from(a.score)).sum();
        let average_score = if attempts.is_empty() {
            0
        } else {
            (total as f64 / attempts.len() as f64).round() as u32
        };

        Self {
            subject,
            attempts: attempts.len(),
            average_score,
            best_score: attempts.iter().map(|a| a.score).max().unwrap_or(0),
            history: attempts
                .iter()
                .cloned()
                .map(|record| AttemptView {
                    band: ScoreBand::of(record.score),
                    record,
                })
                .collect(),
        }
    }
}

/// Dashboard payload: raw progress plus per-subject statistics.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub progress: ProgressData,
    pub summaries: Vec<SubjectSummary>,
}

impl DashboardResponse {
    pub fn from_progress(progress: ProgressData) -> Self {
        let summaries = Subject::ALL
            .iter()
            .map(|subject| SubjectSummary::from_attempts(*subject, progress.attempts(*subject)))
            .collect();
        Self {
            progress,
            summaries,
        }
    }
}
