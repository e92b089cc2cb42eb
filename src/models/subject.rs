// src/models/subject.rs

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MATHS_TOPICS: [&str; 7] = [
    "Algebra",
    "Geometry",
    "Fractions",
    "Percentages",
    "Statistics",
    "Number Theory",
    "Probability",
];

pub const SCIENCE_TOPICS: [&str; 7] = [
    "Biology",
    "Chemistry",
    "Physics",
    "Earth Science",
    "Space",
    "Genetics",
    "Environmental Science",
];

/// Subject selected once per play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Maths,
    Science,
}

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::Maths, Subject::Science];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Maths => "Maths",
            Subject::Science => "Science",
        }
    }

    /// Fixed, ordered topic list offered for this subject.
    pub fn topics(&self) -> &'static [&'static str] {
        match self {
            Subject::Maths => &MATHS_TOPICS,
            Subject::Science => &SCIENCE_TOPICS,
        }
    }

    /// Returns the canonical topic name if `topic` belongs to this subject.
    pub fn find_topic(&self, topic: &str) -> Option<&'static str> {
        let topic = topic.trim();
        self.topics().iter().copied().find(|t| *t == topic)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Simple,
    Medium,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Simple, Difficulty::Medium, Difficulty::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Simple => "Simple",
            Difficulty::Medium => "Medium",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the UI needs to render the selection screens.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub subjects: Vec<SubjectCatalog>,
    pub difficulties: Vec<Difficulty>,
}

#[derive(Debug, Serialize)]
pub struct SubjectCatalog {
    pub subject: Subject,
    pub topics: Vec<&'static str>,
}

impl CatalogResponse {
    pub fn build() -> Self {
        Self {
            subjects: Subject::ALL
                .iter()
                .map(|subject| SubjectCatalog {
                    subject: *subject,
                    topics: subject.topics().to_vec(),
                })
                .collect(),
            difficulties: Difficulty::ALL.to_vec(),
        }
    }
}
