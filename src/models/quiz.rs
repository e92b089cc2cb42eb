// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{
        subject::{Difficulty, Subject},
        transcript::Turn,
    },
    quiz::flow::Screen,
};

/// DTO for starting a new play-through.
#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    pub subject: Subject,
}

#[derive(Debug, Deserialize)]
pub struct ChooseDifficultyRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChooseTopicRequest {
    #[validate(length(min = 1, max = 64))]
    pub topic: String,
}

/// DTO for a learner's chat message.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(custom(function = validate_message_text))]
    pub text: String,
}

fn validate_message_text(text: &str) -> Result<(), validator::ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(validator::ValidationError::new("message_cannot_be_empty"));
    }
    if trimmed.chars().count() > 2000 {
        return Err(validator::ValidationError::new("message_too_long"));
    }
    Ok(())
}

/// A missed question paired with its explanation for the review screen.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    /// Question text with the `Question N/10: ` prefix removed.
    pub question: String,
    pub explanation: String,
}

/// Everything the client needs to render the current screen of a play-through.
#[derive(Debug, Serialize)]
pub struct QuizSnapshot {
    pub id: Uuid,
    pub subject: Subject,
    pub screen: Screen,
    pub difficulty: Option<Difficulty>,
    pub topic: Option<String>,
    pub score: u32,
    pub transcript: Vec<Turn>,
    pub mistakes: Vec<String>,
    pub can_review: bool,
    pub review: Vec<ReviewItem>,
}
