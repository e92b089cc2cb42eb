// src/quiz/session.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::QuizError,
    models::{
        subject::{Difficulty, Subject},
        transcript::Turn,
    },
    quiz::prompt::build_system_prompt,
};

/// Opaque text-completion service.
///
/// Implementations report every transport or provider failure as
/// `QuizError::Provider`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Multi-turn chat: `history` ends with the user message to answer.
    async fn chat(&self, system_instruction: &str, history: &[Turn]) -> Result<String, QuizError>;

    /// Single-shot generation with no conversation state.
    async fn generate(&self, prompt: &str) -> Result<String, QuizError>;
}

pub type SharedModel = Arc<dyn LanguageModel>;

/// One open dialogue with the model.
struct ActiveChat {
    system_instruction: String,
    /// Raw exchanges as the provider saw them, markers included.
    history: Vec<Turn>,
}

/// Owner of the single active dialogue for one play-through.
///
/// Opening a new dialogue silently replaces the previous one.
pub struct ConversationSession {
    model: Option<SharedModel>,
    active: Option<ActiveChat>,
}

impl ConversationSession {
    /// `model` is `None` when the provider could not be initialized.
    pub fn new(model: Option<SharedModel>) -> Self {
        Self {
            model,
            active: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Builds the system prompt and starts a fresh dialogue.
    pub fn open(
        &mut self,
        subject: Subject,
        difficulty: Difficulty,
        topic: &str,
    ) -> Result<(), QuizError> {
        if self.model.is_none() {
            return Err(QuizError::Initialization(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }

        if self.active.is_some() {
            tracing::debug!("Discarding previous chat session");
        }

        self.active = Some(ActiveChat {
            system_instruction: build_system_prompt(subject, difficulty, topic),
            history: Vec::new(),
        });
        tracing::info!(%subject, %difficulty, topic, "Chat session opened");
        Ok(())
    }

    /// Drops the active dialogue, if any.
    pub fn close(&mut self) {
        self.active = None;
    }

    /// Sends one user message and waits for the raw model reply.
    ///
    /// The exchange is only recorded once the reply arrives, so a failed call
    /// leaves the dialogue exactly as it was.
    pub async fn send(&mut self, user_text: &str) -> Result<String, QuizError> {
        let (Some(model), Some(chat)) = (self.model.as_ref(), self.active.as_mut()) else {
            return Err(QuizError::NotInitialized);
        };

        let mut history = chat.history.clone();
        history.push(Turn::user(user_text));

        let reply = model.chat(&chat.system_instruction, &history).await?;

        history.push(Turn::model(reply.clone()));
        chat.history = history;
        Ok(reply)
    }

    /// One-off request outside the dialogue (used for the review pass).
    pub async fn generate(&self, prompt: &str) -> Result<String, QuizError> {
        let model = self.model.as_ref().ok_or_else(|| {
            QuizError::Initialization("GEMINI_API_KEY is not configured".to_string())
        })?;
        model.generate(prompt).await
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self) -> usize {
        self.active.as_ref().map_or(0, |chat| chat.history.len())
    }
}
