// src/services/gemini.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::Config,
    error::QuizError,
    models::transcript::{Role, Turn},
    quiz::session::LanguageModel,
};

// ---- Gemini REST structures ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

// ---- Client ----

/// `generateContent` client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: Url,
    chat_model: String,
    review_model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Url,
        chat_model: impl Into<String>,
        review_model: impl Into<String>,
    ) -> Result<Self, QuizError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| QuizError::Initialization(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url,
            chat_model: chat_model.into(),
            review_model: review_model.into(),
        })
    }

    /// Fails with `Initialization` when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, QuizError> {
        let api_key = config.gemini_api_key.clone().ok_or_else(|| {
            QuizError::Initialization("GEMINI_API_KEY is not set".to_string())
        })?;
        Self::new(
            api_key,
            config.gemini_base_url.clone(),
            config.chat_model.clone(),
            config.review_model.clone(),
        )
    }

    fn endpoint(&self, model: &str) -> Result<Url, QuizError> {
        self.base_url
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|e| QuizError::Initialization(format!("invalid Gemini endpoint: {e}")))
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<String, QuizError> {
        let url = self.endpoint(model)?;
        tracing::debug!(model, turns = request.contents.len(), "Sending generateContent request");

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach Gemini: {:?}", e);
                QuizError::Provider(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("could not read error body: {e}"));
            tracing::error!("Gemini request failed with status {}: {}", status, body);
            return Err(QuizError::Provider(format!("Gemini returned {status}")));
        }

        let body: GenerateContentResponse = response.json().await?;
        body.into_text()
            .ok_or_else(|| QuizError::Provider("Gemini reply contained no text".to_string()))
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn chat(&self, system_instruction: &str, history: &[Turn]) -> Result<String, QuizError> {
        let request = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction,
                }],
            }),
            contents: history
                .iter()
                .map(|turn| Content {
                    role: Some(wire_role(turn.role)),
                    parts: vec![Part { text: &turn.text }],
                })
                .collect(),
        };
        self.generate_content(&self.chat_model, &request).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, QuizError> {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
        };
        self.generate_content(&self.review_model, &request).await
    }
}
