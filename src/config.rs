// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Number of questions in one play-through.
pub const QUESTION_COUNT: u32 = 10;

/// Points awarded per correctly answered question.
pub const POINTS_PER_CORRECT: u32 = 10;

/// Key of the single progress record in the key-value store.
pub const PROGRESS_KEY: &str = "aceinbase_progress";

/// Delimiter line the review reply uses between explanations.
pub const CONCEPT_BREAK: &str = "---CONCEPT_BREAK---";

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_REVIEW_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// How often the registry is swept for idle play-throughs.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Missing key is not fatal at start-up; opening a quiz session reports it instead.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Url,
    pub chat_model: String,
    pub review_model: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Play-throughs untouched for this long are dropped from memory.
    pub quiz_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://aceinbase.db?mode=rwc".to_string());

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
        let gemini_base_url =
            Url::parse(&gemini_base_url).expect("GEMINI_BASE_URL must be a valid URL");

        let chat_model =
            env::var("GEMINI_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());

        let review_model =
            env::var("GEMINI_REVIEW_MODEL").unwrap_or_else(|_| DEFAULT_REVIEW_MODEL.to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("BIND_ADDR must be a socket address like 0.0.0.0:3000");

        let quiz_idle_ttl = env::var("QUIZ_IDLE_TTL_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30 * 60));

        Self {
            database_url,
            gemini_api_key,
            gemini_base_url,
            chat_model,
            review_model,
            rust_log,
            bind_addr,
            quiz_idle_ttl,
        }
    }
}
