// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use aceinbase::{
    config::Config,
    error::QuizError,
    models::transcript::Turn,
    quiz::session::{LanguageModel, SharedModel},
    routes,
    services::progress::{ProgressStore, SqliteStore},
    state::AppState,
};
use async_trait::async_trait;
use tokio::sync::Notify;

/// Lets a test hold a chat call open until it decides to release it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Language model that replays canned replies in order.
/// `Err` entries simulate provider outages.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    review: Mutex<Result<String, String>>,
    pub review_prompts: Mutex<Vec<String>>,
    gate: Option<Arc<Gate>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            review: Mutex::new(Err("no review scripted".to_string())),
            review_prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_review(self, review: Result<&str, &str>) -> Self {
        *self.review.lock().unwrap() = review.map(str::to_string).map_err(str::to_string);
        self
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn chat(&self, _system: &str, _history: &[Turn]) -> Result<String, QuizError> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err("script exhausted".to_string()))
            .map_err(QuizError::Provider)
    }

    async fn generate(&self, prompt: &str) -> Result<String, QuizError> {
        self.review_prompts.lock().unwrap().push(prompt.to_string());
        self.review
            .lock()
            .unwrap()
            .clone()
            .map_err(QuizError::Provider)
    }
}

/// Greeting plus the replies to ten answers. `wrong` lists the 1-based
/// question numbers the learner gets wrong.
pub fn ten_question_script(wrong: &[u32]) -> Vec<Result<String, String>> {
    let mut script = vec![Ok(
        "Question 1/10: Welcome! What is 3 + 4?".to_string()
    )];
    let mut score = 0;
    for n in 1..=10 {
        let correct = !wrong.contains(&n);
        if correct {
            score += 10;
        }
        let reply = match (n, correct) {
            (10, true) => format!("What a star! Final score {score}/100. [TOTAL_SCORE: {score}]\n[QUIZ_COMPLETE]"),
            (10, false) => format!("All done! Final score {score}/100. [QUIZ_COMPLETE]"),
            (_, true) => format!("Question {}/10: Solve for item {}. [TOTAL_SCORE: {score}]", n + 1, n + 1),
            (_, false) => format!("Question {}/10: Solve for item {}.", n + 1, n + 1),
        };
        script.push(Ok(reply));
    }
    script
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        gemini_api_key: Some("test-key".to_string()),
        gemini_base_url: url::Url::parse("http://127.0.0.1:9").unwrap(),
        chat_model: "gemini-2.5-pro".to_string(),
        review_model: "gemini-2.5-flash".to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        quiz_idle_ttl: std::time::Duration::from_secs(30 * 60),
    }
}

pub struct TestApp {
    pub address: String,
    pub progress: ProgressStore,
}

/// Spawns the app on a random port with an in-memory progress database.
pub async fn spawn_app(model: Option<SharedModel>) -> TestApp {
    let store = SqliteStore::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory sqlite");
    let progress = ProgressStore::new(Arc::new(store));

    let state = AppState::new(test_config(), model, progress.clone());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, progress }
}

pub fn shared(model: ScriptedModel) -> Option<SharedModel> {
    let model: SharedModel = Arc::new(model);
    Some(model)
}
