use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::extract::FromRef;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    config::Config, quiz::flow::QuizFlow, quiz::session::SharedModel,
    services::progress::ProgressStore,
};

/// A play-through behind its own lock; the lock doubles as the
/// "request in flight" flag.
pub type SharedQuiz = Arc<Mutex<QuizFlow>>;

/// Live play-throughs by id.
pub type QuizRegistry = Arc<RwLock<HashMap<Uuid, SharedQuiz>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when the provider could not be initialized at start-up.
    pub model: Option<SharedModel>,
    pub progress: ProgressStore,
    pub quizzes: QuizRegistry,
}

impl AppState {
    pub fn new(config: Config, model: Option<SharedModel>, progress: ProgressStore) -> Self {
        Self {
            config,
            model,
            progress,
            quizzes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Drops every play-through idle for at least `ttl`.
    ///
    /// A play-through with a call in flight is busy, not idle, and is kept.
    /// Returns how many were evicted.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut quizzes = self.quizzes.write().await;
        let before = quizzes.len();

        quizzes.retain(|id, quiz| match quiz.try_lock() {
            Ok(mut flow) if flow.idle_for() >= ttl => {
                flow.abandon();
                tracing::info!(quiz = %id, "Evicted idle quiz");
                false
            }
            _ => true,
        });

        before - quizzes.len()
    }

    /// Sweeps the registry every `every` for the life of the process.
    pub fn spawn_eviction(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = state.evict_idle(state.config.quiz_idle_ttl).await;
                if evicted > 0 {
                    let remaining = state.quizzes.read().await.len();
                    tracing::debug!(evicted, remaining, "Quiz sweep done");
                }
            }
        })
    }
}

impl FromRef<AppState> for ProgressStore {
    fn from_ref(state: &AppState) -> Self {
        state.progress.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
