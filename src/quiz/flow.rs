// src/quiz/flow.rs

use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::POINTS_PER_CORRECT,
    error::QuizError,
    models::{
        quiz::{QuizSnapshot, ReviewItem},
        subject::{Difficulty, Subject},
        transcript::{MistakeSet, Transcript, Turn},
    },
    quiz::{
        interpreter::{InterpretedTurn, interpret, is_question_announcement, strip_question_prefix},
        prompt::{build_review_prompt, opening_message},
        review::{REVIEW_APOLOGY, explanation_at, split_review},
        session::{ConversationSession, SharedModel},
    },
    services::progress::ProgressStore,
};

pub const OPENING_APOLOGY: &str = "Sorry, I couldn't start the quiz. Please try again.";
pub const CHAT_APOLOGY: &str = "I'm having a little trouble thinking. Can you repeat that?";

/// Screen of one play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    SelectingDifficulty,
    SelectingTopic,
    Active,
    Finished,
    Reviewing,
}

/// Inputs that move a play-through between screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ChooseDifficulty,
    ChooseTopic,
    /// An interpreted model reply to a learner message.
    Reply { terminal: bool },
    RequestReview,
    DoneReviewing,
    PlayAgain,
}

impl Event {
    fn action(&self) -> &'static str {
        match self {
            Event::ChooseDifficulty => "choosing a difficulty",
            Event::ChooseTopic => "choosing a topic",
            Event::Reply { .. } => "sending a message",
            Event::RequestReview => "reviewing mistakes",
            Event::DoneReviewing => "leaving the review",
            Event::PlayAgain => "playing again",
        }
    }
}

/// Pure transition function. `None` means the event is not allowed on `screen`.
pub fn next_screen(screen: Screen, event: Event, has_mistakes: bool) -> Option<Screen> {
    match (screen, event) {
        (Screen::SelectingDifficulty, Event::ChooseDifficulty) => Some(Screen::SelectingTopic),
        (Screen::SelectingTopic, Event::ChooseTopic) => Some(Screen::Active),
        (Screen::Active, Event::Reply { terminal: false }) => Some(Screen::Active),
        (Screen::Active, Event::Reply { terminal: true }) => Some(Screen::Finished),
        (Screen::Finished, Event::RequestReview) if has_mistakes => Some(Screen::Reviewing),
        (Screen::Reviewing, Event::DoneReviewing) => Some(Screen::Finished),
        (Screen::Finished, Event::PlayAgain) => Some(Screen::SelectingDifficulty),
        _ => None,
    }
}

/// Controller for one play-through: screen state, score, mistakes, transcript
/// and the conversation it owns.
pub struct QuizFlow {
    id: Uuid,
    subject: Subject,
    screen: Screen,
    difficulty: Option<Difficulty>,
    topic: Option<&'static str>,
    transcript: Transcript,
    score: u32,
    mistakes: MistakeSet,
    review: Vec<String>,
    session: ConversationSession,
    progress: ProgressStore,
    last_active: Instant,
}

impl QuizFlow {
    pub fn new(subject: Subject, model: Option<SharedModel>, progress: ProgressStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            screen: Screen::SelectingDifficulty,
            difficulty: None,
            topic: None,
            transcript: Transcript::new(),
            score: 0,
            mistakes: MistakeSet::new(),
            review: Vec::new(),
            session: ConversationSession::new(model),
            progress,
            last_active: Instant::now(),
        }
    }

    /// Marks the play-through as in use by the learner.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Time since the learner last touched this play-through.
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn mistakes(&self) -> &MistakeSet {
        &self.mistakes
    }

    pub fn review_explanations(&self) -> &[String] {
        &self.review
    }

    pub fn can_review(&self) -> bool {
        next_screen(self.screen, Event::RequestReview, !self.mistakes.is_empty()).is_some()
    }

    fn target(&self, event: Event) -> Result<Screen, QuizError> {
        next_screen(self.screen, event, !self.mistakes.is_empty()).ok_or(
            QuizError::InvalidTransition {
                screen: self.screen,
                action: event.action(),
            },
        )
    }

    pub fn choose_difficulty(&mut self, difficulty: Difficulty) -> Result<(), QuizError> {
        self.screen = self.target(Event::ChooseDifficulty)?;
        self.difficulty = Some(difficulty);
        Ok(())
    }

    /// Opens the conversation and fetches the greeting.
    ///
    /// A missing provider leaves the flow on topic selection. A provider
    /// failure on the opening message still enters `Active`, with an apology
    /// in place of the greeting. Nothing visible changes until the greeting
    /// call has resolved.
    pub async fn choose_topic(&mut self, topic: &str) -> Result<(), QuizError> {
        let next = self.target(Event::ChooseTopic)?;
        let topic = self
            .subject
            .find_topic(topic)
            .ok_or_else(|| QuizError::UnknownTopic(topic.to_string()))?;
        let difficulty = self.difficulty.ok_or(QuizError::InvalidTransition {
            screen: self.screen,
            action: Event::ChooseTopic.action(),
        })?;

        self.session.open(self.subject, difficulty, topic)?;

        let opening = opening_message(self.subject, difficulty, topic);
        let greeting = match self.session.send(&opening).await {
            Ok(raw) => {
                let greeting = interpret(&raw, None);
                if greeting.score_update.is_some() || greeting.is_terminal {
                    tracing::warn!(quiz = %self.id, "Greeting carried a marker, ignoring it");
                }
                greeting.display_text
            }
            Err(e) => {
                tracing::error!(quiz = %self.id, "Failed to start quiz: {}", e);
                OPENING_APOLOGY.to_string()
            }
        };

        self.screen = next;
        self.topic = Some(topic);
        self.transcript = Transcript::new();
        self.transcript.push(Turn::model(greeting));
        self.score = 0;
        self.mistakes = MistakeSet::new();
        self.review.clear();
        Ok(())
    }

    /// Forwards one learner message and applies the interpreted reply.
    ///
    /// The learner turn, its reply, score, mistakes and screen are committed
    /// together once the reply was received, parsed and (on the final turn)
    /// saved. A session failure appends the learner turn plus an apology and
    /// changes nothing else.
    pub async fn submit(&mut self, user_text: &str) -> Result<(), QuizError> {
        self.target(Event::Reply { terminal: false })?;

        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Ok(());
        }

        let preceding_question = self
            .transcript
            .last_model_turn_where(is_question_announcement)
            .map(str::to_string);

        let raw = match self.session.send(user_text).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(quiz = %self.id, "Chat turn failed, learner may retry: {}", e);
                self.transcript.push(Turn::user(user_text));
                self.transcript.push(Turn::model(CHAT_APOLOGY));
                return Ok(());
            }
        };

        let turn = interpret(&raw, preceding_question.as_deref());
        self.check_provider_contract(&turn);
        self.apply(user_text, turn).await;
        Ok(())
    }

    fn check_provider_contract(&self, turn: &InterpretedTurn) {
        if let Some(total) = turn.score_update {
            let expected = self.score + POINTS_PER_CORRECT;
            if total != expected {
                tracing::warn!(
                    quiz = %self.id,
                    previous = self.score,
                    reported = total,
                    "Model reported an unexpected total score"
                );
            }
        }
    }

    /// Stages the turn, saves the result when it is the last one, then commits.
    async fn apply(&mut self, user_text: &str, turn: InterpretedTurn) {
        let score = turn.score_update.unwrap_or(self.score);
        let mut mistakes = self.mistakes.clone();
        if let Some(question) = &turn.missed_question {
            if mistakes.insert(question) {
                tracing::debug!(quiz = %self.id, "Recorded missed question");
            }
        }
        let next = next_screen(
            self.screen,
            Event::Reply {
                terminal: turn.is_terminal,
            },
            !mistakes.is_empty(),
        );

        if turn.is_terminal {
            self.record_result(score, mistakes.len()).await;
        }

        self.score = score;
        self.mistakes = mistakes;
        self.transcript.push(Turn::user(user_text));
        self.transcript.push(Turn::model(turn.display_text));
        if let Some(next) = next {
            self.screen = next;
        }
    }

    async fn record_result(&self, score: u32, mistakes: usize) {
        let (Some(difficulty), Some(topic)) = (self.difficulty, self.topic) else {
            tracing::error!(quiz = %self.id, "Finished without difficulty or topic, result not saved");
            return;
        };
        tracing::info!(quiz = %self.id, score, mistakes, "Quiz complete");
        if let Err(e) = self
            .progress
            .save_quiz_result(self.subject, difficulty, topic, score)
            .await
        {
            tracing::error!(quiz = %self.id, "Failed to save progress: {}", e);
        }
    }

    /// Fetches one batched explanation per missed question.
    pub async fn request_review(&mut self) -> Result<(), QuizError> {
        let next = self.target(Event::RequestReview)?;

        let prompt = build_review_prompt(self.mistakes.as_slice());
        let review = match self.session.generate(&prompt).await {
            Ok(reply) => {
                let review = split_review(&reply);
                if review.len() != self.mistakes.len() {
                    tracing::warn!(
                        quiz = %self.id,
                        expected = self.mistakes.len(),
                        received = review.len(),
                        "Review reply segment count does not match mistakes"
                    );
                }
                review
            }
            Err(e) => {
                tracing::error!(quiz = %self.id, "Failed to get review: {}", e);
                vec![REVIEW_APOLOGY.to_string()]
            }
        };

        self.review = review;
        self.screen = next;
        Ok(())
    }

    pub fn finish_review(&mut self) -> Result<(), QuizError> {
        self.screen = self.target(Event::DoneReviewing)?;
        Ok(())
    }

    /// Starts a fresh play-through of the same subject. Stored progress is kept.
    pub fn play_again(&mut self) -> Result<(), QuizError> {
        self.screen = self.target(Event::PlayAgain)?;
        self.difficulty = None;
        self.topic = None;
        self.transcript = Transcript::new();
        self.score = 0;
        self.mistakes = MistakeSet::new();
        self.review.clear();
        self.session.close();
        Ok(())
    }

    /// Releases the conversation when the learner walks away.
    pub fn abandon(&mut self) {
        self.session.close();
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        let review = if self.screen == Screen::Reviewing {
            self.mistakes
                .as_slice()
                .iter()
                .enumerate()
                .map(|(i, question)| ReviewItem {
                    question: strip_question_prefix(question).to_string(),
                    explanation: explanation_at(&self.review, i).to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        QuizSnapshot {
            id: self.id,
            subject: self.subject,
            screen: self.screen,
            difficulty: self.difficulty,
            topic: self.topic.map(str::to_string),
            score: self.score,
            transcript: self.transcript.turns().to_vec(),
            mistakes: self.mistakes.as_slice().to_vec(),
            can_review: self.can_review(),
            review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::transcript::Role,
        quiz::{review::LOADING_PLACEHOLDER, session::LanguageModel},
        services::progress::{KeyValueStore, SqliteStore},
    };
    use async_trait::async_trait;
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    /// Replays canned chat replies in order; `Err` entries simulate outages.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        review: Mutex<Result<String, String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                review: Mutex::new(Err("no review scripted".to_string())),
            })
        }

        fn with_review(self: Arc<Self>, review: Result<&str, &str>) -> Arc<Self> {
            *self.review.lock().unwrap() = review.map(str::to_string).map_err(str::to_string);
            self
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn chat(&self, _system: &str, _history: &[Turn]) -> Result<String, QuizError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
                .map_err(QuizError::Provider)
        }

        async fn generate(&self, _prompt: &str) -> Result<String, QuizError> {
            self.review.lock().unwrap().clone().map_err(QuizError::Provider)
        }
    }

    async fn progress_store() -> ProgressStore {
        ProgressStore::new(Arc::new(
            SqliteStore::connect("sqlite::memory:").await.unwrap(),
        ))
    }

    async fn active_flow(model: Arc<ScriptedModel>, progress: ProgressStore) -> QuizFlow {
        let model: SharedModel = model;
        let mut flow = QuizFlow::new(Subject::Maths, Some(model), progress);
        flow.choose_difficulty(Difficulty::Medium).unwrap();
        flow.choose_topic("Algebra").await.unwrap();
        flow
    }

    /// Greeting, then ten replies. `wrong` lists 1-based question numbers answered wrongly.
    fn ten_question_script(wrong: &[u32]) -> Vec<Result<String, String>> {
        let mut script = vec![Ok("Question 1/10: What is x if x + 1 = 2?".to_string())];
        let mut score = 0;
        for n in 1..=10 {
            let correct = !wrong.contains(&n);
            if correct {
                score += 10;
            }
            let reply = match (n, correct) {
                (10, true) => format!("Fantastic, you scored {score}! [TOTAL_SCORE: {score}] [QUIZ_COMPLETE]"),
                (10, false) => format!("Well played, final score {score}. [QUIZ_COMPLETE]"),
                (_, true) => format!("Question {}/10: Next one! [TOTAL_SCORE: {score}]", n + 1),
                (_, false) => format!("Question {}/10: Let's try this one!", n + 1),
            };
            script.push(Ok(reply));
        }
        script
    }

    fn scripted(script: Vec<Result<String, String>>) -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel {
            replies: Mutex::new(script.into_iter().collect()),
            review: Mutex::new(Err("no review scripted".to_string())),
        })
    }

    #[test]
    fn review_edge_requires_mistakes() {
        assert_eq!(next_screen(Screen::Finished, Event::RequestReview, false), None);
        assert_eq!(
            next_screen(Screen::Finished, Event::RequestReview, true),
            Some(Screen::Reviewing)
        );
    }

    #[test]
    fn only_listed_transitions_exist() {
        assert_eq!(
            next_screen(Screen::SelectingDifficulty, Event::ChooseTopic, false),
            None
        );
        assert_eq!(
            next_screen(Screen::Active, Event::PlayAgain, true),
            None
        );
        assert_eq!(
            next_screen(Screen::Reviewing, Event::PlayAgain, true),
            None
        );
        assert_eq!(
            next_screen(Screen::Finished, Event::Reply { terminal: false }, true),
            None
        );
        assert_eq!(
            next_screen(Screen::Active, Event::Reply { terminal: true }, false),
            Some(Screen::Finished)
        );
    }

    #[tokio::test]
    async fn choosing_topic_opens_session_and_shows_greeting() {
        let model = ScriptedModel::new(vec![Ok("Hi! Question 1/10: What is 2x when x = 3?")]);
        let flow = active_flow(model, progress_store().await).await;

        assert_eq!(flow.screen(), Screen::Active);
        assert_eq!(flow.score(), 0);
        assert_eq!(flow.transcript().len(), 1);
        assert_eq!(flow.transcript().turns()[0].role, Role::Model);
    }

    #[tokio::test]
    async fn topic_from_other_subject_is_rejected() {
        let model: SharedModel = ScriptedModel::new(vec![]);
        let mut flow = QuizFlow::new(Subject::Maths, Some(model), progress_store().await);
        flow.choose_difficulty(Difficulty::Simple).unwrap();
        let err = flow.choose_topic("Biology").await.unwrap_err();
        assert!(matches!(err, QuizError::UnknownTopic(_)));
        assert_eq!(flow.screen(), Screen::SelectingTopic);
    }

    #[tokio::test]
    async fn missing_provider_keeps_topic_selection() {
        let mut flow = QuizFlow::new(Subject::Science, None, progress_store().await);
        flow.choose_difficulty(Difficulty::Simple).unwrap();
        let err = flow.choose_topic("Space").await.unwrap_err();
        assert!(matches!(err, QuizError::Initialization(_)));
        assert_eq!(flow.screen(), Screen::SelectingTopic);
    }

    #[tokio::test]
    async fn failed_greeting_enters_active_with_apology() {
        let model = ScriptedModel::new(vec![Err("down")]);
        let flow = active_flow(model, progress_store().await).await;
        assert_eq!(flow.screen(), Screen::Active);
        assert_eq!(flow.transcript().turns()[0].text, OPENING_APOLOGY);
    }

    #[tokio::test]
    async fn perfect_play_through_scores_100_and_saves_once() {
        let progress = progress_store().await;
        let mut flow = active_flow(scripted(ten_question_script(&[])), progress.clone()).await;

        for _ in 0..10 {
            flow.submit("my answer").await.unwrap();
        }

        assert_eq!(flow.screen(), Screen::Finished);
        assert_eq!(flow.score(), 100);
        assert!(flow.mistakes().is_empty());
        assert!(!flow.can_review());

        let saved = progress.get_progress().await;
        assert_eq!(saved.maths.len(), 1);
        assert_eq!(saved.maths[0].score, 100);
        assert_eq!(saved.maths[0].topic, "Algebra");
        assert_eq!(saved.maths[0].difficulty, Difficulty::Medium);
    }

    #[tokio::test]
    async fn wrong_answers_are_tracked_in_order_and_reviewed() {
        let model = scripted(ten_question_script(&[2, 5])).with_review(Ok(
            "Multiplying is repeated adding.\n---CONCEPT_BREAK---\nCombine like terms.",
        ));
        let mut flow = active_flow(model, progress_store().await).await;

        for _ in 0..10 {
            flow.submit("answer").await.unwrap();
        }

        assert_eq!(flow.score(), 80);
        assert_eq!(
            flow.mistakes().as_slice(),
            ["Question 2/10: Next one!", "Question 5/10: Next one!"]
        );

        flow.request_review().await.unwrap();
        assert_eq!(flow.screen(), Screen::Reviewing);
        assert_eq!(flow.review_explanations().len(), 2);

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.review[0].question, "Next one!");
        assert_eq!(snapshot.review[1].explanation, "Combine like terms.");

        flow.finish_review().unwrap();
        assert_eq!(flow.screen(), Screen::Finished);
    }

    #[tokio::test]
    async fn short_review_reply_uses_placeholder() {
        let model = scripted(ten_question_script(&[3, 4])).with_review(Ok("Only one explanation."));
        let mut flow = active_flow(model, progress_store().await).await;
        for _ in 0..10 {
            flow.submit("answer").await.unwrap();
        }
        flow.request_review().await.unwrap();
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.review.len(), 2);
        assert_eq!(snapshot.review[1].explanation, LOADING_PLACEHOLDER);
    }

    #[tokio::test]
    async fn failed_review_shows_single_apology() {
        let model = scripted(ten_question_script(&[1])).with_review(Err("timeout"));
        let mut flow = active_flow(model, progress_store().await).await;
        for _ in 0..10 {
            flow.submit("answer").await.unwrap();
        }
        flow.request_review().await.unwrap();
        assert_eq!(flow.review_explanations(), [REVIEW_APOLOGY.to_string()]);
        flow.finish_review().unwrap();
        assert_eq!(flow.screen(), Screen::Finished);
    }

    #[tokio::test]
    async fn provider_failure_mid_quiz_changes_only_the_transcript() {
        let model = ScriptedModel::new(vec![
            Ok("Question 1/10: What is 1 + 1?"),
            Ok("Question 2/10: What is 2 + 2? [TOTAL_SCORE: 10]"),
            Err("network unreachable"),
            Ok("Not quite. Question 3/10: What is 3 + 3?"),
        ]);
        let mut flow = active_flow(model, progress_store().await).await;
        flow.submit("2").await.unwrap();
        let before_len = flow.transcript().len();
        let before_mistakes = flow.mistakes().clone();

        flow.submit("4").await.unwrap();

        assert_eq!(flow.screen(), Screen::Active);
        assert_eq!(flow.score(), 10);
        assert_eq!(flow.mistakes(), &before_mistakes);
        assert_eq!(flow.transcript().len(), before_len + 2);
        let last = flow.transcript().turns().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text, CHAT_APOLOGY);

        // Retrying works and grades against the same question.
        flow.submit("5").await.unwrap();
        assert_eq!(flow.mistakes().as_slice(), ["Question 2/10: What is 2 + 2?"]);
    }

    #[tokio::test]
    async fn repeated_miss_on_same_question_is_recorded_once() {
        let model = ScriptedModel::new(vec![
            Ok("Question 3/10: What is 2+2?"),
            Ok("Nope, try again!"),
            Ok("Still not right."),
        ]);
        let mut flow = active_flow(model, progress_store().await).await;
        flow.submit("5").await.unwrap();
        flow.submit("6").await.unwrap();
        assert_eq!(flow.mistakes().as_slice(), ["Question 3/10: What is 2+2?"]);
    }

    #[tokio::test]
    async fn finished_quiz_rejects_messages() {
        let mut flow = active_flow(scripted(ten_question_script(&[])), progress_store().await).await;
        for _ in 0..10 {
            flow.submit("a").await.unwrap();
        }
        let err = flow.submit("one more").await.unwrap_err();
        assert!(matches!(err, QuizError::InvalidTransition { .. }));
        assert_eq!(flow.score(), 100);
    }

    #[tokio::test]
    async fn review_without_mistakes_is_unavailable() {
        let mut flow = active_flow(scripted(ten_question_script(&[])), progress_store().await).await;
        for _ in 0..10 {
            flow.submit("a").await.unwrap();
        }
        let err = flow.request_review().await.unwrap_err();
        assert!(matches!(err, QuizError::InvalidTransition { .. }));
        assert_eq!(flow.screen(), Screen::Finished);
    }

    #[tokio::test]
    async fn play_again_resets_everything_but_progress() {
        let progress = progress_store().await;
        let mut flow = active_flow(scripted(ten_question_script(&[7])), progress.clone()).await;
        for _ in 0..10 {
            flow.submit("a").await.unwrap();
        }
        flow.play_again().unwrap();

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.screen, Screen::SelectingDifficulty);
        assert_eq!(snapshot.score, 0);
        assert!(snapshot.transcript.is_empty());
        assert!(snapshot.mistakes.is_empty());
        assert_eq!(snapshot.difficulty, None);
        assert_eq!(snapshot.topic, None);
        assert_eq!(progress.get_progress().await.maths.len(), 1);
    }

    #[tokio::test]
    async fn blank_message_is_ignored() {
        let model = ScriptedModel::new(vec![Ok("Question 1/10: Ready?")]);
        let mut flow = active_flow(model, progress_store().await).await;
        flow.submit("   ").await.unwrap();
        assert_eq!(flow.transcript().len(), 1);
    }

    /// Answers the greeting when told to, then never replies again.
    struct StallingModel {
        greets: bool,
    }

    #[async_trait]
    impl LanguageModel for StallingModel {
        async fn chat(&self, _system: &str, history: &[Turn]) -> Result<String, QuizError> {
            if self.greets && history.len() == 1 {
                return Ok("Question 1/10: What is 1 + 1?".to_string());
            }
            std::future::pending().await
        }

        async fn generate(&self, _prompt: &str) -> Result<String, QuizError> {
            std::future::pending().await
        }
    }

    /// Reads as empty; writes never complete.
    struct StallingStore;

    #[async_trait]
    impl KeyValueStore for StallingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, QuizError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), QuizError> {
            std::future::pending().await
        }

        async fn remove(&self, _key: &str) -> Result<(), QuizError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancelled_turn_leaves_play_through_untouched() {
        let model: SharedModel = Arc::new(StallingModel { greets: true });
        let mut flow = QuizFlow::new(Subject::Maths, Some(model), progress_store().await);
        flow.choose_difficulty(Difficulty::Simple).unwrap();
        flow.choose_topic("Algebra").await.unwrap();
        assert_eq!(flow.transcript().len(), 1);

        let outcome = tokio::time::timeout(Duration::from_millis(50), flow.submit("2")).await;
        assert!(outcome.is_err());

        assert_eq!(flow.transcript().len(), 1);
        assert_eq!(flow.screen(), Screen::Active);
        assert_eq!(flow.score(), 0);

        // The dialogue is intact, so the learner can simply answer again.
        assert!(flow.session.is_open());
        assert_eq!(flow.session.history_len(), 2);
    }

    #[tokio::test]
    async fn cancelled_greeting_keeps_topic_selection() {
        let model: SharedModel = Arc::new(StallingModel { greets: false });
        let mut flow = QuizFlow::new(Subject::Maths, Some(model), progress_store().await);
        flow.choose_difficulty(Difficulty::Simple).unwrap();

        let outcome =
            tokio::time::timeout(Duration::from_millis(50), flow.choose_topic("Algebra")).await;
        assert!(outcome.is_err());

        assert_eq!(flow.screen(), Screen::SelectingTopic);
        assert!(flow.transcript().is_empty());
        assert_eq!(flow.snapshot().topic, None);
    }

    #[tokio::test]
    async fn cancelled_final_save_does_not_finish_the_quiz() {
        let model = ScriptedModel::new(vec![
            Ok("Question 1/10: What is 1 + 1?"),
            Ok("Perfect! [TOTAL_SCORE: 10] [QUIZ_COMPLETE]"),
        ]);
        let progress = ProgressStore::new(Arc::new(StallingStore));
        let mut flow = active_flow(model, progress).await;

        let outcome = tokio::time::timeout(Duration::from_millis(50), flow.submit("2")).await;
        assert!(outcome.is_err());

        assert_eq!(flow.screen(), Screen::Active);
        assert_eq!(flow.score(), 0);
        assert_eq!(flow.transcript().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_review_stays_on_finished() {
        let model: SharedModel = Arc::new(StallingModel { greets: true });
        let mut flow = QuizFlow::new(Subject::Maths, Some(model), progress_store().await);
        flow.choose_difficulty(Difficulty::Simple).unwrap();
        flow.choose_topic("Algebra").await.unwrap();
        flow.screen = Screen::Finished;
        flow.mistakes.insert("Question 1/10: What is 1 + 1?");

        let outcome =
            tokio::time::timeout(Duration::from_millis(50), flow.request_review()).await;
        assert!(outcome.is_err());

        assert_eq!(flow.screen(), Screen::Finished);
        assert!(flow.review_explanations().is_empty());
    }
}
