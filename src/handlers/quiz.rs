// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, QuizError},
    models::quiz::{
        ChooseDifficultyRequest, ChooseTopicRequest, CreateQuizRequest, QuizSnapshot,
        SendMessageRequest,
    },
    quiz::flow::QuizFlow,
    state::{AppState, SharedQuiz},
};

async fn find_quiz(state: &AppState, id: Uuid) -> Result<SharedQuiz, AppError> {
    state
        .quizzes
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Quiz {id} not found")))
}

/// Claims the play-through for a mutating call.
/// Rejects instead of queueing when another call is still pending.
fn acquire(quiz: &SharedQuiz) -> Result<MutexGuard<'_, QuizFlow>, AppError> {
    let mut flow = quiz.try_lock().map_err(|_| AppError::from(QuizError::Busy))?;
    flow.touch();
    Ok(flow)
}

/// Claims the play-through and runs a provider-bound call on its own task.
///
/// The task owns the lock, so the call and its state update finish even when
/// the client disconnects mid-request.
async fn run_detached<F, Fut>(quiz: SharedQuiz, op: F) -> Result<Json<QuizSnapshot>, AppError>
where
    F: FnOnce(OwnedMutexGuard<QuizFlow>) -> Fut,
    Fut: Future<Output = Result<QuizSnapshot, QuizError>> + Send + 'static,
{
    let mut flow = quiz
        .try_lock_owned()
        .map_err(|_| AppError::from(QuizError::Busy))?;
    flow.touch();

    let snapshot = tokio::spawn(op(flow))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Quiz task failed: {e}")))??;
    Ok(Json(snapshot))
}

/// Starts a new play-through for the chosen subject.
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let flow = QuizFlow::new(req.subject, state.model.clone(), state.progress.clone());
    let id = flow.id();
    let snapshot = flow.snapshot();

    state
        .quizzes
        .write()
        .await
        .insert(id, Arc::new(Mutex::new(flow)));
    tracing::info!(quiz = %id, subject = %req.subject, "Quiz created");

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Current snapshot. Waits for a pending call to finish.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&state, id).await?;
    let mut flow = quiz.lock().await;
    flow.touch();
    Ok(Json(flow.snapshot()))
}

/// Abandons a play-through ("Change Subject").
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .quizzes
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("Quiz {id} not found")))?;

    quiz.lock().await.abandon();
    tracing::info!(quiz = %id, "Quiz abandoned");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn choose_difficulty(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChooseDifficultyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&state, id).await?;
    let mut flow = acquire(&quiz)?;
    flow.choose_difficulty(req.difficulty)?;
    Ok(Json(flow.snapshot()))
}

/// Chooses the topic, opens the conversation and returns the greeting.
pub async fn choose_topic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChooseTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let quiz = find_quiz(&state, id).await?;
    run_detached(quiz, move |mut flow| async move {
        flow.choose_topic(&req.topic).await?;
        Ok::<_, QuizError>(flow.snapshot())
    })
    .await
}

/// Sends the learner's answer and returns the updated play-through.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let quiz = find_quiz(&state, id).await?;
    run_detached(quiz, move |mut flow| async move {
        flow.submit(&req.text).await?;
        Ok::<_, QuizError>(flow.snapshot())
    })
    .await
}

/// Fetches explanations for every missed question.
pub async fn request_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&state, id).await?;
    run_detached(quiz, |mut flow| async move {
        flow.request_review().await?;
        Ok::<_, QuizError>(flow.snapshot())
    })
    .await
}

pub async fn finish_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&state, id).await?;
    let mut flow = acquire(&quiz)?;
    flow.finish_review()?;
    Ok(Json(flow.snapshot()))
}

pub async fn play_again(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&state, id).await?;
    let mut flow = acquire(&quiz)?;
    flow.play_again()?;
    Ok(Json(flow.snapshot()))
}
