use axum::Json;
use axum::extract::{Path, State};

use crate::api::extract::ApiJson;
use crate::error::AppError;
use crate::models::*;
use crate::services::{AssistantRequest, AssistantResponse, GenerationOutcome};
use crate::state::AppState;

pub(super) async fn lesson_detail(
    State(state): State<AppState>,
    identity: Identity,
    Path((course_id, module_id, lesson_id)): Path<(String, String, String)>,
) -> Result<Json<LessonDetail>, AppError> {
    let detail = state
        .lesson_service()
        .lesson_detail(&course_id, &module_id, &lesson_id, &identity)
        .await?;
    Ok(Json(detail))
}

pub(super) async fn mark_lesson_complete(
    State(state): State<AppState>,
    identity: Identity,
    Path(lesson_id): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    let progress = state
        .lesson_service()
        .mark_complete(&lesson_id, &identity)
        .await?;
    Ok(Json(ProgressResponse {
        success: true,
        progress,
    }))
}

pub(super) async fn generate_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<Json<GenerationOutcome>, AppError> {
    match state.lessons.generate_for_lesson(&lesson_id).await? {
        GenerationOutcome::NotFound => Err(AppError::NotFound),
        outcome => Ok(Json(outcome)),
    }
}

pub(super) async fn quiz_detail(
    State(state): State<AppState>,
    Path(quiz_id): Path<String>,
) -> Result<Json<QuizView>, AppError> {
    let view = state.quiz_service().quiz_view(&quiz_id).await?;
    Ok(Json(view))
}

pub(super) async fn submit_quiz(
    State(state): State<AppState>,
    identity: Identity,
    Path(quiz_id): Path<String>,
    ApiJson(submission): ApiJson<QuizSubmission>,
) -> Result<Json<QuizResult>, AppError> {
    let result = state
        .quiz_service()
        .submit(&quiz_id, submission, &identity)
        .await?;
    Ok(Json(result))
}

pub(super) async fn list_attempts(
    State(state): State<AppState>,
    identity: Identity,
    Path(quiz_id): Path<String>,
) -> Result<Json<Vec<QuizAttempt>>, AppError> {
    let attempts = state.quiz_service().attempts(&quiz_id, &identity).await?;
    Ok(Json(attempts))
}

pub(super) async fn due_reviews(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<DueReview>>, AppError> {
    let reviews = state.lesson_service().due_reviews(&identity).await?;
    Ok(Json(reviews))
}

pub(super) async fn ai_assistant(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AssistantRequest>,
) -> Result<Json<AssistantResponse>, AppError> {
    let reply = state.assistant_service().ask(req).await?;
    Ok(Json(reply))
}
