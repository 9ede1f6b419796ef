pub mod extract;
mod learning;

use axum::Json;
use axum::extract::Path;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;
use crate::models::*;
use crate::db::repository;

use self::extract::ApiJson;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/create", post(create_course))
        .route("/api/courses/{course_id}", get(course_detail))
        .route("/api/courses/{course_id}/delete", post(delete_course))
        .route(
            "/api/courses/{course_id}/modules/{module_id}/lessons/{lesson_id}",
            get(learning::lesson_detail),
        )
        .route("/api/lessons/{lesson_id}/complete", post(learning::mark_lesson_complete))
        .route("/api/lessons/{lesson_id}/generate", post(learning::generate_lesson))
        .route("/api/quizzes/{quiz_id}", get(learning::quiz_detail))
        .route("/api/quizzes/{quiz_id}/submit", post(learning::submit_quiz))
        .route("/api/quizzes/{quiz_id}/attempts", get(learning::list_attempts))
        .route("/api/reviews", get(learning::due_reviews))
        .route("/api/ai_assistant", post(learning::ai_assistant))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    identity: Option<Identity>,
    ApiJson(req): ApiJson<NewCourseRequest>,
) -> Result<Json<CreateCourseResponse>, AppError> {
    let created = state
        .course_service()
        .create_course(req, identity.as_ref())
        .await?;
    Ok(Json(created))
}

async fn course_detail(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    let detail = state
        .course_service()
        .course_detail(&course_id, identity.as_ref())
        .await?;
    Ok(Json(detail))
}

async fn delete_course(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Path(course_id): Path<String>,
) -> Result<Json<DeleteCourseResponse>, AppError> {
    let deleted = state
        .course_service()
        .delete_course(&course_id, identity.as_ref())
        .await?;
    Ok(Json(deleted))
}
