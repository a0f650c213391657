use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use super::error::ApiError;
use super::middleware::AuthUser;
use super::response::ApiResponse;
use super::AppState;
use crate::generator::GenerationError;
use crate::models::*;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Courses
// ============================================================

/// Generate an outline for a topic and persist it as a new course.
///
/// Lessons are stored empty; their content is produced on first read.
pub async fn generate_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<GenerateCourseInput>,
) -> Result<(StatusCode, Json<ApiResponse<CourseDetail>>), ApiError> {
    let topic = input.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::BadRequest("Topic is required".to_string()));
    }

    tracing::info!(creator = %user.id, topic, "Generating course outline");

    let timeout = state.generation_timeout;
    let outline = tokio::time::timeout(timeout, state.generator.generate_outline(topic))
        .await
        .map_err(|_| GenerationError::Timeout(timeout))??;
    outline
        .validate()
        .map_err(GenerationError::InvalidContent)?;

    let course = state.db.create_course(&user.id, outline)?;
    tracing::info!(
        course_id = %course.course.id,
        modules = course.modules.len(),
        "Course created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(course))))
}

pub async fn list_my_courses(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<CourseSummary>>>, ApiError> {
    let courses = state.db.get_courses_by_creator(&user.id)?;
    Ok(Json(ApiResponse::ok(courses)))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CourseDetail>>, ApiError> {
    let not_found = || ApiError::NotFound("Course not found".to_string());
    let id = parse_id(&id).ok_or_else(not_found)?;

    state
        .db
        .get_course_detail(id)?
        .map(|course| Json(ApiResponse::ok(course)))
        .ok_or_else(not_found)
}

// ============================================================
// Lessons
// ============================================================

/// Read a lesson, materializing its content on first access.
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Lesson>>, ApiError> {
    let id = parse_id(&id).ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;
    let lesson = state.materializer.ensure_content(id).await?;
    Ok(Json(ApiResponse::ok(lesson)))
}

/// An id that does not parse cannot name a stored record.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}
