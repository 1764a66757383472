//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; course routes authorize the bearer token first.

use std::sync::Arc;

use axum::{
  extract::{FromRequest, Path, Query, State},
  http::{header::AUTHORIZATION, HeaderMap},
  response::{Html, IntoResponse},
  Json,
};
use tracing::{info, instrument};

use crate::error::PlayerError;
use crate::logic::*;
use crate::protocol::*;
use crate::session::Session;
use crate::slides::stored_deck;
use crate::state::AppState;
use crate::view::{LessonView, ViewOptions};

/// JSON body whose rejection renders as a `PlayerError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(PlayerError))]
pub struct JsonBody<T>(pub T);

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Session, PlayerError> {
  state.authorize(bearer(headers))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  JsonBody(body): JsonBody<SignInIn>,
) -> Result<Json<SessionOut>, PlayerError> {
  state.sign_in(&body.token).await?;
  Ok(Json(SessionOut { signed_in: true }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_login(
  State(state): State<Arc<AppState>>,
  JsonBody(body): JsonBody<LoginIn>,
) -> Result<Json<SessionOut>, PlayerError> {
  remote_login(&state, &body.email, &body.password).await?;
  Ok(Json(SessionOut { signed_in: true }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(State(state): State<Arc<AppState>>) -> Result<Json<SessionOut>, PlayerError> {
  state.sign_out().await?;
  Ok(Json(SessionOut { signed_in: false }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let mut out: Vec<CourseSummary> = state.catalog.values().map(|c| to_summary(c)).collect();
  out.sort_by(|a, b| a.id.cmp(&b.id));
  Json(out)
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_view(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(course_id): Path<String>,
  Query(q): Query<ViewQuery>,
) -> Result<Json<LessonView>, PlayerError> {
  let session = authorize(&state, &headers)?;
  let view = current_view(&state, &session, &course_id, ViewOptions { show_transcript: q.transcript }).await?;
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, headers, body), fields(index = body.index))]
pub async fn http_post_week(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(course_id): Path<String>,
  JsonBody(body): JsonBody<SelectWeekIn>,
) -> Result<Json<LessonView>, PlayerError> {
  let session = authorize(&state, &headers)?;
  Ok(Json(select_week(&state, &session, &course_id, body.index).await?))
}

#[instrument(level = "info", skip(state, headers, body), fields(%body.lesson_id))]
pub async fn http_post_lesson(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(course_id): Path<String>,
  JsonBody(body): JsonBody<LessonIn>,
) -> Result<Json<LessonView>, PlayerError> {
  let session = authorize(&state, &headers)?;
  Ok(Json(select_lesson(&state, &session, &course_id, &body.lesson_id).await?))
}

#[instrument(level = "info", skip(state, headers, body), fields(%body.lesson_id))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(course_id): Path<String>,
  JsonBody(body): JsonBody<LessonIn>,
) -> Result<Json<LessonView>, PlayerError> {
  let session = authorize(&state, &headers)?;
  let view = mark_complete(&state, &session, &course_id, &body.lesson_id).await?;
  info!(target: "progress", %course_id, lesson_id = %body.lesson_id, pct = view.completion_percentage, "HTTP lesson completed");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, headers, body), fields(%body.question_id))]
pub async fn http_post_response(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(course_id): Path<String>,
  JsonBody(body): JsonBody<ResponseIn>,
) -> Result<Json<LessonView>, PlayerError> {
  let session = authorize(&state, &headers)?;
  Ok(Json(set_response(&state, &session, &course_id, &body.question_id, body.value).await?))
}

#[instrument(level = "info", skip(state, headers, body), fields(week_index = body.week_index))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(course_id): Path<String>,
  JsonBody(body): JsonBody<SubmitIn>,
) -> Result<Json<SubmitOut>, PlayerError> {
  let session = authorize(&state, &headers)?;
  let week = submit_workbook(&state, &session, &course_id, body.week_index).await?;
  Ok(Json(SubmitOut { submitted: true, week }))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_slides(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path((course_id, week, lesson)): Path<(String, u32, u32)>,
) -> Result<Html<String>, PlayerError> {
  authorize(&state, &headers)?;
  stored_deck(&state.storage, &course_id, week, lesson)
    .map(Html)
    .ok_or_else(|| PlayerError::NotFound(format!("slides for {course_id} week {week} lesson {lesson}")))
}
