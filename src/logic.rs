//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Every operation resolves the player for a course, applies one user
//! action, and answers with the freshly rendered view.

use tracing::{info, instrument};

use crate::domain::ResponseValue;
use crate::error::PlayerError;
use crate::session::Session;
use crate::state::AppState;
use crate::view::{render_lesson, LessonView, ViewOptions};

#[instrument(level = "info", skip(state, session))]
pub async fn current_view(
  state: &AppState,
  session: &Session,
  course_id: &str,
  options: ViewOptions,
) -> Result<LessonView, PlayerError> {
  let player = state.open_player(session, course_id).await?;
  let player = player.lock().await;
  Ok(render_lesson(&player, options).await)
}

#[instrument(level = "info", skip(state, session))]
pub async fn select_week(
  state: &AppState,
  session: &Session,
  course_id: &str,
  index: usize,
) -> Result<LessonView, PlayerError> {
  let player = state.open_player(session, course_id).await?;
  let mut player = player.lock().await;
  player.select_week(index)?;
  Ok(render_lesson(&player, ViewOptions::default()).await)
}

#[instrument(level = "info", skip(state, session))]
pub async fn select_lesson(
  state: &AppState,
  session: &Session,
  course_id: &str,
  lesson_id: &str,
) -> Result<LessonView, PlayerError> {
  let player = state.open_player(session, course_id).await?;
  let mut player = player.lock().await;
  player.select_lesson(lesson_id)?;
  Ok(render_lesson(&player, ViewOptions::default()).await)
}

#[instrument(level = "info", skip(state, session))]
pub async fn mark_complete(
  state: &AppState,
  session: &Session,
  course_id: &str,
  lesson_id: &str,
) -> Result<LessonView, PlayerError> {
  let player = state.open_player(session, course_id).await?;
  let mut player = player.lock().await;
  player.mark_complete(lesson_id)?;
  Ok(render_lesson(&player, ViewOptions::default()).await)
}

/// Keys are a question id, optionally suffixed `_followup` or `_<n>`.
#[instrument(level = "info", skip(state, session, value))]
pub async fn set_response(
  state: &AppState,
  session: &Session,
  course_id: &str,
  question_id: &str,
  value: ResponseValue,
) -> Result<LessonView, PlayerError> {
  if question_id.trim().is_empty() {
    return Err(PlayerError::InvalidRequest("questionId must not be empty".into()));
  }
  let player = state.open_player(session, course_id).await?;
  let player = player.lock().await;
  player.responses.set_response(question_id, value).await;
  Ok(render_lesson(&player, ViewOptions::default()).await)
}

#[instrument(level = "info", skip(state, session))]
pub async fn submit_workbook(
  state: &AppState,
  session: &Session,
  course_id: &str,
  week_index: usize,
) -> Result<u32, PlayerError> {
  let player = state.open_player(session, course_id).await?;
  let mut player = player.lock().await;
  let week = player.submit_workbook(week_index).await?;
  info!(target: "workbook", %course_id, week, "Workbook submission recorded");
  Ok(week)
}

/// Exchange credentials with the remote auth endpoint and store the token.
#[instrument(level = "info", skip(state, email, password))]
pub async fn remote_login(state: &AppState, email: &str, password: &str) -> Result<Session, PlayerError> {
  let remote = state.remote.as_ref().ok_or(crate::error::RemoteError::Disabled)?;
  let token = remote.login(email, password).await?;
  state.sign_in(&token).await
}
