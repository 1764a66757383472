//! Error taxonomy. `PlayerError` is the one contract surfaced to clients;
//! every handler returns it and it renders itself as a JSON body.

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the persistence adapter and its backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
  #[error("storage unavailable: {0}")]
  Unavailable(String),

  #[error("storage quota exceeded")]
  QuotaExceeded,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Errors from remote HTTP collaborators (auth endpoint, response sync).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
  #[error("remote API is not configured")]
  Disabled,
  #[error("remote API rejected the credentials")]
  Unauthorized,
  #[error("remote API returned status {0}")]
  HttpStatus(reqwest::StatusCode),
  #[error("remote API returned an empty token")]
  EmptyToken,
  #[error(transparent)]
  Http(#[from] reqwest::Error),
}

/// Errors loading the TOML course config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("invalid TOML: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("question {question} in course {course}: scale {min}..={max} must be ascending with at most {max_points} points")]
  InvalidScale { course: String, question: String, min: i32, max: i32, max_points: i64 },
}

/// Errors from slide deck publishing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SlideError {
  #[error("unknown course: {0}")]
  UnknownCourse(String),
  #[error("course {course} has no week {week}")]
  UnknownWeek { course: String, week: u32 },
  #[error("week {week} has no lesson number {lesson}")]
  UnknownLesson { week: u32, lesson: u32 },
  #[error("deck has no slides")]
  EmptyDeck,
  #[error("invalid deck file: {0}")]
  Parse(#[from] toml::de::Error),
  #[error(transparent)]
  Storage(#[from] StorageError),
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Single propagation contract for the player.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
  #[error("sign in required")]
  Unauthenticated,
  #[error("{0} not found")]
  NotFound(String),
  #[error("workbook cannot be submitted yet: {}", .0.join(", "))]
  SubmitBlocked(Vec<String>),
  #[error("invalid request: {0}")]
  InvalidRequest(String),
  #[error(transparent)]
  Storage(#[from] StorageError),
  #[error(transparent)]
  Remote(#[from] RemoteError),
}

impl PlayerError {
  pub fn kind(&self) -> &'static str {
    match self {
      PlayerError::Unauthenticated => "unauthenticated",
      PlayerError::NotFound(_) => "not_found",
      PlayerError::SubmitBlocked(_) => "submit_blocked",
      PlayerError::InvalidRequest(_) => "invalid_request",
      PlayerError::Storage(_) => "storage",
      PlayerError::Remote(RemoteError::Unauthorized) => "unauthenticated",
      PlayerError::Remote(_) => "remote",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      PlayerError::Unauthenticated => StatusCode::UNAUTHORIZED,
      PlayerError::NotFound(_) => StatusCode::NOT_FOUND,
      PlayerError::SubmitBlocked(_) => StatusCode::CONFLICT,
      PlayerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      PlayerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      PlayerError::Remote(RemoteError::Unauthorized) => StatusCode::UNAUTHORIZED,
      PlayerError::Remote(_) => StatusCode::BAD_GATEWAY,
    }
  }

  pub fn to_body(&self) -> ErrorBody {
    let redirect = (self.status() == StatusCode::UNAUTHORIZED).then(|| "/login".to_string());
    ErrorBody { error: self.kind(), message: self.to_string(), redirect }
  }
}

impl From<JsonRejection> for PlayerError {
  fn from(rejection: JsonRejection) -> Self {
    PlayerError::InvalidRequest(rejection.body_text())
  }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error: &'static str,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub redirect: Option<String>,
}

impl IntoResponse for PlayerError {
  fn into_response(self) -> Response {
    (self.status(), Json(self.to_body())).into_response()
  }
}
