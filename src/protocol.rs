//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Course, ResponseValue};
use crate::error::ErrorBody;
use crate::view::LessonView;

/// Messages the client can send over WebSocket. The first message of a
/// connection is expected to be `open`.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  Open {
    #[serde(rename = "courseId")]
    course_id: String,
    token: String,
  },
  SelectWeek {
    index: usize,
  },
  SelectLesson {
    #[serde(rename = "lessonId")]
    lesson_id: String,
  },
  MarkComplete {
    #[serde(rename = "lessonId")]
    lesson_id: String,
  },
  SetResponse {
    #[serde(rename = "questionId")]
    question_id: String,
    value: ResponseValue,
  },
  SubmitWorkbook {
    #[serde(rename = "weekIndex")]
    week_index: usize,
  },
  View {
    #[serde(default)]
    transcript: bool,
  },
}

impl ClientWsMessage {
  /// Message tag, safe to log (`open` carries a token).
  pub fn kind(&self) -> &'static str {
    match self {
      ClientWsMessage::Ping => "ping",
      ClientWsMessage::Open { .. } => "open",
      ClientWsMessage::SelectWeek { .. } => "select_week",
      ClientWsMessage::SelectLesson { .. } => "select_lesson",
      ClientWsMessage::MarkComplete { .. } => "mark_complete",
      ClientWsMessage::SetResponse { .. } => "set_response",
      ClientWsMessage::SubmitWorkbook { .. } => "submit_workbook",
      ClientWsMessage::View { .. } => "view",
    }
  }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  View {
    view: Box<LessonView>,
  },
  Submitted {
    week: u32,
  },
  Error {
    #[serde(flatten)]
    error: ErrorBody,
  },
}

//
// HTTP request/response DTOs
//

#[derive(Deserialize)]
pub struct SignInIn {
  pub token: String,
}

#[derive(Deserialize)]
pub struct LoginIn {
  pub email: String,
  pub password: String,
}

#[derive(Serialize)]
pub struct SessionOut {
  pub signed_in: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
  pub id: String,
  pub title: String,
  pub weeks: usize,
  pub lessons: usize,
}

pub fn to_summary(c: &Course) -> CourseSummary {
  CourseSummary {
    id: c.id.clone(),
    title: c.title.clone(),
    weeks: c.weeks.len(),
    lessons: c.total_lessons(),
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct ViewQuery {
  #[serde(default)]
  pub transcript: bool,
}

#[derive(Deserialize)]
pub struct SelectWeekIn {
  pub index: usize,
}

#[derive(Deserialize)]
pub struct LessonIn {
  #[serde(rename = "lessonId")]
  pub lesson_id: String,
}

#[derive(Deserialize)]
pub struct ResponseIn {
  #[serde(rename = "questionId")]
  pub question_id: String,
  pub value: ResponseValue,
}

#[derive(Deserialize)]
pub struct SubmitIn {
  #[serde(rename = "weekIndex")]
  pub week_index: usize,
}

#[derive(Serialize)]
pub struct SubmitOut {
  pub submitted: bool,
  pub week: u32,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
