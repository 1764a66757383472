//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! A connection is bound to one course by its first `open` message; the
//! token it carries is checked like a bearer header.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::error::PlayerError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::Session;
use crate::state::AppState;
use crate::view::ViewOptions;

/// Course binding established by `open`.
struct Bound {
  session: Session,
  course_id: String,
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "course_player", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(conn = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "course_player", "WebSocket connected");
  let mut bound: Option<Bound> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "course_player", kind = incoming.kind(), "WS received");
            handle_client_ws(incoming, &state, &mut bound).await
          }
          Err(e) => {
            debug!(target: "course_player", bytes = txt.len(), error = %e, "WS message rejected");
            error_msg(PlayerError::InvalidRequest(format!("Invalid JSON: {}", e)))
          }
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "error": "internal", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "course_player", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  if let Some(b) = &bound {
    state.release(&b.session, &b.course_id).await;
  }
  info!(target: "course_player", "WebSocket disconnected");
}

fn error_msg(err: PlayerError) -> ServerWsMessage {
  ServerWsMessage::Error { error: err.to_body() }
}

fn view_msg(res: Result<crate::view::LessonView, PlayerError>) -> ServerWsMessage {
  match res {
    Ok(view) => ServerWsMessage::View { view: Box::new(view) },
    Err(e) => error_msg(e),
  }
}

#[instrument(level = "info", skip_all, fields(kind = msg.kind()))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, bound: &mut Option<Bound>) -> ServerWsMessage {
  if let ClientWsMessage::Ping = msg {
    return ServerWsMessage::Pong;
  }
  if let ClientWsMessage::Open { course_id, token } = msg {
    let session = match state.authorize(Some(&token)) {
      Ok(s) => s,
      Err(e) => return error_msg(e),
    };
    let res = current_view(state, &session, &course_id, ViewOptions::default()).await;
    if res.is_ok() {
      info!(target: "course_player", %course_id, "WS bound to course");
      *bound = Some(Bound { session, course_id });
    }
    return view_msg(res);
  }

  let Some(Bound { session, course_id }) = bound.as_ref() else {
    return error_msg(PlayerError::Unauthenticated);
  };
  // The stored token may have changed since `open`.
  if let Err(e) = state.authorize(Some(&session.token)) {
    return error_msg(e);
  }

  match msg {
    ClientWsMessage::View { transcript } => {
      view_msg(current_view(state, session, course_id, ViewOptions { show_transcript: transcript }).await)
    }
    ClientWsMessage::SelectWeek { index } => view_msg(select_week(state, session, course_id, index).await),
    ClientWsMessage::SelectLesson { lesson_id } => {
      view_msg(select_lesson(state, session, course_id, &lesson_id).await)
    }
    ClientWsMessage::MarkComplete { lesson_id } => {
      let res = mark_complete(state, session, course_id, &lesson_id).await;
      if let Ok(v) = &res {
        tracing::info!(target: "progress", %course_id, %lesson_id, pct = v.completion_percentage, "WS lesson completed");
      }
      view_msg(res)
    }
    ClientWsMessage::SetResponse { question_id, value } => {
      view_msg(set_response(state, session, course_id, &question_id, value).await)
    }
    ClientWsMessage::SubmitWorkbook { week_index } => {
      match submit_workbook(state, session, course_id, week_index).await {
        Ok(week) => ServerWsMessage::Submitted { week },
        Err(e) => error_msg(e),
      }
    }
    ClientWsMessage::Ping | ClientWsMessage::Open { .. } => ServerWsMessage::Pong,
  }
}
