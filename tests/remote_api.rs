use std::{sync::Arc, time::Duration};

use axum::{
  body::{to_bytes, Body},
  extract::{Path, State},
  http::{header, HeaderMap, Method, Request, StatusCode},
  response::{IntoResponse, Response},
  routing::{post, put},
  Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::mpsc};
use tower::ServiceExt;

use course_player::config::PlayerTimings;
use course_player::error::RemoteError;
use course_player::remote::RemoteClient;
use course_player::routes::build_router;
use course_player::seeds::SEED_COURSE_ID;
use course_player::state::AppState;
use course_player::storage::LocalStorage;

/// (authorization header, course id, body) of every sync the remote received.
type Pushes = mpsc::UnboundedSender<(String, String, Value)>;

async fn fake_login(Json(body): Json<Value>) -> Response {
  if body["password"] == "secret" {
    Json(json!({ "access_token": "remote-tok" })).into_response()
  } else {
    StatusCode::UNAUTHORIZED.into_response()
  }
}

async fn fake_save(
  State(pushes): State<Pushes>,
  Path(course_id): Path<String>,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> StatusCode {
  let auth = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string();
  let _ = pushes.send((auth, course_id, body));
  StatusCode::NO_CONTENT
}

/// Serve a fake remote API on an ephemeral port.
async fn remote_api() -> (RemoteClient, mpsc::UnboundedReceiver<(String, String, Value)>) {
  let (tx, rx) = mpsc::unbounded_channel();
  let app = Router::new()
    .route("/auth/login", post(fake_login))
    .route("/courses/:course_id/responses", put(fake_save))
    .with_state(tx);
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  let client = RemoteClient::new(Some(&format!("http://{addr}/")), Duration::from_secs(5)).unwrap();
  (client, rx)
}

fn fast_timings() -> PlayerTimings {
  PlayerTimings { debounce_ms: 50, status_display_ms: 50 }
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
  let req = Request::builder()
    .method(Method::POST)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap();
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn login_exchanges_credentials_for_a_token() {
  let (client, _pushes) = remote_api().await;
  assert_eq!(client.login("a@b.c", "secret").await.unwrap(), "remote-tok");
  assert!(matches!(client.login("a@b.c", "nope").await, Err(RemoteError::Unauthorized)));
}

#[tokio::test]
async fn rejected_login_sends_client_back_to_login() {
  let (client, _pushes) = remote_api().await;
  let (storage, _) = LocalStorage::in_memory();
  let state = Arc::new(AppState::with_storage(storage, vec![], fast_timings(), Some(client)));
  let app = build_router(state.clone());

  let (status, body) = post_json(&app, "/api/v1/login", json!({"email": "a@b.c", "password": "nope"})).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "unauthenticated");
  assert_eq!(body["redirect"], "/login");
  assert!(state.session().is_none());

  let (status, body) = post_json(&app, "/api/v1/login", json!({"email": "a@b.c", "password": "secret"})).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["signed_in"], true);
  assert_eq!(state.session().map(|s| s.token).as_deref(), Some("remote-tok"));
}

#[tokio::test]
async fn flushed_responses_reach_the_remote_in_order() {
  let (client, mut pushes) = remote_api().await;
  let (storage, _) = LocalStorage::in_memory();
  let state = AppState::with_storage(storage, vec![], fast_timings(), Some(client));
  let session = state.sign_in("remote-tok").await.unwrap();
  let player = state.open_player(&session, SEED_COURSE_ID).await.unwrap();
  let responses = player.lock().await.responses.clone();

  responses.set_response("w1-q1", "first".into()).await;
  responses.set_response("w1-q1", "second".into()).await;
  let (auth, course_id, body) = tokio::time::timeout(Duration::from_secs(5), pushes.recv())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(auth, "Bearer remote-tok");
  assert_eq!(course_id, SEED_COURSE_ID);
  assert_eq!(body["courseId"], SEED_COURSE_ID);
  assert_eq!(body["responses"], json!({"w1-q1": "second"}));
  assert!(body.get("submittedWeek").is_none());

  responses.set_response("w1-q2", 2.0.into()).await;
  responses.flush_now().await.unwrap();
  responses.flush_for_submit(1).await.unwrap();
  let (_, _, body) = tokio::time::timeout(Duration::from_secs(5), pushes.recv()).await.unwrap().unwrap();
  assert_eq!(body["responses"]["w1-q2"], 2.0);
  assert!(body.get("submittedWeek").is_none());
  let (_, _, body) = tokio::time::timeout(Duration::from_secs(5), pushes.recv()).await.unwrap().unwrap();
  assert_eq!(body["submittedWeek"], 1);
}
