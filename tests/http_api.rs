use std::sync::Arc;

use axum::{
  body::{to_bytes, Body},
  http::{header, Method, Request, StatusCode},
  Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use course_player::config::PlayerTimings;
use course_player::routes::build_router;
use course_player::seeds::SEED_COURSE_ID;
use course_player::state::AppState;
use course_player::storage::{slides_key, LocalStorage};

fn router() -> (Router, LocalStorage) {
  let (storage, _mem) = LocalStorage::in_memory();
  let state = Arc::new(AppState::with_storage(storage.clone(), vec![], PlayerTimings::default(), None));
  (build_router(state), storage)
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(t) = token {
    req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
  }
  let req = match body {
    Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(b.to_string())),
    None => req.body(Body::empty()),
  }
  .unwrap();

  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

fn course(path: &str) -> String {
  format!("/api/v1/courses/{SEED_COURSE_ID}/{path}")
}

#[tokio::test]
async fn course_routes_require_a_session() {
  let (app, _) = router();
  let (status, body) = call(&app, Method::GET, &course("view"), None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "unauthenticated");
  assert_eq!(body["redirect"], "/login");

  call(&app, Method::POST, "/api/v1/session", None, Some(json!({"token": "tok"}))).await;
  let (status, _) = call(&app, Method::GET, &course("view"), Some("wrong"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, body) = call(&app, Method::GET, &course("view"), Some("tok"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["courseId"], SEED_COURSE_ID);
  assert_eq!(body["lesson"]["id"], "w1-l1");
  assert!(body["lesson"]["transcript"].is_null());
}

#[tokio::test]
async fn week_one_walkthrough_to_submission() {
  let (app, _) = router();
  let (status, _) = call(&app, Method::POST, "/api/v1/session", None, Some(json!({"token": "tok"}))).await;
  assert_eq!(status, StatusCode::OK);
  let tok = Some("tok");

  let (status, body) = call(&app, Method::POST, &course("submit"), tok, Some(json!({"weekIndex": 0}))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "submit_blocked");

  for id in ["w1-l1", "w1-l2", "w1-l3"] {
    let (status, _) = call(&app, Method::POST, &course("complete"), tok, Some(json!({"lessonId": id}))).await;
    assert_eq!(status, StatusCode::OK);
  }
  for (q, v) in [("w1-q1", json!("A friend recommended it")), ("w1-q2", json!(1)), ("w1-q3_2", json!("GP"))] {
    let (status, _) = call(&app, Method::POST, &course("responses"), tok, Some(json!({"questionId": q, "value": v}))).await;
    assert_eq!(status, StatusCode::OK);
  }

  let (_, view) = call(&app, Method::GET, &course("view?transcript=true"), tok, None).await;
  assert_eq!(view["completionPercentage"], 50);
  assert_eq!(view["weeks"][0]["complete"], true);
  assert_eq!(view["workbook"]["canSubmit"], true);
  assert!(view["lesson"]["transcript"].is_string());

  let (status, body) = call(&app, Method::POST, &course("submit"), tok, Some(json!({"weekIndex": 0}))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({"submitted": true, "week": 1}));

  let (_, view) = call(&app, Method::GET, &course("view"), tok, None).await;
  assert_eq!(view["workbook"]["submitted"], true);
}

#[tokio::test]
async fn navigation_errors_map_to_not_found() {
  let (app, _) = router();
  call(&app, Method::POST, "/api/v1/session", None, Some(json!({"token": "tok"}))).await;
  let tok = Some("tok");

  let (status, body) = call(&app, Method::POST, &course("week"), tok, Some(json!({"index": 2}))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["lesson"]["id"], "w3-l1");
  assert!(body["workbook"].is_null());

  let (status, _) = call(&app, Method::POST, &course("week"), tok, Some(json!({"index": 3}))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, body) = call(&app, Method::POST, &course("lesson"), tok, Some(json!({"lessonId": "w2-l2"}))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["weeks"][1]["current"], true);

  let (status, body) = call(&app, Method::GET, "/api/v1/courses/missing/view", tok, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn sign_out_clears_progress_and_session() {
  let (app, storage) = router();
  call(&app, Method::POST, "/api/v1/session", None, Some(json!({"token": "tok"}))).await;
  call(&app, Method::POST, &course("complete"), Some("tok"), Some(json!({"lessonId": "w1-l1"}))).await;

  let (status, body) = call(&app, Method::DELETE, "/api/v1/session", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["signed_in"], false);
  assert_eq!(storage.load::<Value>(&format!("course_progress_{SEED_COURSE_ID}")), None);

  let (status, _) = call(&app, Method::GET, &course("view"), Some("tok"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn published_slides_are_served_as_html() {
  let (app, storage) = router();
  call(&app, Method::POST, "/api/v1/session", None, Some(json!({"token": "tok"}))).await;
  storage.save(&slides_key(SEED_COURSE_ID, 1, 2), "<section>deck</section>");

  let req = Request::builder()
    .uri(course("weeks/1/lessons/2/slides"))
    .header(header::AUTHORIZATION, "Bearer tok")
    .body(Body::empty())
    .unwrap();
  let res = app.clone().oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::OK);
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"<section>deck</section>");

  let (status, _) = call(&app, Method::GET, &course("weeks/1/lessons/3/slides"), Some("tok"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remote_login_is_unavailable_without_remote_api() {
  let (app, _) = router();
  let (status, body) = call(&app, Method::POST, "/api/v1/login", None, Some(json!({"email": "a@b.c", "password": "x"}))).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert_eq!(body["error"], "remote");
}

#[tokio::test]
async fn malformed_bodies_use_the_error_contract() {
  let (app, _) = router();
  call(&app, Method::POST, "/api/v1/session", None, Some(json!({"token": "tok"}))).await;
  let tok = Some("tok");

  let (status, body) = call(&app, Method::POST, &course("responses"), tok, Some(json!({"value": true}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "invalid_request");
  assert!(body["message"].as_str().unwrap().starts_with("invalid request:"));

  let (status, body) = call(&app, Method::POST, &course("week"), tok, Some(json!({"index": "second"}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "invalid_request");

  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/v1/session")
    .body(Body::from(r#"{"token":"x"}"#))
    .unwrap();
  let res = app.clone().oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
