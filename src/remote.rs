//! Minimal client for the remote course API: login and workbook sync.
//!
//! Calls carry a request timeout and are never retried. We log status codes
//! and payload sizes, never tokens or answer contents.

use std::time::Duration;

use reqwest::{
  header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
  StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::ResponseRecord;
use crate::error::RemoteError;
use crate::util::trunc_for_log;

const CLIENT_UA: &str = "course-player/0.1";

#[derive(Clone)]
pub struct RemoteClient {
  pub client: reqwest::Client,
  pub base_url: String,
}

#[derive(Serialize)]
struct LoginReq<'a> {
  email: &'a str,
  password: &'a str,
}

#[derive(Deserialize)]
struct LoginResp {
  #[serde(default, alias = "access_token")]
  token: String,
}

#[derive(Serialize)]
struct ResponsesReq<'a> {
  #[serde(rename = "courseId")]
  course_id: &'a str,
  responses: &'a ResponseRecord,
  #[serde(rename = "submittedWeek", skip_serializing_if = "Option::is_none")]
  submitted_week: Option<u32>,
}

impl RemoteClient {
  /// Construct the client if a base URL is configured; otherwise return None.
  pub fn new(base_url: Option<&str>, timeout: Duration) -> Option<Self> {
    let base_url = base_url?.trim_end_matches('/').to_string();
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    Some(Self { client, base_url })
  }

  /// Exchange credentials for a bearer token.
  #[instrument(level = "info", skip(self, email, password))]
  pub async fn login(&self, email: &str, password: &str) -> Result<String, RemoteError> {
    let url = format!("{}/auth/login", self.base_url);
    let res = self.client.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .header("x-request-id", Uuid::new_v4().to_string())
      .json(&LoginReq { email, password })
      .send().await?;

    match res.status() {
      s if s.is_success() => {}
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(RemoteError::Unauthorized),
      s => {
        let body = res.text().await.unwrap_or_default();
        error!(target: "course_player", status = %s, body = %trunc_for_log(&body, 300), "Remote login failed");
        return Err(RemoteError::HttpStatus(s));
      }
    }

    let body: LoginResp = res.json().await?;
    let token = body.token.trim().to_string();
    if token.is_empty() {
      return Err(RemoteError::EmptyToken);
    }
    info!(target: "course_player", "Remote login succeeded");
    Ok(token)
  }

  /// Push the whole response record. `submitted_week` marks a workbook submission.
  #[instrument(level = "info", skip(self, token, record), fields(entries = record.len()))]
  pub async fn save_responses(
    &self,
    course_id: &str,
    token: &str,
    record: &ResponseRecord,
    submitted_week: Option<u32>,
  ) -> Result<(), RemoteError> {
    let url = format!("{}/courses/{}/responses", self.base_url, course_id);
    let res = self.client.put(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", token))
      .header("x-request-id", Uuid::new_v4().to_string())
      .json(&ResponsesReq { course_id, responses: record, submitted_week })
      .send().await?;

    match res.status() {
      s if s.is_success() => {
        info!(target: "workbook", %course_id, status = %s, "Remote save accepted");
        Ok(())
      }
      StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
      s => {
        let body = res.text().await.unwrap_or_default();
        error!(target: "workbook", %course_id, status = %s, body = %trunc_for_log(&body, 300), "Remote save rejected");
        Err(RemoteError::HttpStatus(s))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn disabled_without_base_url() {
    assert!(RemoteClient::new(None, Duration::from_secs(1)).is_none());
    let rc = RemoteClient::new(Some("https://api.example.test/v1/"), Duration::from_secs(1)).unwrap();
    assert_eq!(rc.base_url, "https://api.example.test/v1");
  }

  #[test]
  fn sync_payload_shape() {
    let mut rec = ResponseRecord::new();
    rec.set("q1", "fine".into());
    let body = serde_json::to_value(ResponsesReq { course_id: "c1", responses: &rec, submitted_week: Some(2) }).unwrap();
    assert_eq!(body, serde_json::json!({"courseId": "c1", "responses": {"q1": "fine"}, "submittedWeek": 2}));
  }
}
