//! Workbook response store.
//!
//! Every edit updates the in-memory record and restarts a single debounce
//! timer; only the last edit of a burst reaches storage. The per-question
//! save status follows the real outcome of the flush and is cleared a fixed
//! time after the flush settles. Remote pushes go through one worker per
//! store so they reach the remote in flush order.

use std::{
  collections::{BTreeSet, HashMap},
  sync::Arc,
};

use serde::Serialize;
use tokio::{
  sync::{mpsc, Mutex},
  task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};

use crate::config::PlayerTimings;
use crate::domain::{ResponseRecord, ResponseValue};
use crate::error::StorageError;
use crate::remote::RemoteClient;
use crate::storage::{responses_key, LocalStorage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
  Saving,
  Saved,
  Error,
}

/// Remote destination for flushed responses (client + bearer token).
#[derive(Clone)]
pub struct RemoteSync {
  pub client: RemoteClient,
  pub token: String,
}

/// One snapshot queued for the remote.
struct RemotePush {
  record: ResponseRecord,
  submitted_week: Option<u32>,
}

#[derive(Default)]
struct Inner {
  record: ResponseRecord,
  /// Key -> (status, edit generation that produced it).
  status: HashMap<String, (SaveStatus, u64)>,
  generation: u64,
  dirty: BTreeSet<String>,
  pending: Option<JoinHandle<()>>,
  outbox: Option<mpsc::UnboundedSender<RemotePush>>,
}

#[derive(Clone)]
pub struct ResponseStore {
  course_id: Arc<str>,
  storage: LocalStorage,
  timings: PlayerTimings,
  remote: Option<RemoteSync>,
  inner: Arc<Mutex<Inner>>,
}

impl ResponseStore {
  pub fn load(
    storage: LocalStorage,
    course_id: &str,
    timings: PlayerTimings,
    remote: Option<RemoteSync>,
  ) -> Self {
    let record = storage.load::<ResponseRecord>(&responses_key(course_id)).unwrap_or_default();
    Self {
      course_id: Arc::from(course_id),
      storage,
      timings,
      remote,
      inner: Arc::new(Mutex::new(Inner { record, ..Default::default() })),
    }
  }

  /// Record an answer and (re)start the debounce timer.
  #[instrument(level = "debug", skip(self, value), fields(course_id = %self.course_id))]
  pub async fn set_response(&self, key: &str, value: ResponseValue) {
    let mut inner = self.inner.lock().await;
    inner.record.set(key, value);
    inner.generation += 1;
    let generation = inner.generation;
    inner.status.insert(key.to_string(), (SaveStatus::Saving, generation));
    inner.dirty.insert(key.to_string());

    if let Some(prev) = inner.pending.take() {
      prev.abort();
    }
    let this = self.clone();
    let delay = self.timings.debounce();
    inner.pending = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let mut inner = this.inner.lock().await;
      // This task is the flush now; a later edit must not abort it.
      inner.pending = None;
      let _ = this.flush_locked(&mut inner, None);
    }));
  }

  /// Cancel the timer and flush right away.
  pub async fn flush_now(&self) -> Result<(), StorageError> {
    let mut inner = self.inner.lock().await;
    if let Some(prev) = inner.pending.take() {
      prev.abort();
    }
    self.flush_locked(&mut inner, None)
  }

  /// Flush now and push to the remote with a submission marker.
  pub async fn flush_for_submit(&self, week_number: u32) -> Result<(), StorageError> {
    let mut inner = self.inner.lock().await;
    if let Some(prev) = inner.pending.take() {
      prev.abort();
    }
    self.flush_locked(&mut inner, Some(week_number))
  }

  fn flush_locked(&self, inner: &mut Inner, submitted_week: Option<u32>) -> Result<(), StorageError> {
    if inner.dirty.is_empty() && submitted_week.is_none() {
      return Ok(());
    }
    let flushed_at = inner.generation;
    let keys: Vec<String> = std::mem::take(&mut inner.dirty).into_iter().collect();
    let result = self.storage.try_save(&responses_key(&self.course_id), &inner.record);

    let outcome = match &result {
      Ok(()) => {
        debug!(target: "workbook", course_id = %self.course_id, keys = keys.len(), entries = inner.record.len(), "Responses flushed");
        SaveStatus::Saved
      }
      Err(e) => {
        warn!(target: "workbook", course_id = %self.course_id, error = %e, "Response flush failed; edits remain in memory only");
        SaveStatus::Error
      }
    };
    for key in &keys {
      inner.status.insert(key.clone(), (outcome, flushed_at));
    }
    if result.is_err() {
      // retried by the next flush
      inner.dirty.extend(keys);
    }

    self.push_remote(inner, submitted_week);

    let this = self.clone();
    let display = self.timings.status_display();
    tokio::spawn(async move {
      tokio::time::sleep(display).await;
      let mut inner = this.inner.lock().await;
      inner.status.retain(|_, (status, edit)| *status == SaveStatus::Saving || *edit > flushed_at);
    });

    if result.is_ok() && submitted_week.is_some() {
      info!(target: "workbook", course_id = %self.course_id, week = ?submitted_week, "Responses flushed for submission");
    }
    result
  }

  /// Queue the current record for the remote, starting the worker on first use.
  fn push_remote(&self, inner: &mut Inner, submitted_week: Option<u32>) {
    let Some(remote) = self.remote.clone() else { return };
    let outbox = inner.outbox.get_or_insert_with(|| {
      let (tx, rx) = mpsc::unbounded_channel();
      tokio::spawn(push_in_order(remote, self.course_id.clone(), rx));
      tx
    });
    let push = RemotePush { record: inner.record.clone(), submitted_week };
    if outbox.send(push).is_err() {
      warn!(target: "workbook", course_id = %self.course_id, "Remote sync worker gone; push dropped");
    }
  }

  pub async fn get(&self, key: &str) -> Option<ResponseValue> {
    self.inner.lock().await.record.get(key).cloned()
  }

  pub async fn snapshot(&self) -> ResponseRecord {
    self.inner.lock().await.record.clone()
  }

  pub async fn status(&self, key: &str) -> Option<SaveStatus> {
    self.inner.lock().await.status.get(key).map(|(s, _)| *s)
  }

  pub async fn statuses(&self) -> HashMap<String, SaveStatus> {
    self.inner.lock().await.status.iter().map(|(k, (s, _))| (k.clone(), *s)).collect()
  }

  pub async fn has_pending_flush(&self) -> bool {
    self.inner.lock().await.pending.is_some()
  }
}

async fn push_in_order(remote: RemoteSync, course_id: Arc<str>, mut rx: mpsc::UnboundedReceiver<RemotePush>) {
  while let Some(push) = rx.recv().await {
    let res = remote
      .client
      .save_responses(&course_id, &remote.token, &push.record, push.submitted_week)
      .await;
    if let Err(e) = res {
      warn!(target: "workbook", %course_id, error = %e, "Remote save failed; not retried");
    }
  }
}
