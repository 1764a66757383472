//! Sign-in session and the per-course player lifecycle.
//!
//! `PlayerState` is the explicit lifecycle: `Unauthenticated` and `NotFound`
//! are terminal, `Loading` moves to `Ready` once course data and stored
//! records are available.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::PlayerTimings;
use crate::domain::Course;
use crate::error::{PlayerError, StorageError};
use crate::navigation::{self, Navigator};
use crate::progress::ProgressTracker;
use crate::remote::RemoteClient;
use crate::responses::{RemoteSync, ResponseStore};
use crate::storage::{submissions_key, LocalStorage, AUTH_TOKEN_KEY};

/// Bearer token of the signed-in user, passed explicitly to whoever needs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
  pub token: String,
}

impl Session {
  /// Restore a previously stored token.
  pub fn restore(storage: &LocalStorage) -> Option<Self> {
    storage
      .load_string(AUTH_TOKEN_KEY)
      .filter(|t| !t.trim().is_empty())
      .map(|token| Self { token })
  }

  pub fn sign_in(storage: &LocalStorage, token: &str) -> Result<Self, StorageError> {
    storage.try_save(AUTH_TOKEN_KEY, token)?;
    info!(target: "course_player", "Signed in");
    Ok(Self { token: token.to_string() })
  }

  /// Clears the whole store, progress and responses included.
  pub fn sign_out(storage: &LocalStorage) -> Result<(), StorageError> {
    storage.clear()?;
    info!(target: "course_player", "Signed out; local storage cleared");
    Ok(())
  }
}

/// Everything a loaded course needs: reference data, selection, records.
pub struct CoursePlayer {
  pub course: Arc<Course>,
  pub navigator: Navigator,
  pub progress: ProgressTracker,
  pub responses: ResponseStore,
  storage: LocalStorage,
}

impl CoursePlayer {
  pub fn course_id(&self) -> &str {
    &self.course.id
  }

  pub fn select_week(&mut self, index: usize) -> Result<(), PlayerError> {
    self.navigator.select_week(&self.course, index)
  }

  pub fn select_lesson(&mut self, lesson_id: &str) -> Result<(), PlayerError> {
    self.navigator.select_lesson(&self.course, lesson_id)
  }

  /// Unknown lessons are rejected so the record only holds course lessons.
  pub fn mark_complete(&mut self, lesson_id: &str) -> Result<bool, PlayerError> {
    if self.course.find_lesson(lesson_id).is_none() {
      return Err(PlayerError::NotFound(format!("lesson {lesson_id}")));
    }
    Ok(self.progress.mark_complete(lesson_id))
  }

  pub fn completion_percentage(&self) -> u8 {
    navigation::completion_percentage(&self.course, self.progress.record())
  }

  /// Submit the workbook of the week at `week_index`: both predicates must
  /// hold, then responses are flushed and the week recorded.
  #[instrument(level = "info", skip(self), fields(course_id = %self.course.id))]
  pub async fn submit_workbook(&mut self, week_index: usize) -> Result<u32, PlayerError> {
    let week = self
      .course
      .week(week_index)
      .ok_or_else(|| PlayerError::NotFound(format!("week index {week_index}")))?;
    let responses = self.responses.snapshot().await;
    let blockers = navigation::submit_blockers(week, self.progress.record(), &responses);
    if !blockers.is_empty() {
      warn!(target: "workbook", week = week.number, ?blockers, "Submit rejected");
      return Err(PlayerError::SubmitBlocked(blockers));
    }

    let number = week.number;
    self.responses.flush_for_submit(number).await?;
    let key = submissions_key(&self.course.id);
    let mut submitted: Vec<u32> = self.storage.load(&key).unwrap_or_default();
    if !submitted.contains(&number) {
      submitted.push(number);
      submitted.sort_unstable();
    }
    self.storage.try_save(&key, &submitted)?;
    info!(target: "workbook", week = number, "Workbook submitted");
    Ok(number)
  }

  pub fn submitted_weeks(&self) -> Vec<u32> {
    self.storage.load(&submissions_key(&self.course.id)).unwrap_or_default()
  }
}

pub enum PlayerState {
  Unauthenticated,
  Loading { course_id: String },
  Ready(CoursePlayer),
  NotFound { course_id: String },
}

impl std::fmt::Debug for PlayerState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PlayerState::Unauthenticated => f.write_str("Unauthenticated"),
      PlayerState::Loading { course_id } => write!(f, "Loading({course_id})"),
      PlayerState::Ready(p) => write!(f, "Ready({})", p.course_id()),
      PlayerState::NotFound { course_id } => write!(f, "NotFound({course_id})"),
    }
  }
}

impl PlayerState {
  /// Leave `Unauthenticated` only if a session exists.
  pub fn mount(session: Option<&Session>, course_id: &str) -> Self {
    match session {
      Some(_) => PlayerState::Loading { course_id: course_id.to_string() },
      None => PlayerState::Unauthenticated,
    }
  }

  /// Resolve `Loading` into `Ready` or `NotFound`. Other states are returned unchanged.
  #[instrument(level = "info", skip_all)]
  pub fn load(
    self,
    course: Option<Arc<Course>>,
    storage: &LocalStorage,
    timings: PlayerTimings,
    remote: Option<(RemoteClient, Session)>,
  ) -> Self {
    let PlayerState::Loading { course_id } = self else { return self };
    let Some(course) = course.filter(|c| c.id == course_id) else {
      warn!(target: "course_player", %course_id, "Course not found");
      return PlayerState::NotFound { course_id };
    };

    let remote = remote.map(|(client, session)| RemoteSync { client, token: session.token });
    let progress = ProgressTracker::load(storage.clone(), &course.id);
    let responses = ResponseStore::load(storage.clone(), &course.id, timings, remote);
    info!(target: "course_player", %course_id, completed = progress.record().count_complete(), "Course loaded");
    PlayerState::Ready(CoursePlayer {
      navigator: Navigator::new(&course),
      course,
      progress,
      responses,
      storage: storage.clone(),
    })
  }

  pub fn into_ready(self) -> Result<CoursePlayer, PlayerError> {
    match self {
      PlayerState::Ready(p) => Ok(p),
      PlayerState::Unauthenticated => Err(PlayerError::Unauthenticated),
      PlayerState::NotFound { course_id } | PlayerState::Loading { course_id } => {
        Err(PlayerError::NotFound(format!("course {course_id}")))
      }
    }
  }
}
