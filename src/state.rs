//! Application state: course catalog, local storage, remote client, and the
//! players of the courses opened so far.
//!
//! This module owns:
//!   - the catalog (built-in seeds, overridden by config courses with the same id)
//!   - the persistence adapter every player writes through
//!   - optional remote API client
//!   - one `CoursePlayer` per opened course, each behind its own lock

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::{PlayerTimings, ServerConfig};
use crate::domain::Course;
use crate::error::PlayerError;
use crate::remote::RemoteClient;
use crate::seeds::seed_courses;
use crate::session::{CoursePlayer, PlayerState, Session};
use crate::storage::{FileBackend, LocalStorage};

pub type SharedPlayer = Arc<Mutex<CoursePlayer>>;

pub struct AppState {
  pub catalog: HashMap<String, Arc<Course>>,
  pub storage: LocalStorage,
  pub timings: PlayerTimings,
  pub remote: Option<RemoteClient>,
  players: RwLock<HashMap<String, SharedPlayer>>,
}

impl AppState {
  /// Build state from config: file-backed storage under `storage_dir`.
  #[instrument(level = "info", skip_all)]
  pub fn new(cfg: &ServerConfig) -> Self {
    let storage = LocalStorage::new(Arc::new(FileBackend::new(cfg.storage_dir.clone())));
    let remote = RemoteClient::new(cfg.remote_base_url.as_deref(), cfg.remote_timeout);
    if let Some(rc) = &remote {
      info!(target: "course_player", base_url = %rc.base_url, "Remote API enabled.");
    } else {
      info!(target: "course_player", "Remote API disabled (no REMOTE_BASE_URL). Responses stay local.");
    }
    Self::with_storage(storage, cfg.course_config.courses.clone(), cfg.course_config.player, remote)
  }

  pub fn with_storage(
    storage: LocalStorage,
    config_courses: Vec<Course>,
    timings: PlayerTimings,
    remote: Option<RemoteClient>,
  ) -> Self {
    let mut catalog = HashMap::<String, Arc<Course>>::new();
    for c in seed_courses() {
      catalog.insert(c.id.clone(), Arc::new(c));
    }
    for c in config_courses {
      if catalog.contains_key(&c.id) {
        warn!(target: "course_player", course_id = %c.id, "Config course overrides built-in course");
      }
      catalog.insert(c.id.clone(), Arc::new(c));
    }
    for course in catalog.values() {
      info!(target: "course_player", course_id = %course.id, weeks = course.weeks.len(), lessons = course.total_lessons(), "Startup course inventory");
    }

    Self { catalog, storage, timings, remote, players: RwLock::new(HashMap::new()) }
  }

  pub fn session(&self) -> Option<Session> {
    Session::restore(&self.storage)
  }

  /// Check a presented bearer token against the stored session.
  pub fn authorize(&self, presented: Option<&str>) -> Result<Session, PlayerError> {
    match (self.session(), presented) {
      (Some(session), Some(token)) if session.token == token => Ok(session),
      _ => Err(PlayerError::Unauthenticated),
    }
  }

  /// Return the open player for `course_id`, mounting and loading it on first use.
  #[instrument(level = "debug", skip(self, session))]
  pub async fn open_player(&self, session: &Session, course_id: &str) -> Result<SharedPlayer, PlayerError> {
    if let Some(p) = self.players.read().await.get(course_id) {
      return Ok(p.clone());
    }

    let mut players = self.players.write().await;
    if let Some(p) = players.get(course_id) {
      return Ok(p.clone());
    }
    let remote = self.remote.clone().map(|rc| (rc, session.clone()));
    let player = PlayerState::mount(Some(session), course_id)
      .load(self.catalog.get(course_id).cloned(), &self.storage, self.timings, remote)
      .into_ready()?;
    let shared = Arc::new(Mutex::new(player));
    players.insert(course_id.to_string(), shared.clone());
    Ok(shared)
  }

  /// The player for `course_id` if it is already open. Never loads one.
  pub async fn loaded_player(&self, course_id: &str) -> Option<SharedPlayer> {
    self.players.read().await.get(course_id).cloned()
  }

  /// Flush unsaved edits of a course when its client goes away. Skipped once
  /// the session is no longer current (signed out or replaced).
  pub async fn release(&self, session: &Session, course_id: &str) {
    if self.authorize(Some(&session.token)).is_err() {
      debug!(target: "workbook", %course_id, "Session no longer current; nothing flushed");
      return;
    }
    let Some(player) = self.loaded_player(course_id).await else { return };
    let guard = player.lock().await;
    if let Err(e) = guard.responses.flush_now().await {
      warn!(target: "workbook", %course_id, error = %e, "Pending responses not flushed");
    }
  }

  /// Flush every open player's pending responses.
  pub async fn flush_all(&self) {
    let players: Vec<SharedPlayer> = self.players.read().await.values().cloned().collect();
    for p in players {
      let guard = p.lock().await;
      if let Err(e) = guard.responses.flush_now().await {
        warn!(target: "workbook", course_id = %guard.course_id(), error = %e, "Pending responses not flushed");
      }
    }
  }

  /// Flush, then drop all players and clear storage.
  pub async fn sign_out(&self) -> Result<(), PlayerError> {
    // remote sync still receives the final edits
    self.flush_all().await;
    self.players.write().await.clear();
    Session::sign_out(&self.storage)?;
    Ok(())
  }

  /// Store a new token. Open players hold the previous token, so they are dropped.
  pub async fn sign_in(&self, token: &str) -> Result<Session, PlayerError> {
    let token = token.trim();
    if token.is_empty() {
      return Err(PlayerError::InvalidRequest("token must not be empty".into()));
    }
    self.flush_all().await;
    self.players.write().await.clear();
    Ok(Session::sign_in(&self.storage, token)?)
  }
}
