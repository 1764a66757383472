//! Local persistence adapter: a synchronous, best-effort key-value store
//! holding JSON values, the device-side equivalent of browser local storage.
//!
//! Keys are scoped by course only, never by user.

use std::{
  collections::HashMap,
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
  },
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::StorageError;

pub const AUTH_TOKEN_KEY: &str = "course_auth_token";

pub fn progress_key(course_id: &str) -> String {
  format!("course_progress_{course_id}")
}

pub fn responses_key(course_id: &str) -> String {
  format!("workbook_responses_{course_id}")
}

pub fn submissions_key(course_id: &str) -> String {
  format!("workbook_submissions_{course_id}")
}

pub fn slides_key(course_id: &str, week: u32, lesson: u32) -> String {
  format!("lesson_slides_{course_id}_{week}_{lesson}")
}

/// Raw string storage. Implementations are synchronous.
pub trait KeyValueBackend: Send + Sync {
  fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
  fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
  fn remove(&self, key: &str) -> Result<(), StorageError>;
  fn clear(&self) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key inside `dir`.
pub struct FileBackend {
  dir: PathBuf,
}

impl FileBackend {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    // Keys are built from course ids; keep them to a single path segment.
    let safe: String = key
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
      .collect();
    self.dir.join(format!("{safe}.json"))
  }
}

impl KeyValueBackend for FileBackend {
  fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
    fs::create_dir_all(&self.dir)?;
    let path = self.path_for(key);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, value)?;
    fs::rename(&tmp, &path)?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    match fs::remove_file(self.path_for(key)) {
      Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
      _ => Ok(()),
    }
  }

  fn clear(&self) -> Result<(), StorageError> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
      Err(e) => return Err(e.into()),
    };
    for entry in entries {
      let path = entry?.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        fs::remove_file(path)?;
      }
    }
    Ok(())
  }
}

/// In-process map. Counts writes and can be switched to reject them,
/// which is how a full or disabled store is simulated.
#[derive(Default)]
pub struct MemoryBackend {
  entries: Mutex<HashMap<String, String>>,
  writes: AtomicUsize,
  reject_writes: AtomicBool,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn write_count(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn set_reject_writes(&self, reject: bool) {
    self.reject_writes.store(reject, Ordering::SeqCst);
  }

  pub fn raw(&self, key: &str) -> Option<String> {
    self.entries.lock().ok()?.get(key).cloned()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
    self.entries
      .lock()
      .map_err(|_| StorageError::Unavailable("memory backend lock poisoned".into()))
  }
}

impl KeyValueBackend for MemoryBackend {
  fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
    if self.reject_writes.load(Ordering::SeqCst) {
      return Err(StorageError::QuotaExceeded);
    }
    self.lock()?.insert(key.to_string(), value.to_string());
    self.writes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<(), StorageError> {
    self.lock()?.clear();
    Ok(())
  }
}

/// JSON encode/decode on top of a backend.
#[derive(Clone)]
pub struct LocalStorage {
  backend: Arc<dyn KeyValueBackend>,
}

impl LocalStorage {
  pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
    Self { backend }
  }

  pub fn in_memory() -> (Self, Arc<MemoryBackend>) {
    let mem = Arc::new(MemoryBackend::new());
    (Self::new(mem.clone()), mem)
  }

  /// Missing, unreadable and undecodable values all come back as `None`.
  #[instrument(level = "debug", skip(self))]
  pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.backend.read(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(target: "storage", %key, error = %e, "Storage read failed");
        return None;
      }
    };
    match serde_json::from_str(&raw) {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(target: "storage", %key, error = %e, "Stored value is not valid JSON for this shape; ignoring");
        None
      }
    }
  }

  /// Encode and write, reporting the outcome.
  #[instrument(level = "debug", skip(self, value))]
  pub fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    self.backend.write(key, &raw)?;
    debug!(target: "storage", %key, bytes = raw.len(), "Saved");
    Ok(())
  }

  /// Best effort: failures are logged and dropped.
  pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    if let Err(e) = self.try_save(key, value) {
      warn!(target: "storage", %key, error = %e, "Storage write failed; value not persisted");
    }
  }

  pub fn load_string(&self, key: &str) -> Option<String> {
    self.load::<String>(key)
  }

  pub fn remove(&self, key: &str) -> Result<(), StorageError> {
    self.backend.remove(key)
  }

  pub fn clear(&self) -> Result<(), StorageError> {
    self.backend.clear()
  }
}
