//! Lesson progress tracker. Completion is one-way and persisted
//! synchronously on every change.

use tracing::{info, instrument};

use crate::domain::ProgressRecord;
use crate::storage::{progress_key, LocalStorage};

pub struct ProgressTracker {
  course_id: String,
  record: ProgressRecord,
  storage: LocalStorage,
}

impl ProgressTracker {
  /// Restore the stored record for `course_id`, or start empty.
  pub fn load(storage: LocalStorage, course_id: &str) -> Self {
    let record = storage.load::<ProgressRecord>(&progress_key(course_id)).unwrap_or_default();
    Self { course_id: course_id.to_string(), record, storage }
  }

  /// Mark a lesson complete and write the whole record immediately.
  /// Repeated calls are no-ops and do not touch storage.
  #[instrument(level = "info", skip(self), fields(course_id = %self.course_id))]
  pub fn mark_complete(&mut self, lesson_id: &str) -> bool {
    let changed = self.record.complete(lesson_id);
    if changed {
      self.storage.save(&progress_key(&self.course_id), &self.record);
      info!(target: "progress", course_id = %self.course_id, %lesson_id, completed = self.completed_count(), "Lesson completed");
    }
    changed
  }

  pub fn is_complete(&self, lesson_id: &str) -> bool {
    self.record.is_complete(lesson_id)
  }

  pub fn completed_count(&self) -> usize {
    self.record.count_complete()
  }

  pub fn record(&self) -> &ProgressRecord {
    &self.record
  }
}
