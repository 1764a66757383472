//! Course navigation: current week/lesson selection plus the pure
//! completion predicates that gate workbook submission.
//!
//! Nothing here is cached; every predicate is recomputed from the course
//! and the two records on each call.

use crate::domain::{category_key, Course, ProgressRecord, QuestionKind, ResponseRecord, Week};
use crate::error::PlayerError;

/// `round(100 * completed / total)`, counting only lessons of this course.
pub fn completion_percentage(course: &Course, progress: &ProgressRecord) -> u8 {
  let total = course.total_lessons();
  if total == 0 {
    return 0;
  }
  let done = course.lesson_ids().filter(|id| progress.is_complete(id)).count();
  ((100.0 * done as f64 / total as f64).round() as u8).min(100)
}

/// True iff every lesson of the week is complete.
pub fn is_week_complete(week: &Week, progress: &ProgressRecord) -> bool {
  week.lessons.iter().all(|l| progress.is_complete(&l.id))
}

/// True iff every required question has a non-empty answer. A required
/// category mapping needs at least one answered category. Weeks without a
/// workbook have nothing to answer.
pub fn has_answered_all_required(week: &Week, responses: &ResponseRecord) -> bool {
  let Some(workbook) = &week.workbook else { return true };
  workbook.questions().filter(|q| q.required).all(|q| match &q.kind {
    QuestionKind::CategoryMapping { categories } => {
      (0..categories.len()).any(|i| responses.is_answered(&category_key(&q.id, i)))
    }
    QuestionKind::FreeText { .. } | QuestionKind::Scale { .. } => responses.is_answered(&q.id),
  })
}

/// Why submission is currently blocked; empty when it is allowed.
pub fn submit_blockers(week: &Week, progress: &ProgressRecord, responses: &ResponseRecord) -> Vec<String> {
  let mut reasons = Vec::new();
  if week.workbook.is_none() {
    reasons.push(format!("week {} has no workbook", week.number));
    return reasons;
  }
  if !is_week_complete(week, progress) {
    reasons.push("not all lessons in this week are complete".to_string());
  }
  if !has_answered_all_required(week, responses) {
    reasons.push("required workbook questions are unanswered".to_string());
  }
  reasons
}

pub fn can_submit_workbook(week: &Week, progress: &ProgressRecord, responses: &ResponseRecord) -> bool {
  submit_blockers(week, progress, responses).is_empty()
}

/// Current week/lesson selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigator {
  week_index: usize,
  lesson_id: Option<String>,
}

impl Navigator {
  /// Start at the first lesson of the first week.
  pub fn new(course: &Course) -> Self {
    let lesson_id = course.weeks.first().and_then(|w| w.lessons.first()).map(|l| l.id.clone());
    Self { week_index: 0, lesson_id }
  }

  pub fn week_index(&self) -> usize {
    self.week_index
  }

  pub fn lesson_id(&self) -> Option<&str> {
    self.lesson_id.as_deref()
  }

  /// Select a week; the current lesson moves to the week's first lesson.
  pub fn select_week(&mut self, course: &Course, index: usize) -> Result<(), PlayerError> {
    let week = course
      .week(index)
      .ok_or_else(|| PlayerError::NotFound(format!("week index {index}")))?;
    self.week_index = index;
    self.lesson_id = week.lessons.first().map(|l| l.id.clone());
    Ok(())
  }

  /// Select a lesson and the week that contains it.
  pub fn select_lesson(&mut self, course: &Course, lesson_id: &str) -> Result<(), PlayerError> {
    let (week_index, lesson) = course
      .find_lesson(lesson_id)
      .ok_or_else(|| PlayerError::NotFound(format!("lesson {lesson_id}")))?;
    self.week_index = week_index;
    self.lesson_id = Some(lesson.id.clone());
    Ok(())
  }
}
