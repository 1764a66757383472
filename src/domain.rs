//! Domain models: course reference data (weeks, lessons, workbooks) and the
//! two per-course records mutated at runtime (progress and responses).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Immutable course reference data.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Course {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub weeks: Vec<Week>,
}

impl Course {
  pub fn week(&self, index: usize) -> Option<&Week> {
    self.weeks.get(index)
  }

  /// Find a lesson and the index of the week that contains it.
  pub fn find_lesson(&self, lesson_id: &str) -> Option<(usize, &Lesson)> {
    self.weeks.iter().enumerate().find_map(|(wi, w)| {
      w.lessons.iter().find(|l| l.id == lesson_id).map(|l| (wi, l))
    })
  }

  pub fn total_lessons(&self) -> usize {
    self.weeks.iter().map(|w| w.lessons.len()).sum()
  }

  pub fn lesson_ids(&self) -> impl Iterator<Item = &str> {
    self.weeks.iter().flat_map(|w| w.lessons.iter().map(|l| l.id.as_str()))
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Week {
  pub number: u32,
  pub title: String,
  #[serde(default)]
  pub lessons: Vec<Lesson>,
  #[serde(default)]
  pub workbook: Option<Workbook>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
  #[default]
  Video,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
  pub id: String,
  pub title: String,
  /// Display label, e.g. "12 min".
  pub duration: String,
  #[serde(default)]
  pub content_type: ContentType,
  #[serde(default)]
  pub transcript: String,
  #[serde(default)]
  pub video_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workbook {
  #[serde(default)]
  pub title: String,
  pub groups: Vec<QuestionGroup>,
}

impl Workbook {
  pub fn questions(&self) -> impl Iterator<Item = &Question> {
    self.groups.iter().flat_map(|g| g.questions.iter())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionGroup {
  pub id: String,
  pub title: String,
  pub questions: Vec<Question>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Question {
  pub id: String,
  pub prompt: String,
  #[serde(default)]
  pub required: bool,
  #[serde(flatten)]
  pub kind: QuestionKind,
}

/// Type tag driving both form rendering and the "answered" predicate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
  FreeText {
    #[serde(default)]
    placeholder: Option<String>,
  },
  Scale {
    min: i32,
    max: i32,
    #[serde(default)]
    min_label: Option<String>,
    #[serde(default)]
    max_label: Option<String>,
    /// Optional free-text prompt stored under `<id>_followup`.
    #[serde(default)]
    followup: Option<String>,
  },
  CategoryMapping {
    categories: Vec<String>,
  },
}

/// Key under which the follow-up answer of a scale question is stored.
pub fn followup_key(question_id: &str) -> String {
  format!("{question_id}_followup")
}

/// Key under which one category of a mapping question is stored.
pub fn category_key(question_id: &str, index: usize) -> String {
  format!("{question_id}_{index}")
}

/// A single workbook answer: string, number or nested object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseValue {
  Number(f64),
  Text(String),
  Object(serde_json::Map<String, serde_json::Value>),
}

impl ResponseValue {
  /// Whitespace-only strings and empty objects count as unanswered.
  pub fn is_answered(&self) -> bool {
    match self {
      ResponseValue::Number(n) => n.is_finite(),
      ResponseValue::Text(s) => !s.trim().is_empty(),
      ResponseValue::Object(m) => !m.is_empty(),
    }
  }
}

impl From<&str> for ResponseValue {
  fn from(s: &str) -> Self { ResponseValue::Text(s.to_string()) }
}

impl From<f64> for ResponseValue {
  fn from(n: f64) -> Self { ResponseValue::Number(n) }
}

/// Completion state of a single lesson. The only transition is
/// `NotStarted -> Complete`; stored as a plain boolean.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum LessonStatus {
  #[default]
  NotStarted,
  Complete,
}

impl From<bool> for LessonStatus {
  fn from(done: bool) -> Self {
    if done { LessonStatus::Complete } else { LessonStatus::NotStarted }
  }
}

impl From<LessonStatus> for bool {
  fn from(s: LessonStatus) -> bool { s == LessonStatus::Complete }
}

/// Lesson id -> status, persisted as `{ "<lessonId>": true }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressRecord(BTreeMap<String, LessonStatus>);

impl ProgressRecord {
  pub fn new() -> Self { Self::default() }

  pub fn status(&self, lesson_id: &str) -> LessonStatus {
    self.0.get(lesson_id).copied().unwrap_or_default()
  }

  pub fn is_complete(&self, lesson_id: &str) -> bool {
    self.status(lesson_id) == LessonStatus::Complete
  }

  /// Returns true if the lesson was not complete before.
  pub fn complete(&mut self, lesson_id: &str) -> bool {
    let prev = self.0.insert(lesson_id.to_string(), LessonStatus::Complete);
    prev != Some(LessonStatus::Complete)
  }

  /// Number of entries marked complete, including ids unknown to any course.
  pub fn count_complete(&self) -> usize {
    self.0.values().filter(|s| **s == LessonStatus::Complete).count()
  }
}

/// Response key -> value, persisted as a flat JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseRecord(BTreeMap<String, ResponseValue>);

impl ResponseRecord {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, key: &str) -> Option<&ResponseValue> {
    self.0.get(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: ResponseValue) {
    self.0.insert(key.into(), value);
  }

  pub fn is_answered(&self, key: &str) -> bool {
    self.0.get(key).is_some_and(ResponseValue::is_answered)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn progress_serializes_as_boolean_map() {
    let mut p = ProgressRecord::new();
    assert!(p.complete("w1-l1"));
    assert!(!p.complete("w1-l1"));
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, r#"{"w1-l1":true}"#);

    let back: ProgressRecord = serde_json::from_str(r#"{"a":true,"b":false}"#).unwrap();
    assert!(back.is_complete("a"));
    assert!(!back.is_complete("b"));
    assert_eq!(back.count_complete(), 1);
  }

  #[test]
  fn response_values_keep_their_shape() {
    let rec: ResponseRecord =
      serde_json::from_str(r#"{"q1":"tired","q2":3,"q3":{"partner":"sometimes"}}"#).unwrap();
    assert_eq!(rec.get("q1"), Some(&ResponseValue::Text("tired".into())));
    assert_eq!(rec.get("q2"), Some(&ResponseValue::Number(3.0)));
    assert!(matches!(rec.get("q3"), Some(ResponseValue::Object(m)) if m.len() == 1));
  }

  #[test]
  fn blank_answers_do_not_count() {
    let mut rec = ResponseRecord::new();
    rec.set("a", "".into());
    rec.set("b", "   \n".into());
    rec.set("c", " ok ".into());
    rec.set("d", ResponseValue::Object(Default::default()));
    assert!(!rec.is_answered("a"));
    assert!(!rec.is_answered("b"));
    assert!(rec.is_answered("c"));
    assert!(!rec.is_answered("d"));
    assert!(!rec.is_answered("missing"));
  }

  #[test]
  fn question_kind_is_tagged_inline() {
    let q: Question = serde_json::from_str(
      r#"{"id":"mood","prompt":"How was your mood?","required":true,"type":"scale","min":0,"max":3}"#,
    )
    .unwrap();
    assert!(q.required);
    assert!(matches!(q.kind, QuestionKind::Scale { min: 0, max: 3, .. }));
  }
}
