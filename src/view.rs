//! Presentation view: renders the current lesson, the week sidebar and the
//! workbook form from the player's records. Holds no state of its own.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{category_key, followup_key, ContentType, Question, QuestionKind, ResponseRecord, ResponseValue};
use crate::navigation::{is_week_complete, submit_blockers};
use crate::responses::SaveStatus;
use crate::session::CoursePlayer;

/// Transient UI toggles supplied by the client.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewOptions {
  pub show_transcript: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
  pub course_id: String,
  pub course_title: String,
  pub completion_percentage: u8,
  pub weeks: Vec<WeekNav>,
  pub lesson: Option<LessonPanel>,
  pub workbook: Option<WorkbookForm>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekNav {
  pub index: usize,
  pub number: u32,
  pub title: String,
  pub current: bool,
  pub complete: bool,
  pub lessons: Vec<LessonNav>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonNav {
  pub id: String,
  pub title: String,
  pub duration: String,
  pub complete: bool,
  pub current: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPanel {
  pub id: String,
  pub title: String,
  pub duration: String,
  pub content_type: ContentType,
  /// Where the video goes; a placeholder label when no URL is set.
  pub video: String,
  pub transcript: Option<String>,
  pub complete: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookForm {
  pub title: String,
  pub week_number: u32,
  pub groups: Vec<FormGroup>,
  pub can_submit: bool,
  pub blocked_by: Vec<String>,
  pub submitted: bool,
}

#[derive(Debug, Serialize)]
pub struct FormGroup {
  pub id: String,
  pub title: String,
  pub fields: Vec<FormField>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FormField {
  TextArea {
    key: String,
    prompt: String,
    required: bool,
    placeholder: Option<String>,
    value: String,
    status: Option<SaveStatus>,
  },
  Scale {
    key: String,
    prompt: String,
    required: bool,
    options: Vec<i32>,
    min_label: Option<String>,
    max_label: Option<String>,
    value: Option<f64>,
    status: Option<SaveStatus>,
    followup: Option<Box<FormField>>,
  },
  Categories {
    key: String,
    prompt: String,
    required: bool,
    entries: Vec<CategoryEntry>,
  },
}

#[derive(Debug, Serialize)]
pub struct CategoryEntry {
  pub key: String,
  pub label: String,
  pub value: String,
  pub status: Option<SaveStatus>,
}

fn text_of(responses: &ResponseRecord, key: &str) -> String {
  match responses.get(key) {
    Some(ResponseValue::Text(s)) => s.clone(),
    Some(ResponseValue::Number(n)) => n.to_string(),
    Some(ResponseValue::Object(m)) => serde_json::Value::Object(m.clone()).to_string(),
    None => String::new(),
  }
}

fn number_of(responses: &ResponseRecord, key: &str) -> Option<f64> {
  match responses.get(key)? {
    ResponseValue::Number(n) => Some(*n),
    ResponseValue::Text(s) => s.trim().parse().ok(),
    ResponseValue::Object(_) => None,
  }
}

fn field_for(q: &Question, responses: &ResponseRecord, status: &HashMap<String, SaveStatus>) -> FormField {
  match &q.kind {
    QuestionKind::FreeText { placeholder } => FormField::TextArea {
      key: q.id.clone(),
      prompt: q.prompt.clone(),
      required: q.required,
      placeholder: placeholder.clone(),
      value: text_of(responses, &q.id),
      status: status.get(&q.id).copied(),
    },
    QuestionKind::Scale { min, max, min_label, max_label, followup } => FormField::Scale {
      key: q.id.clone(),
      prompt: q.prompt.clone(),
      required: q.required,
      options: (*min..=*max).collect(),
      min_label: min_label.clone(),
      max_label: max_label.clone(),
      value: number_of(responses, &q.id),
      status: status.get(&q.id).copied(),
      followup: followup.as_ref().map(|prompt| {
        let key = followup_key(&q.id);
        Box::new(FormField::TextArea {
          value: text_of(responses, &key),
          status: status.get(&key).copied(),
          key,
          prompt: prompt.clone(),
          required: false,
          placeholder: None,
        })
      }),
    },
    QuestionKind::CategoryMapping { categories } => FormField::Categories {
      key: q.id.clone(),
      prompt: q.prompt.clone(),
      required: q.required,
      entries: categories
        .iter()
        .enumerate()
        .map(|(i, label)| {
          let key = category_key(&q.id, i);
          CategoryEntry {
            value: text_of(responses, &key),
            status: status.get(&key).copied(),
            key,
            label: label.clone(),
          }
        })
        .collect(),
    },
  }
}

/// Render the player's current selection.
pub async fn render_lesson(player: &CoursePlayer, options: ViewOptions) -> LessonView {
  let course = &player.course;
  let progress = player.progress.record();
  let responses = player.responses.snapshot().await;
  let status = player.responses.statuses().await;
  let current_week = player.navigator.week_index();
  let current_lesson = player.navigator.lesson_id();

  let weeks = course
    .weeks
    .iter()
    .enumerate()
    .map(|(index, w)| WeekNav {
      index,
      number: w.number,
      title: w.title.clone(),
      current: index == current_week,
      complete: is_week_complete(w, progress),
      lessons: w
        .lessons
        .iter()
        .map(|l| LessonNav {
          id: l.id.clone(),
          title: l.title.clone(),
          duration: l.duration.clone(),
          complete: progress.is_complete(&l.id),
          current: Some(l.id.as_str()) == current_lesson,
        })
        .collect(),
    })
    .collect();

  let lesson = current_lesson.and_then(|id| course.find_lesson(id)).map(|(_, l)| LessonPanel {
    id: l.id.clone(),
    title: l.title.clone(),
    duration: l.duration.clone(),
    content_type: l.content_type.clone(),
    video: l.video_url.clone().unwrap_or_else(|| format!("Video coming soon: {}", l.title)),
    transcript: options.show_transcript.then(|| l.transcript.clone()),
    complete: progress.is_complete(&l.id),
  });

  let submitted = player.submitted_weeks();
  let workbook = course.week(current_week).and_then(|w| {
    let wb = w.workbook.as_ref()?;
    let blocked_by = submit_blockers(w, progress, &responses);
    Some(WorkbookForm {
      title: wb.title.clone(),
      week_number: w.number,
      groups: wb
        .groups
        .iter()
        .map(|g| FormGroup {
          id: g.id.clone(),
          title: g.title.clone(),
          fields: g.questions.iter().map(|q| field_for(q, &responses, &status)).collect(),
        })
        .collect(),
      can_submit: blocked_by.is_empty(),
      blocked_by,
      submitted: submitted.contains(&w.number),
    })
  });

  LessonView {
    course_id: course.id.clone(),
    course_title: course.title.clone(),
    completion_percentage: player.completion_percentage(),
    weeks,
    lesson,
    workbook,
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::PlayerTimings;
  use crate::seeds::{seed_courses, SEED_COURSE_ID};
  use crate::session::{PlayerState, Session};
  use crate::storage::LocalStorage;

  fn player() -> CoursePlayer {
    let (storage, _) = LocalStorage::in_memory();
    let session = Session { token: "tok".into() };
    PlayerState::mount(Some(&session), SEED_COURSE_ID)
      .load(Some(Arc::new(seed_courses().remove(0))), &storage, PlayerTimings::default(), None)
      .into_ready()
      .unwrap()
  }

  #[tokio::test]
  async fn renders_fields_by_question_kind() {
    let p = player();
    p.responses.set_response("w1-q2", ResponseValue::Number(2.0)).await;
    p.responses.set_response("w1-q3_1", "my mum".into()).await;

    let view = render_lesson(&p, ViewOptions::default()).await;
    assert_eq!(view.completion_percentage, 0);
    assert!(view.lesson.as_ref().unwrap().transcript.is_none());

    let form = view.workbook.unwrap();
    assert!(!form.can_submit);
    let fields: Vec<&FormField> = form.groups.iter().flat_map(|g| g.fields.iter()).collect();
    assert!(matches!(fields[0], FormField::TextArea { value, .. } if value.is_empty()));
    match fields[1] {
      FormField::Scale { options, value, followup, status, .. } => {
        assert_eq!(options, &vec![0, 1, 2, 3]);
        assert_eq!(*value, Some(2.0));
        assert_eq!(*status, Some(SaveStatus::Saving));
        assert!(matches!(followup.as_deref(), Some(FormField::TextArea { key, .. }) if key == "w1-q2_followup"));
      }
      other => panic!("unexpected field {other:?}"),
    }
    match fields[2] {
      FormField::Categories { entries, .. } => {
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].key, "w1-q3_1");
        assert_eq!(entries[1].value, "my mum");
      }
      other => panic!("unexpected field {other:?}"),
    }
  }

  #[tokio::test]
  async fn transcript_toggle_and_week_without_workbook() {
    let mut p = player();
    p.select_lesson("w3-l1").unwrap();
    let view = render_lesson(&p, ViewOptions { show_transcript: true }).await;
    let lesson = view.lesson.unwrap();
    assert_eq!(lesson.id, "w3-l1");
    assert!(lesson.transcript.unwrap().contains("written plan"));
    assert!(view.workbook.is_none());
    assert!(view.weeks[2].current);
    assert!(view.weeks[2].lessons[0].current);
  }
}
