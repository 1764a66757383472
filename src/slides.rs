//! Slide deck generation: a deck described in TOML is rendered to a
//! self-contained HTML document, written to disk for review, and stored
//! against a course/week/lesson number.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, instrument};

use crate::domain::Course;
use crate::error::SlideError;
use crate::storage::{slides_key, LocalStorage};
use crate::util::{escape_html, fill_template};

#[derive(Clone, Debug, Deserialize)]
pub struct SlideDeck {
  pub title: String,
  #[serde(default)]
  pub subtitle: Option<String>,
  #[serde(default)]
  pub slides: Vec<Slide>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Slide {
  pub heading: String,
  #[serde(default)]
  pub body: Option<String>,
  #[serde(default)]
  pub bullets: Vec<String>,
  #[serde(default)]
  pub notes: Option<String>,
}

impl SlideDeck {
  pub fn from_toml(s: &str) -> Result<Self, SlideError> {
    Ok(toml::from_str(s)?)
  }
}

const DECK_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
.deck { font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; }
.slide { min-height: 480px; padding: 48px; margin: 24px 0; border-radius: 12px; background: #f7f5f2; }
.slide h2 { color: #3d5a4c; }
.notes { font-size: 0.85em; color: #666; border-top: 1px solid #ddd; margin-top: 24px; padding-top: 8px; }
</style>
</head>
<body>
<div class="deck">
<section class="slide title-slide"><h1>{title}</h1>{subtitle}</section>
{slides}
</div>
</body>
</html>
"#;

const SLIDE_TEMPLATE: &str = r#"<section class="slide" data-index="{index}"><h2>{heading}</h2>{body}{bullets}{notes}</section>"#;

fn render_slide(index: usize, slide: &Slide) -> String {
  let body = slide
    .body
    .as_deref()
    .map(|b| format!("<p>{}</p>", escape_html(b)))
    .unwrap_or_default();
  let bullets = if slide.bullets.is_empty() {
    String::new()
  } else {
    let items: String = slide.bullets.iter().map(|b| format!("<li>{}</li>", escape_html(b))).collect();
    format!("<ul>{items}</ul>")
  };
  let notes = slide
    .notes
    .as_deref()
    .map(|n| format!(r#"<aside class="notes">{}</aside>"#, escape_html(n)))
    .unwrap_or_default();
  let index = (index + 1).to_string();
  fill_template(
    SLIDE_TEMPLATE,
    &[("index", &index), ("heading", &escape_html(&slide.heading)), ("body", &body), ("bullets", &bullets), ("notes", &notes)],
  )
}

/// Render the whole deck to HTML.
pub fn render_deck(deck: &SlideDeck) -> String {
  let slides: Vec<String> = deck.slides.iter().enumerate().map(|(i, s)| render_slide(i, s)).collect();
  let subtitle = deck
    .subtitle
    .as_deref()
    .map(|s| format!(r#"<p class="subtitle">{}</p>"#, escape_html(s)))
    .unwrap_or_default();
  fill_template(
    DECK_TEMPLATE,
    &[("title", &escape_html(&deck.title)), ("subtitle", &subtitle), ("slides", &slides.join("\n"))],
  )
}

/// Where a deck is published: course id, week number, 1-based lesson number.
#[derive(Clone, Debug)]
pub struct SlideTarget {
  pub course_id: String,
  pub week: u32,
  pub lesson: u32,
}

impl SlideTarget {
  /// Check the target against the catalog and return the lesson id it names.
  pub fn resolve<'a>(&self, courses: &'a [Course]) -> Result<&'a str, SlideError> {
    let course = courses
      .iter()
      .find(|c| c.id == self.course_id)
      .ok_or_else(|| SlideError::UnknownCourse(self.course_id.clone()))?;
    let week = course
      .weeks
      .iter()
      .find(|w| w.number == self.week)
      .ok_or_else(|| SlideError::UnknownWeek { course: self.course_id.clone(), week: self.week })?;
    let lesson = (self.lesson as usize)
      .checked_sub(1)
      .and_then(|i| week.lessons.get(i))
      .ok_or(SlideError::UnknownLesson { week: self.week, lesson: self.lesson })?;
    Ok(&lesson.id)
  }

  pub fn file_name(&self) -> String {
    format!("{}-w{}-l{}.html", self.course_id, self.week, self.lesson)
  }
}

/// Validate, render, write the review copy, and upsert into storage.
/// Returns the path of the review copy.
#[instrument(level = "info", skip(deck, courses, storage), fields(course_id = %target.course_id, week = target.week, lesson = target.lesson))]
pub fn publish(
  deck: &SlideDeck,
  target: &SlideTarget,
  courses: &[Course],
  storage: &LocalStorage,
  out_dir: &Path,
) -> Result<PathBuf, SlideError> {
  if deck.slides.is_empty() {
    return Err(SlideError::EmptyDeck);
  }
  let lesson_id = target.resolve(courses)?;
  let html = render_deck(deck);

  std::fs::create_dir_all(out_dir)?;
  let path = out_dir.join(target.file_name());
  std::fs::write(&path, &html)?;

  storage.try_save(&slides_key(&target.course_id, target.week, target.lesson), &html)?;
  info!(target: "slides", %lesson_id, slides = deck.slides.len(), bytes = html.len(), path = %path.display(), "Slide deck published");
  Ok(path)
}

/// Stored deck HTML for a lesson, if any was published.
pub fn stored_deck(storage: &LocalStorage, course_id: &str, week: u32, lesson: u32) -> Option<String> {
  storage.load_string(&slides_key(course_id, week, lesson))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::{seed_courses, SEED_COURSE_ID};

  const DECK: &str = r#"
    title = "Baby Blues <or> More"
    subtitle = "Week 1, Lesson 2"

    [[slides]]
    heading = "What is normal?"
    body = "Tearfulness in the first two weeks is common."
    bullets = ["Mood swings", "Feeling overwhelmed"]

    [[slides]]
    heading = "When to ask for help"
    notes = "Pause for questions."
  "#;

  #[test]
  fn renders_escaped_html() {
    let deck = SlideDeck::from_toml(DECK).unwrap();
    let html = render_deck(&deck);
    assert!(html.contains("<title>Baby Blues &lt;or&gt; More</title>"));
    assert!(html.contains(r#"data-index="2""#));
    assert!(html.contains("<li>Mood swings</li>"));
    assert!(html.contains(r#"<aside class="notes">Pause for questions.</aside>"#));
    assert!(!html.contains("{slides}"));
  }

  #[test]
  fn target_must_exist() {
    let courses = seed_courses();
    let ok = SlideTarget { course_id: SEED_COURSE_ID.into(), week: 1, lesson: 2 };
    assert_eq!(ok.resolve(&courses).unwrap(), "w1-l2");

    let bad_lesson = SlideTarget { lesson: 9, ..ok.clone() };
    assert!(matches!(bad_lesson.resolve(&courses), Err(SlideError::UnknownLesson { .. })));
    let zero = SlideTarget { lesson: 0, ..ok.clone() };
    assert!(zero.resolve(&courses).is_err());
    let bad_week = SlideTarget { week: 7, ..ok.clone() };
    assert!(matches!(bad_week.resolve(&courses), Err(SlideError::UnknownWeek { .. })));
    let bad_course = SlideTarget { course_id: "nope".into(), ..ok };
    assert!(matches!(bad_course.resolve(&courses), Err(SlideError::UnknownCourse(_))));
  }

  #[test]
  fn publish_writes_file_and_store() {
    let (storage, _) = LocalStorage::in_memory();
    let out = std::env::temp_dir().join(format!("slides-{}", uuid::Uuid::new_v4()));
    let deck = SlideDeck::from_toml(DECK).unwrap();
    let target = SlideTarget { course_id: SEED_COURSE_ID.into(), week: 1, lesson: 2 };

    let path = publish(&deck, &target, &seed_courses(), &storage, &out).unwrap();
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(stored_deck(&storage, SEED_COURSE_ID, 1, 2), Some(on_disk));
    let _ = std::fs::remove_dir_all(&out);

    let empty = SlideDeck { title: "x".into(), subtitle: None, slides: vec![] };
    assert!(matches!(publish(&empty, &target, &seed_courses(), &storage, &out), Err(SlideError::EmptyDeck)));
  }
}
