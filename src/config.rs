//! Runtime configuration: environment variables plus an optional TOML file
//! carrying player timings and extra course definitions.
//!
//! TOML schema:
//! ```toml
//! [player]
//! debounce_ms = 2000
//! status_display_ms = 2000
//!
//! [[courses]]
//! id = "..."
//! title = "..."
//! # [[courses.weeks]] ... same shape as `domain::Course`
//! ```

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Course, QuestionKind};
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STORAGE_DIR: &str = "./.course_storage";
/// Upper bound on the number of points a scale question renders.
pub const MAX_SCALE_POINTS: i64 = 11;

/// Timing knobs for the workbook response store.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerTimings {
  /// Quiet period before a burst of edits is flushed.
  pub debounce_ms: u64,
  /// How long a saved/error badge stays visible after the flush settles.
  pub status_display_ms: u64,
}

impl Default for PlayerTimings {
  fn default() -> Self {
    Self { debounce_ms: 2000, status_display_ms: 2000 }
  }
}

impl PlayerTimings {
  pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }
  pub fn status_display(&self) -> Duration { Duration::from_millis(self.status_display_ms) }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CourseConfig {
  #[serde(default)]
  pub player: PlayerTimings,
  #[serde(default)]
  pub courses: Vec<Course>,
}

impl CourseConfig {
  pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
    let cfg: Self = toml::from_str(s)?;
    cfg.validate()?;
    Ok(cfg)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let workbooks = self
      .courses
      .iter()
      .flat_map(|c| c.weeks.iter().filter_map(move |w| w.workbook.as_ref().map(|wb| (c, wb))));
    for (course, wb) in workbooks {
      for q in wb.questions() {
        if let QuestionKind::Scale { min, max, .. } = q.kind {
          let points = i64::from(max) - i64::from(min) + 1;
          if !(1..=MAX_SCALE_POINTS).contains(&points) {
            return Err(ConfigError::InvalidScale {
              course: course.id.clone(),
              question: q.id.clone(),
              min,
              max,
              max_points: MAX_SCALE_POINTS,
            });
          }
        }
      }
    }
    Ok(())
  }
}

/// Everything the server reads from its environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
  pub port: u16,
  pub storage_dir: PathBuf,
  pub remote_base_url: Option<String>,
  pub remote_timeout: Duration,
  pub course_config: CourseConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
      remote_base_url: None,
      remote_timeout: Duration::from_secs(10),
      course_config: CourseConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(DEFAULT_PORT);
    let storage_dir = std::env::var("STORAGE_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR));
    let remote_base_url = std::env::var("REMOTE_BASE_URL")
      .ok()
      .map(|u| u.trim_end_matches('/').to_string())
      .filter(|u| !u.is_empty());
    let remote_timeout = std::env::var("REMOTE_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(Duration::from_secs(10));

    Self {
      port,
      storage_dir,
      remote_base_url,
      remote_timeout,
      course_config: load_course_config_from_env().unwrap_or_default(),
    }
  }
}

/// Load `CourseConfig` from COURSE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_course_config_from_env() -> Option<CourseConfig> {
  let path = std::env::var("COURSE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match CourseConfig::from_toml(&s) {
      Ok(cfg) => {
        info!(target: "course_player", %path, courses = cfg.courses.len(), "Loaded course config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "course_player", %path, error = %e, "Rejected TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "course_player", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::QuestionKind;

  #[test]
  fn empty_toml_uses_defaults() {
    let cfg = CourseConfig::from_toml("").unwrap();
    assert_eq!(cfg.player, PlayerTimings::default());
    assert!(cfg.courses.is_empty());
  }

  #[test]
  fn courses_and_timings_parse() {
    let cfg = CourseConfig::from_toml(
      r#"
        [player]
        debounce_ms = 500

        [[courses]]
        id = "sleep"
        title = "Sleep Basics"

        [[courses.weeks]]
        number = 1
        title = "Rhythms"

        [[courses.weeks.lessons]]
        id = "sleep-1"
        title = "Why sleep shifts"
        duration = "8 min"

        [courses.weeks.workbook]
        title = "Reflection"

        [[courses.weeks.workbook.groups]]
        id = "g1"
        title = "Nights"

        [[courses.weeks.workbook.groups.questions]]
        id = "nights"
        prompt = "Describe a typical night"
        required = true
        type = "free_text"
      "#,
    )
    .unwrap();

    assert_eq!(cfg.player.debounce_ms, 500);
    assert_eq!(cfg.player.status_display_ms, 2000);
    let course = &cfg.courses[0];
    assert_eq!(course.total_lessons(), 1);
    let wb = course.weeks[0].workbook.as_ref().unwrap();
    let q = wb.questions().next().unwrap();
    assert!(matches!(q.kind, QuestionKind::FreeText { placeholder: None }));
  }

  fn scale_config(min: i32, max: i32) -> String {
    format!(
      r#"
        [[courses]]
        id = "mood"
        title = "Mood"

        [[courses.weeks]]
        number = 1
        title = "Check-in"
        lessons = []

        [courses.weeks.workbook]
        title = "Check-in"

        [[courses.weeks.workbook.groups]]
        id = "g1"
        title = "Today"

        [[courses.weeks.workbook.groups.questions]]
        id = "mood-scale"
        prompt = "How are you today?"
        type = "scale"
        min = {min}
        max = {max}
      "#
    )
  }

  #[test]
  fn scale_bounds_are_checked_on_load() {
    assert!(CourseConfig::from_toml(&scale_config(0, 10)).is_ok());
    assert!(CourseConfig::from_toml(&scale_config(3, 3)).is_ok());
    assert!(matches!(
      CourseConfig::from_toml(&scale_config(5, 1)),
      Err(ConfigError::InvalidScale { min: 5, max: 1, .. })
    ));
    let err = CourseConfig::from_toml(&scale_config(0, i32::MAX)).unwrap_err();
    assert!(err.to_string().contains("mood-scale"));
    assert!(matches!(CourseConfig::from_toml("player = 3"), Err(ConfigError::Parse(_))));
  }
}
