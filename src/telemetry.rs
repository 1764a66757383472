//! Tracing setup shared by the server and the `build_slides` tool.
//!
//! `LOG_LEVEL` takes an EnvFilter directive ("debug", or
//! "info,workbook=debug,storage=debug"). `LOG_FORMAT` picks `pretty`
//! (default), `compact` or `json`. Targets in use: course_player, progress,
//! workbook, storage, slides.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,course_player=debug,workbook=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Compact,
  Json,
}

impl LogFormat {
  /// Unknown values fall back to `Pretty`.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      Some("json") => LogFormat::Json,
      Some("compact") => LogFormat::Compact,
      _ => LogFormat::Pretty,
    }
  }

  pub fn from_env() -> Self {
    Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
  }
}

/// Install the global subscriber. A second call keeps the first one.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let format = LogFormat::from_env();

  let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
  let installed = match format {
    LogFormat::Json => builder.json().with_current_span(true).try_init(),
    LogFormat::Compact => builder.compact().try_init(),
    LogFormat::Pretty => builder.with_file(true).with_line_number(true).try_init(),
  };
  if installed.is_err() {
    tracing::debug!(target: "course_player", ?format, "Tracing subscriber already installed");
  }
}
