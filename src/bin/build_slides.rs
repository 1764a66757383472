//! Render a TOML slide deck to HTML and publish it for one lesson.
//!
//! Writes `<out>/<course>-w<week>-l<lesson>.html` for review and stores the
//! same HTML in local storage, where the player serves it from.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use thiserror::Error;
use tracing::error;

use course_player::config::{load_course_config_from_env, DEFAULT_STORAGE_DIR};
use course_player::seeds::seed_courses;
use course_player::slides::{publish, SlideDeck, SlideTarget};
use course_player::storage::{FileBackend, LocalStorage};
use course_player::telemetry;

#[derive(Debug)]
struct Args {
  deck: PathBuf,
  target: SlideTarget,
  out_dir: PathBuf,
  storage_dir: PathBuf,
}

#[derive(Debug, Error)]
enum ArgsError {
  #[error("{flag} requires a value")]
  MissingValue { flag: &'static str },
  #[error("missing required option {0}")]
  Missing(&'static str),
  #[error("invalid {flag} value: {raw}")]
  Invalid { flag: &'static str, raw: String },
  #[error("unknown argument: {0}")]
  UnknownArg(String),
  #[error("help requested")]
  Help,
}

fn require_value(args: &mut impl Iterator<Item = String>, flag: &'static str) -> Result<String, ArgsError> {
  args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(raw: String, flag: &'static str) -> Result<u32, ArgsError> {
  raw.parse().map_err(|_| ArgsError::Invalid { flag, raw })
}

impl Args {
  fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
    let mut deck = None;
    let mut course = None;
    let mut week = None;
    let mut lesson = None;
    let mut out_dir = PathBuf::from("./slides-out");
    let mut storage_dir = std::env::var("STORAGE_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR));

    while let Some(arg) = args.next() {
      match arg.as_str() {
        "--deck" => deck = Some(PathBuf::from(require_value(&mut args, "--deck")?)),
        "--course" => course = Some(require_value(&mut args, "--course")?),
        "--week" => week = Some(parse_number(require_value(&mut args, "--week")?, "--week")?),
        "--lesson" => lesson = Some(parse_number(require_value(&mut args, "--lesson")?, "--lesson")?),
        "--out" => out_dir = PathBuf::from(require_value(&mut args, "--out")?),
        "--storage" => storage_dir = PathBuf::from(require_value(&mut args, "--storage")?),
        "-h" | "--help" => return Err(ArgsError::Help),
        other => return Err(ArgsError::UnknownArg(other.to_string())),
      }
    }

    Ok(Self {
      deck: deck.ok_or(ArgsError::Missing("--deck"))?,
      target: SlideTarget {
        course_id: course.ok_or(ArgsError::Missing("--course"))?,
        week: week.ok_or(ArgsError::Missing("--week"))?,
        lesson: lesson.ok_or(ArgsError::Missing("--lesson"))?,
      },
      out_dir,
      storage_dir,
    })
  }
}

fn print_usage() {
  eprintln!("Usage:");
  eprintln!("  build_slides --deck <file.toml> --course <id> --week <n> --lesson <n> [options]");
  eprintln!();
  eprintln!("Options:");
  eprintln!("  --out <dir>        Review copy directory (default: ./slides-out)");
  eprintln!("  --storage <dir>    Local storage directory (default: STORAGE_DIR or {DEFAULT_STORAGE_DIR})");
  eprintln!("  -h, --help         Show this help");
  eprintln!();
  eprintln!("Environment:");
  eprintln!("  COURSE_CONFIG_PATH, STORAGE_DIR, LOG_LEVEL");
}

fn main() -> ExitCode {
  telemetry::init_tracing();

  let args = match Args::parse(std::env::args().skip(1)) {
    Ok(a) => a,
    Err(ArgsError::Help) => {
      print_usage();
      return ExitCode::SUCCESS;
    }
    Err(e) => {
      eprintln!("{e}");
      print_usage();
      return ExitCode::FAILURE;
    }
  };

  let mut courses = seed_courses();
  if let Some(cfg) = load_course_config_from_env() {
    for c in cfg.courses {
      courses.retain(|existing| existing.id != c.id);
      courses.push(c);
    }
  }

  let raw = match std::fs::read_to_string(&args.deck) {
    Ok(raw) => raw,
    Err(e) => {
      error!(target: "slides", path = %args.deck.display(), error = %e, "Failed to read deck file");
      return ExitCode::FAILURE;
    }
  };
  let storage = LocalStorage::new(Arc::new(FileBackend::new(args.storage_dir.clone())));

  match SlideDeck::from_toml(&raw).and_then(|deck| publish(&deck, &args.target, &courses, &storage, &args.out_dir)) {
    Ok(path) => {
      println!("{}", path.display());
      ExitCode::SUCCESS
    }
    Err(e) => {
      error!(target: "slides", error = %e, "Slide deck not published");
      eprintln!("{e}");
      ExitCode::FAILURE
    }
  }
}
