//! Course Player · course delivery backend
//!
//! - Axum HTTP + WebSocket API for the multi-week course player
//! - Device-local JSON storage for progress and workbook responses
//! - Optional remote API for login and response sync
//! - Static front-end fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   STORAGE_DIR         : local storage directory (default ./.course_storage)
//!   COURSE_CONFIG_PATH  : path to TOML config (player timings + extra courses)
//!   REMOTE_BASE_URL     : enables remote login and response sync if present
//!   REMOTE_TIMEOUT_SECS : per-request timeout for remote calls (default 10)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use course_player::config::ServerConfig;
use course_player::routes::build_router;
use course_player::state::AppState;
use course_player::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = ServerConfig::from_env();
  info!(target: "course_player", storage_dir = %cfg.storage_dir.display(), debounce_ms = cfg.course_config.player.debounce_ms, "Starting course player");

  // Shared state: catalog, storage, remote client.
  let state = Arc::new(AppState::new(&cfg));

  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "course_player", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  // Flush debounced writes still pending.
  state.flush_all().await;
  info!(target: "course_player", "Shut down cleanly");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "course_player", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
