//! Course player: weekly video lessons, lesson progress, and workbook
//! responses persisted to device-local storage, served over HTTP/WebSocket.

pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod navigation;
pub mod progress;
pub mod protocol;
pub mod remote;
pub mod responses;
pub mod routes;
pub mod seeds;
pub mod session;
pub mod slides;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod util;
pub mod view;
