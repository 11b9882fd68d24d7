//! HTTP API for taskmind.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message
//! - `POST /command` - Interpret a natural-language command and apply it
//! - `GET /tasks` - List all tasks
//! - `GET /health` - Health check

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
