//! # taskmind
//!
//! Natural-language task manager.
//!
//! A user sends a free-text instruction ("crear la tarea 'comprar pan'"). A hosted
//! language model turns it into a structured command, which is validated and then
//! applied to a persistent task collection.
//!
//! ## Command Flow
//!
//! ```text
//!   text ──▶ CommandInterpreter ──▶ Command ──▶ dispatch ──▶ TaskStore
//!               (Gemini JSON)                     │              │
//!                                                 ▼              ▼
//!                                           ActionResult   DocumentStore
//! ```
//!
//! ## Modules
//! - `api`: axum routes and server lifecycle
//! - `interpreter`: prompt, model call, and strict decoding of model output
//! - `dispatch`: applies a `Command` and reports an `ActionResult`
//! - `task`: task records and the task store
//! - `store`: document storage backends (memory, file, sqlite)
//! - `llm`: Gemini client

pub mod api;
pub mod config;
pub mod dispatch;
pub mod interpreter;
pub mod llm;
pub mod store;
pub mod task;

pub use config::Config;
pub use dispatch::{dispatch, ActionResult, ResultStatus};
pub use interpreter::{Action, Command, CommandInterpreter};
pub use task::{Task, TaskStatus, TaskStore};
