//! Task module - task records and the task store built on the document store.

mod store;
pub mod task;

pub use store::{TaskPatch, TaskStore};
pub use task::{Task, TaskStatus, MAX_DESCRIPTION_CHARS};
