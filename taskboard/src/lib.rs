//! `Taskboard` — real-time task board client library.
//!
//! The board keeps a local store of each employee's active tasks in sync
//! with a REST service and a push channel. Local edits are applied
//! optimistically and confirmed against the service.

pub mod api;
pub mod app;
pub mod config;
pub mod net;
pub mod tasks;
pub mod transport;
pub mod ui;
pub mod view;
