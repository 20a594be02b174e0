//! `Taskboard` hub library.
//!
//! An in-memory task service with a REST surface and a push channel.
//! Board clients join a topic over WebSocket and receive the events
//! produced by REST mutations. Exposed for tests and embedding.

pub mod config;
pub mod repo;
pub mod server;
pub mod topics;
