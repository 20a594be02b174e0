//! Shared protocol definitions for the `Taskboard` REST and push-channel wire formats.

pub mod channel;
pub mod codec;
pub mod employee;
pub mod event;
pub mod task;
