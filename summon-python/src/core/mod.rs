//! Deterministic, pure logic shared by the tasks.
//!
//! Core modules must be free of I/O side effects. They operate on parsed TOML
//! and plain strings and return deterministic outputs suitable for tests.

pub mod commands;
pub mod settings;
pub mod types;
