//! I/O helpers for the tasks.

pub mod config;
pub mod discover;
pub mod process;
pub mod project;
pub mod scaffold;
