//! Stable exit codes for `summon-python` commands.

/// Every tool invocation succeeded (or there was nothing to run).
pub const OK: i32 = 0;
/// At least one tool failed, timed out, or was not installed.
pub const FAILED: i32 = 1;
/// The command could not run: missing or malformed configuration, bad arguments.
pub const INVALID: i32 = 2;
