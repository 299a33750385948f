//! Stable exit codes for seeker CLI commands.

/// The operator accepted a result (or the command succeeded).
pub const OK: i32 = 0;
/// Fatal failure: budget exhausted, engine unavailable, unknown tool,
/// invalid config, or any other error.
pub const FATAL: i32 = 1;
/// The engine returned the explicit not-found sentinel.
pub const NO_RESULT: i32 = 2;
/// The validation-attempt budget ran out without an acceptable candidate.
pub const EXHAUSTED: i32 = 3;
/// The operator aborted the session at a decision point.
pub const ABORTED: i32 = 4;
