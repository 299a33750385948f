//! Deterministic, pure logic shared by the session core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod history;
pub mod types;
pub mod usage;
pub mod validator;
