//! Constraint-validated conversational agent session runner.
//!
//! This crate drives a multi-turn interaction between a human operator and a
//! generative reasoning engine to resolve a structured task (the reference
//! domain: flight search). The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (usage accounting, history,
//!   validation contracts). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (engine subprocess, config,
//!   console, transcripts). Isolated to enable scripted fakes in tests.
//!
//! Orchestration modules ([`turn`], [`session`]) compose core logic with the
//! engine and the [`tools`] registry to run "ask until acceptable" cycles:
//! the engine may request tool invocations before committing to an answer,
//! and every answer is validated against the session constraints before it
//! reaches the operator.

pub mod core;
pub mod exit_codes;
pub mod flights;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
pub mod turn;
