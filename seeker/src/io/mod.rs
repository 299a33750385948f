//! Side-effecting collaborators of the session loop.

pub mod config;
pub mod console;
pub mod engine;
pub mod process;
pub mod prompt;
pub mod transcript;
