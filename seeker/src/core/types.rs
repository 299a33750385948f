//! Shared deterministic types for the session core.
//!
//! These types define stable contracts between core components. They should
//! not depend on external state or I/O and must remain deterministic across
//! runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation requested by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registered tool name.
    pub name: String,
    /// Arguments object, validated against the tool's declared schema.
    #[serde(default)]
    pub arguments: Value,
}

/// One entry in the conversation history.
///
/// Records are appended in arrival order and never modified afterwards; the
/// full list is replayed verbatim into every engine call of the session so
/// retries stay contextual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum TurnRecord {
    /// Operator query that opened a turn.
    Prompt { text: String },
    /// Engine reply proposing a structured candidate.
    Candidate { value: Value },
    /// Engine reply requesting tool invocations.
    ToolCalls { calls: Vec<ToolCall> },
    /// Output of a resolved tool call.
    ToolResult { name: String, content: Value },
    /// A failed tool call, surfaced to the engine as an observation.
    ToolFailure { name: String, error: String },
    /// Corrective feedback: validator messages or operator re-query text.
    Corrective { text: String },
}

/// Structured result produced by the engine for one task.
///
/// Exactly one variant is active per result. `T` must serialize as a JSON
/// object so the `kind` tag can sit alongside the domain fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidate<T> {
    /// Success variant carrying the domain payload.
    Found(T),
    /// Explicit non-answer. Carries no fields and always passes validation.
    NotFound,
}

impl<T> Candidate<T> {
    /// Returns true for the success variant.
    pub fn is_found(&self) -> bool {
        matches!(self, Candidate::Found(_))
    }
}
