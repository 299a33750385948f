//! Shared test fixtures: scripted engines and deciders.
//!
//! Available to unit tests and, behind the `test-support` feature, to
//! integration tests and downstream crates.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::Result;
use serde_json::{Value, json};

use crate::io::engine::{
    CompletionEngine, EngineReply, EngineRequest, EngineResponse, EngineUnavailableError,
};
use crate::session::{Decider, Decision};

/// Engine that replays a fixed script of responses.
///
/// Records the prompt and history length of every call so tests can assert
/// on replay behavior. Running past the script is an engine failure, which
/// keeps an over-calling orchestrator from passing silently.
pub struct ScriptedEngine {
    responses: RefCell<VecDeque<EngineResponse>>,
    prompts: RefCell<Vec<String>>,
    history_lens: RefCell<Vec<usize>>,
}

impl ScriptedEngine {
    pub fn new(responses: Vec<EngineResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            prompts: RefCell::new(Vec::new()),
            history_lens: RefCell::new(Vec::new()),
        }
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    /// The prompt passed to each call, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    /// The history length observed by each call, in call order.
    pub fn history_lens(&self) -> Vec<usize> {
        self.history_lens.borrow().clone()
    }
}

impl CompletionEngine for ScriptedEngine {
    fn complete(
        &self,
        request: &EngineRequest<'_>,
    ) -> Result<EngineResponse, EngineUnavailableError> {
        self.prompts.borrow_mut().push(request.prompt.to_string());
        self.history_lens.borrow_mut().push(request.history.len());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| EngineUnavailableError {
                message: "scripted engine exhausted".to_string(),
            })
    }
}

/// Response carrying a structured candidate.
pub fn candidate_response(value: Value, usage: u64) -> EngineResponse {
    EngineResponse {
        reply: EngineReply::Candidate { value },
        usage,
    }
}

/// Response requesting the named tools with the given arguments.
pub fn tool_calls_response(calls: Vec<(&str, Value)>, usage: u64) -> EngineResponse {
    EngineResponse {
        reply: EngineReply::ToolCalls {
            calls: calls
                .into_iter()
                .map(|(name, arguments)| crate::core::types::ToolCall {
                    name: name.to_string(),
                    arguments,
                })
                .collect(),
        },
        usage,
    }
}

/// A `found` flight candidate value.
pub fn found_flight(
    flight_number: &str,
    price: u32,
    origin: &str,
    destination: &str,
    date: &str,
) -> Value {
    json!({
        "kind": "found",
        "flight_number": flight_number,
        "price": price,
        "origin": origin,
        "destination": destination,
        "date": date,
    })
}

/// Decider that replays a fixed script of decisions.
///
/// Records every reviewed result. An empty (or exhausted) script accepts,
/// so happy-path tests need no scripting.
pub struct ScriptedDecider<T> {
    decisions: VecDeque<Decision>,
    reviewed: Vec<T>,
}

impl<T> ScriptedDecider<T> {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: decisions.into(),
            reviewed: Vec::new(),
        }
    }

    /// Every result presented for review, in order.
    pub fn reviewed(&self) -> &[T] {
        &self.reviewed
    }
}

impl<T: Clone> Decider<T> for ScriptedDecider<T> {
    fn review(&mut self, result: &T) -> Result<Decision> {
        self.reviewed.push(result.clone());
        Ok(self.decisions.pop_front().unwrap_or(Decision::Accept))
    }
}
