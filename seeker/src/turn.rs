//! Turn orchestration: one "ask until acceptable" cycle.
//!
//! The orchestrator drives the engine through tool rounds and validation
//! retries: `AWAITING_ENGINE -> AWAITING_CAPABILITIES (0..n) -> VALIDATING
//! -> ACCEPTED | RETRY_REQUESTED -> AWAITING_ENGINE | RETRIES_EXHAUSTED`.
//! Tool rounds let the engine gather arbitrarily many facts before
//! committing to an answer; validation retries bound how many wrong answers
//! are tolerated.

use anyhow::{Context, Result};
use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::history::History;
use crate::core::types::{Candidate, TurnRecord};
use crate::core::usage::{UsageLedger, UsageLimits};
use crate::core::validator::{ResultValidator, Verdict};
use crate::io::engine::{CompletionEngine, EngineReply, EngineRequest};
use crate::tools::{InvokeError, ToolContext, ToolRegistry};

/// Limits applied to one orchestrator turn.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Candidate proposals tolerated before the turn gives up.
    pub max_attempts: u32,
    /// Session usage ceilings, enforced around every engine call.
    pub limits: UsageLimits,
    /// JSON Schema the structured candidate must satisfy.
    pub result_schema: Value,
}

/// How a turn ended. Both variants are ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome<T> {
    /// The validator accepted a candidate after `attempts` proposals.
    Accepted {
        candidate: Candidate<T>,
        attempts: u32,
    },
    /// Every proposal was rejected and the attempt budget ran out.
    RetriesExhausted { attempts: u32 },
}

/// Run one turn: invoke the engine until it produces an acceptable
/// candidate, resolving tool calls along the way.
///
/// The caller appends the opening [`TurnRecord::Prompt`] (or a synthetic
/// corrective) to `history` before calling; `feedback` is the same text,
/// fed to the engine as the latest prompt. The orchestrator appends every
/// record it generates: engine replies, tool results and failures, and
/// validator feedback.
///
/// Fatal conditions (budget exhausted, unknown tool, engine unavailable)
/// propagate as errors with downcastable roots; validation rejections are
/// data and never raise.
pub fn run_turn<E, V>(
    engine: &E,
    tools: &ToolRegistry,
    validator: &V,
    ledger: &mut UsageLedger,
    history: &mut History,
    feedback: &str,
    config: &TurnConfig,
) -> Result<TurnOutcome<V::Output>>
where
    E: CompletionEngine,
    V: ResultValidator,
    V::Output: DeserializeOwned,
{
    let result_schema = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&config.result_schema)
        .context("compile result schema")?;

    let mut feedback = feedback.to_string();
    let mut attempts = 0u32;

    loop {
        ledger.check_request(&config.limits)?;
        let request = EngineRequest {
            prompt: &feedback,
            history: history.records(),
            result_schema: &config.result_schema,
            tools: tools.specs(),
        };
        let response = engine.complete(&request)?;
        drop(request);
        ledger.charge(response.usage, &config.limits)?;

        match response.reply {
            EngineReply::ToolCalls { calls } => {
                history.push(TurnRecord::ToolCalls {
                    calls: calls.clone(),
                });
                for call in calls {
                    let mut ctx = ToolContext {
                        ledger: &mut *ledger,
                        limits: &config.limits,
                    };
                    match tools.invoke(&call.name, &call.arguments, &mut ctx) {
                        Ok(content) => {
                            debug!(tool = %call.name, "tool call resolved");
                            history.push(TurnRecord::ToolResult {
                                name: call.name,
                                content,
                            });
                        }
                        Err(InvokeError::Unknown(err)) => return Err(err.into()),
                        Err(InvokeError::Budget(err)) => return Err(err.into()),
                        Err(InvokeError::Failed { name, message }) => {
                            warn!(tool = %name, error = %message, "tool call failed");
                            history.push(TurnRecord::ToolFailure {
                                name,
                                error: message,
                            });
                        }
                    }
                }
                // Tool rounds gather facts; they never consume the
                // validation-attempt budget.
            }
            EngineReply::Candidate { value } => {
                history.push(TurnRecord::Candidate {
                    value: value.clone(),
                });
                attempts += 1;

                let message = match parse_candidate::<V::Output>(&result_schema, &value) {
                    Err(message) => {
                        warn!(attempt = attempts, "malformed candidate");
                        message
                    }
                    Ok(candidate) => match validator.validate(&candidate) {
                        Verdict::Accept => {
                            info!(attempts, "candidate accepted");
                            return Ok(TurnOutcome::Accepted {
                                candidate,
                                attempts,
                            });
                        }
                        Verdict::Retry(directive) => {
                            debug!(
                                attempt = attempts,
                                violations = directive.messages.len(),
                                "candidate rejected"
                            );
                            directive.feedback()
                        }
                    },
                };

                if attempts >= config.max_attempts {
                    info!(attempts, "attempt budget exhausted");
                    return Ok(TurnOutcome::RetriesExhausted { attempts });
                }
                history.push(TurnRecord::Corrective {
                    text: message.clone(),
                });
                feedback = message;
            }
        }
    }
}

/// Schema-check and decode a structured candidate.
///
/// Returns the corrective message to feed back on failure.
fn parse_candidate<T: DeserializeOwned>(
    schema: &jsonschema::Validator,
    value: &Value,
) -> Result<Candidate<T>, String> {
    let violations: Vec<String> = schema.iter_errors(value).map(|err| err.to_string()).collect();
    if !violations.is_empty() {
        return Err(format!(
            "The result did not match the expected schema:\n{}",
            violations.join("\n")
        ));
    }
    serde_json::from_value(value.clone())
        .map_err(|err| format!("The result could not be decoded: {err}"))
}
