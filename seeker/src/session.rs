//! Session loop driving repeated orchestrator turns.
//!
//! The loop distinguishes validator-driven retries (internal, constraint
//! violations, handled inside [`crate::turn`]) from caller-driven re-queries
//! (external, preference-driven, handled here). Both reuse the same
//! history-replay mechanism but are triggered by different actors.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::core::history::History;
use crate::core::types::{Candidate, TurnRecord};
use crate::core::usage::{UsageLedger, UsageLimits, UsageReport};
use crate::core::validator::ResultValidator;
use crate::io::engine::CompletionEngine;
use crate::tools::ToolRegistry;
use crate::turn::{TurnConfig, TurnOutcome, run_turn};

/// Caller verdict on an accepted success candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Take this result; the session ends successfully.
    Accept,
    /// Reject the candidate on preference grounds and ask for another.
    KeepSearching,
    /// Abandon the session. No further usage is charged.
    Abort,
}

/// Interactive boundary consulted after each accepted success candidate.
pub trait Decider<T> {
    fn review(&mut self, result: &T) -> Result<Decision>;
}

/// Settings for one session run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Candidate proposals tolerated before a turn gives up.
    pub max_attempts: u32,
    /// Usage ceilings shared by every engine and tool call of the session.
    pub limits: UsageLimits,
    /// JSON Schema the structured candidate must satisfy.
    pub result_schema: Value,
    /// Corrective text appended on a caller-driven re-query.
    pub requery_feedback: String,
    /// Whether a caller-driven re-query starts a fresh attempt budget.
    ///
    /// When false, proposals consumed by earlier turns count against one
    /// session-wide budget.
    pub reset_attempts_on_requery: bool,
}

/// How a session ended. Every variant carries the final usage totals.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome<T> {
    /// The caller accepted a success candidate.
    Accepted { result: T, usage: UsageReport },
    /// The engine returned the explicit not-found sentinel.
    NoResult { usage: UsageReport },
    /// The attempt budget ran out without an acceptable candidate.
    Exhausted { attempts: u32, usage: UsageReport },
    /// The caller aborted at a decision point.
    Aborted { usage: UsageReport },
}

/// Run one session to completion.
///
/// The ledger is owned by the caller so follow-up flows (e.g. seat
/// extraction after a purchase) can keep billing the same session total.
/// History is created here and replayed into every turn; it is surfaced via
/// the transcript the caller writes, never mutated externally.
pub fn run_session<E, V, D>(
    engine: &E,
    tools: &ToolRegistry,
    validator: &V,
    decider: &mut D,
    ledger: &mut UsageLedger,
    config: &SessionConfig,
    opening_prompt: &str,
) -> Result<(SessionOutcome<V::Output>, History)>
where
    E: CompletionEngine,
    V: ResultValidator,
    V::Output: DeserializeOwned,
    D: Decider<V::Output>,
{
    let mut history = History::new();
    let mut attempts_used = 0u32;
    let mut feedback = opening_prompt.to_string();
    history.push(TurnRecord::Prompt {
        text: feedback.clone(),
    });

    loop {
        let budget = if config.reset_attempts_on_requery {
            config.max_attempts
        } else {
            config.max_attempts.saturating_sub(attempts_used)
        };
        if budget == 0 {
            return Ok((
                SessionOutcome::Exhausted {
                    attempts: attempts_used,
                    usage: ledger.report(),
                },
                history,
            ));
        }

        let turn_config = TurnConfig {
            max_attempts: budget,
            limits: config.limits.clone(),
            result_schema: config.result_schema.clone(),
        };
        match run_turn(
            engine,
            tools,
            validator,
            ledger,
            &mut history,
            &feedback,
            &turn_config,
        )? {
            TurnOutcome::Accepted {
                candidate,
                attempts,
            } => {
                attempts_used += attempts;
                match candidate {
                    Candidate::NotFound => {
                        info!("engine reported no matching result");
                        return Ok((
                            SessionOutcome::NoResult {
                                usage: ledger.report(),
                            },
                            history,
                        ));
                    }
                    Candidate::Found(result) => match decider.review(&result)? {
                        Decision::Accept => {
                            info!(requests = ledger.requests(), "caller accepted result");
                            return Ok((
                                SessionOutcome::Accepted {
                                    result,
                                    usage: ledger.report(),
                                },
                                history,
                            ));
                        }
                        Decision::Abort => {
                            return Ok((
                                SessionOutcome::Aborted {
                                    usage: ledger.report(),
                                },
                                history,
                            ));
                        }
                        Decision::KeepSearching => {
                            info!("caller rejected candidate, re-querying");
                            feedback = config.requery_feedback.clone();
                            history.push(TurnRecord::Corrective {
                                text: feedback.clone(),
                            });
                        }
                    },
                }
            }
            TurnOutcome::RetriesExhausted { attempts } => {
                return Ok((
                    SessionOutcome::Exhausted {
                        attempts: attempts_used + attempts,
                        usage: ledger.report(),
                    },
                    history,
                ));
            }
        }
    }
}
