//! Loop-level harness tests for full session lifecycle scenarios.
//!
//! These tests drive `run_session` end to end with a scripted engine to
//! verify tool rounds, constraint retries, caller re-queries, and the
//! transcript artifacts written at session end.

use std::fs;

use serde_json::json;

use seeker::core::types::TurnRecord;
use seeker::core::usage::{UsageLedger, UsageLimits};
use seeker::flights::{
    ExtractFlightsTool, FlightConstraints, FlightValidator, SAMPLE_LISTING, flight_result_schema,
};
use seeker::io::transcript::{TranscriptMeta, write_transcript};
use seeker::session::{Decision, SessionConfig, SessionOutcome, run_session};
use seeker::test_support::{
    ScriptedDecider, ScriptedEngine, candidate_response, found_flight, tool_calls_response,
};
use seeker::tools::ToolRegistry;

fn session_config(max_attempts: u32) -> SessionConfig {
    SessionConfig {
        max_attempts,
        limits: UsageLimits::default(),
        result_schema: flight_result_schema(),
        requery_feedback: "Please suggest another flight".to_string(),
        reset_attempts_on_requery: true,
    }
}

fn sfo_anc_validator() -> FlightValidator {
    FlightValidator {
        constraints: FlightConstraints {
            origin: "SFO".to_string(),
            destination: "ANC".to_string(),
            date: "2025-01-10".to_string(),
        },
    }
}

fn listing_registry() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools
        .register(Box::new(ExtractFlightsTool {
            page_text: SAMPLE_LISTING.to_string(),
            cost: 1,
        }))
        .expect("register extract_flights");
    tools
}

/// Full lifecycle: tool round, constraint retry, acceptance.
///
/// Engine script:
/// 1. Request `extract_flights` (tool round, no attempt consumed)
/// 2. Propose a flight to FAI (rejected: destination must be ANC)
/// 3. Propose the SFO -> ANC flight (validated, operator buys)
///
/// Tests: history replay grows monotonically, corrective feedback is the
/// validator message verbatim, and all engine and tool costs land on one
/// ledger.
#[test]
fn full_lifecycle_accepts_after_constraint_retry() {
    let engine = ScriptedEngine::new(vec![
        tool_calls_response(vec![("extract_flights", json!({}))], 1),
        candidate_response(found_flight("SFO-AK456", 250, "SFO", "FAI", "2025-01-10"), 1),
        candidate_response(found_flight("SFO-AK123", 350, "SFO", "ANC", "2025-01-10"), 1),
    ]);
    let tools = listing_registry();
    let mut decider = ScriptedDecider::new(vec![Decision::Accept]);
    let mut ledger = UsageLedger::new();

    let (outcome, history) = run_session(
        &engine,
        &tools,
        &sfo_anc_validator(),
        &mut decider,
        &mut ledger,
        &session_config(4),
        "Find me a flight from SFO to ANC on 2025-01-10.",
    )
    .expect("session");

    match outcome {
        SessionOutcome::Accepted { result, usage } => {
            assert_eq!(result.flight_number, "SFO-AK123");
            assert_eq!(result.price, 350);
            // 3 engine calls at 1 unit each plus 1 tool charge of 1 unit.
            assert_eq!(usage.requests, 4);
            assert_eq!(usage.units, 4);
        }
        other => panic!("expected Accepted, got {other:?}"),
    }

    // Each call saw every record produced so far.
    assert_eq!(engine.history_lens(), vec![1, 3, 5]);
    let prompts = engine.prompts();
    assert_eq!(prompts[0], "Find me a flight from SFO to ANC on 2025-01-10.");
    assert_eq!(prompts[1], prompts[0]); // tool rounds repeat the prompt
    assert_eq!(prompts[2], "Flight should have destination ANC, not FAI");

    let kinds: Vec<&str> = history
        .records()
        .iter()
        .map(|record| match record {
            TurnRecord::Prompt { .. } => "prompt",
            TurnRecord::Candidate { .. } => "candidate",
            TurnRecord::ToolCalls { .. } => "tool_calls",
            TurnRecord::ToolResult { .. } => "tool_result",
            TurnRecord::ToolFailure { .. } => "tool_failure",
            TurnRecord::Corrective { .. } => "corrective",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "prompt",
            "tool_calls",
            "tool_result",
            "candidate",
            "corrective",
            "candidate"
        ]
    );

    // The extracted listing reached the engine as a tool result.
    assert!(history.records().iter().any(|record| matches!(
        record,
        TurnRecord::ToolResult { name, content }
            if name == "extract_flights" && content.as_array().map(Vec::len) == Some(8)
    )));
    assert_eq!(decider.reviewed().len(), 1);
}

/// No matching flight: the engine answers with the not-found sentinel and
/// the session ends without consulting the operator. The transcript is
/// still written.
#[test]
fn no_match_ends_with_no_result_and_a_transcript() {
    let engine = ScriptedEngine::new(vec![
        tool_calls_response(vec![("extract_flights", json!({}))], 1),
        candidate_response(json!({"kind": "not_found"}), 1),
    ]);
    let tools = listing_registry();
    let mut decider: ScriptedDecider<seeker::flights::FlightDetails> =
        ScriptedDecider::new(vec![]);
    let mut ledger = UsageLedger::new();

    let (outcome, history) = run_session(
        &engine,
        &tools,
        &sfo_anc_validator(),
        &mut decider,
        &mut ledger,
        &session_config(4),
        "Find me a flight from SFO to SEA on 2025-01-10.",
    )
    .expect("session");

    assert!(matches!(outcome, SessionOutcome::NoResult { .. }));
    assert!(decider.reviewed().is_empty());

    let temp = tempfile::tempdir().expect("tempdir");
    let report = ledger.report();
    let meta = TranscriptMeta {
        session_id: "session-test".to_string(),
        outcome: "no_result".to_string(),
        requests: report.requests,
        units: report.units,
        duration_ms: None,
    };
    let paths = write_transcript(temp.path(), &history, &meta).expect("transcript");
    let history_raw = fs::read_to_string(&paths.history_path).expect("read history");
    assert!(history_raw.contains("not_found"));
    let meta_raw = fs::read_to_string(&paths.meta_path).expect("read meta");
    assert!(meta_raw.contains("\"no_result\""));
}

/// Operator-driven re-query: the first acceptable flight is declined on
/// preference grounds, and the re-query replays the full history plus one
/// synthetic corrective.
#[test]
fn requery_replays_history_and_accumulates_usage() {
    let engine = ScriptedEngine::new(vec![
        candidate_response(found_flight("SFO-AK123", 350, "SFO", "ANC", "2025-01-10"), 2),
        candidate_response(found_flight("SFO-AK234", 400, "SFO", "ANC", "2025-01-10"), 2),
    ]);
    let tools = ToolRegistry::new();
    let mut decider = ScriptedDecider::new(vec![Decision::KeepSearching, Decision::Accept]);
    let mut ledger = UsageLedger::new();

    let (outcome, history) = run_session(
        &engine,
        &tools,
        &sfo_anc_validator(),
        &mut decider,
        &mut ledger,
        &session_config(4),
        "Find me a flight from SFO to ANC on 2025-01-10.",
    )
    .expect("session");

    match outcome {
        SessionOutcome::Accepted { result, usage } => {
            assert_eq!(result.flight_number, "SFO-AK234");
            assert_eq!(usage.requests, 2);
            assert_eq!(usage.units, 4);
        }
        other => panic!("expected Accepted, got {other:?}"),
    }

    assert_eq!(engine.history_lens(), vec![1, 3]);
    assert_eq!(engine.prompts()[1], "Please suggest another flight");
    assert_eq!(decider.reviewed().len(), 2);
    assert_eq!(decider.reviewed()[0].flight_number, "SFO-AK123");

    let correctives = history
        .records()
        .iter()
        .filter(|record| matches!(record, TurnRecord::Corrective { .. }))
        .count();
    assert_eq!(correctives, 1);
}

/// The request limit is a hard stop: once reached, the next engine call is
/// rejected before it happens and the error is fatal.
#[test]
fn request_limit_stops_the_session_before_the_next_call() {
    let engine = ScriptedEngine::new(vec![
        candidate_response(found_flight("SFO-AK123", 350, "SFO", "ANC", "2025-01-10"), 1),
        candidate_response(found_flight("SFO-AK234", 400, "SFO", "ANC", "2025-01-10"), 1),
    ]);
    let tools = ToolRegistry::new();
    let mut decider = ScriptedDecider::new(vec![Decision::KeepSearching, Decision::Accept]);
    let mut ledger = UsageLedger::new();
    let config = SessionConfig {
        limits: UsageLimits {
            request_limit: Some(1),
            unit_ceiling: None,
        },
        ..session_config(4)
    };

    let err = run_session(
        &engine,
        &tools,
        &sfo_anc_validator(),
        &mut decider,
        &mut ledger,
        &config,
        "Find me a flight from SFO to ANC on 2025-01-10.",
    )
    .expect_err("limit");

    assert!(
        err.downcast_ref::<seeker::core::usage::BudgetExceededError>()
            .is_some()
    );
    // The second call never happened.
    assert_eq!(engine.calls(), 1);
    assert_eq!(ledger.requests(), 1);
}
