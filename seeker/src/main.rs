//! Constraint-validated flight search agent loop.
//!
//! Drives a completion engine through tool rounds and validation retries
//! until it proposes a flight matching the requested origin, destination,
//! and date, then lets the operator buy it, keep searching, or quit.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use seeker::core::history::History;
use seeker::core::types::{Candidate, TurnRecord};
use seeker::core::usage::UsageLedger;
use seeker::exit_codes;
use seeker::flights::{
    ExtractFlightsTool, FlightConstraints, FlightDetails, FlightValidator, SAMPLE_LISTING,
    SeatPreference, SeatValidator, flight_result_schema, seat_result_schema,
};
use seeker::io::config::{SeekerConfig, load_config, write_config};
use seeker::io::console::{prompt_choice, prompt_line};
use seeker::io::engine::{CliEngine, CompletionEngine};
use seeker::io::prompt::{render_search, render_seat};
use seeker::io::transcript::{TranscriptMeta, write_transcript};
use seeker::logging;
use seeker::session::{Decider, Decision, SessionConfig, SessionOutcome, run_session};
use seeker::tools::ToolRegistry;
use seeker::turn::{TurnConfig, TurnOutcome, run_turn};

#[derive(Parser)]
#[command(
    name = "seeker",
    version,
    about = "Constraint-validated flight search agent loop"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a flight matching the given constraints.
    Search {
        /// Three-letter origin airport code.
        #[arg(long)]
        origin: String,
        /// Three-letter destination airport code.
        #[arg(long)]
        destination: String,
        /// Travel date, `YYYY-MM-DD`.
        #[arg(long)]
        date: String,
        /// Flight-listing page to search; the bundled sample when omitted.
        #[arg(long)]
        listing: Option<PathBuf>,
        /// Config file path.
        #[arg(long, default_value = "seeker.toml")]
        config: PathBuf,
        /// Directory for session transcripts.
        #[arg(long, default_value = ".seeker")]
        transcripts: PathBuf,
    },
    /// Write a default `seeker.toml` if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
        /// Config file path.
        #[arg(long, default_value = "seeker.toml")]
        config: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FATAL);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Search {
            origin,
            destination,
            date,
            listing,
            config,
            transcripts,
        } => cmd_search(origin, destination, date, listing, &config, &transcripts),
        Command::Init { force, config } => cmd_init(force, &config),
    }
}

fn cmd_init(force: bool, config_path: &Path) -> Result<i32> {
    if !force && config_path.exists() {
        println!("{} already exists", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &SeekerConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

/// Console decider: present each validated flight and ask the operator.
struct ConsoleDecider;

impl Decider<FlightDetails> for ConsoleDecider {
    fn review(&mut self, flight: &FlightDetails) -> Result<Decision> {
        println!(
            "Found flight {}: {} -> {} on {}, ${}",
            flight.flight_number, flight.origin, flight.destination, flight.date, flight.price
        );
        let choice = prompt_choice(
            "Do you want to buy this flight, or keep searching? (buy/*search*/quit)",
            &["buy", "search", "quit"],
            "search",
        )?;
        Ok(match choice.as_str() {
            "buy" => Decision::Accept,
            "quit" => Decision::Abort,
            _ => Decision::KeepSearching,
        })
    }
}

fn cmd_search(
    origin: String,
    destination: String,
    date: String,
    listing: Option<PathBuf>,
    config_path: &Path,
    transcripts: &Path,
) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let workdir = std::env::current_dir().context("resolve working directory")?;
    let engine = cfg.engine(&workdir);

    let page_text = match listing {
        Some(path) => {
            fs::read_to_string(&path).with_context(|| format!("read listing {}", path.display()))?
        }
        None => SAMPLE_LISTING.to_string(),
    };
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(ExtractFlightsTool { page_text, cost: 1 }))?;

    let validator = FlightValidator {
        constraints: FlightConstraints {
            origin: origin.clone(),
            destination: destination.clone(),
            date: date.clone(),
        },
    };
    let session_config = SessionConfig {
        max_attempts: cfg.max_attempts,
        limits: cfg.limits.clone(),
        result_schema: flight_result_schema(),
        requery_feedback: cfg.requery_feedback.clone(),
        reset_attempts_on_requery: cfg.reset_attempts_on_requery,
    };
    let opening = render_search(&origin, &destination, &date);

    let started = Instant::now();
    let mut ledger = UsageLedger::new();
    let mut decider = ConsoleDecider;
    let (outcome, history) = run_session(
        &engine,
        &tools,
        &validator,
        &mut decider,
        &mut ledger,
        &session_config,
        &opening,
    )?;

    let code = match &outcome {
        SessionOutcome::Accepted { result, .. } => {
            // Seat extraction bills the same session ledger as the search.
            let seat = find_seat(&engine, &cfg, &mut ledger)?;
            println!(
                "Purchasing flight {}, seat {}{}...",
                result.flight_number, seat.row, seat.seat
            );
            exit_codes::OK
        }
        SessionOutcome::NoResult { .. } => {
            println!("No matching flight was found.");
            exit_codes::NO_RESULT
        }
        SessionOutcome::Exhausted { attempts, .. } => {
            println!("Gave up after {attempts} unacceptable proposals.");
            exit_codes::EXHAUSTED
        }
        SessionOutcome::Aborted { .. } => {
            println!("Search abandoned.");
            exit_codes::ABORTED
        }
    };

    if persists_transcript(&outcome) {
        let report = ledger.report();
        let meta = TranscriptMeta {
            session_id: session_id(),
            outcome: outcome_label(&outcome).to_string(),
            requests: report.requests,
            units: report.units,
            duration_ms: u64::try_from(started.elapsed().as_millis()).ok(),
        };
        let paths = write_transcript(transcripts, &history, &meta)?;
        println!(
            "Session used {} requests ({} units); transcript at {}",
            report.requests,
            report.units,
            paths.dir.display()
        );
    }
    Ok(code)
}

/// Whether a finished session leaves transcript artifacts behind.
///
/// An operator abort discards the partial history instead of persisting it;
/// nothing is written under the transcript directory.
fn persists_transcript<T>(outcome: &SessionOutcome<T>) -> bool {
    !matches!(outcome, SessionOutcome::Aborted { .. })
}

/// Ask the operator for a seat and extract a structured preference,
/// re-asking until the engine understands the answer.
///
/// Every re-ask runs over one shared history, so the engine sees the
/// previously misunderstood answers alongside the new one.
fn find_seat(
    engine: &CliEngine,
    cfg: &SeekerConfig,
    ledger: &mut UsageLedger,
) -> Result<SeatPreference> {
    let turn_config = TurnConfig {
        max_attempts: cfg.max_attempts,
        limits: cfg.limits.clone(),
        result_schema: seat_result_schema(),
    };
    let mut history = History::new();
    loop {
        let answer = prompt_line("What seat would you like?")?;
        match extract_seat(engine, ledger, &mut history, &turn_config, &answer)? {
            Some(seat) => return Ok(seat),
            None => println!("Could not understand the seat preference, please try again."),
        }
    }
}

/// Run one seat-extraction turn over the shared history.
///
/// Returns `None` when the engine could not extract a seat from the answer.
fn extract_seat<E: CompletionEngine>(
    engine: &E,
    ledger: &mut UsageLedger,
    history: &mut History,
    turn_config: &TurnConfig,
    answer: &str,
) -> Result<Option<SeatPreference>> {
    let tools = ToolRegistry::new();
    let prompt = render_seat(answer);
    history.push(TurnRecord::Prompt {
        text: prompt.clone(),
    });
    match run_turn(
        engine,
        &tools,
        &SeatValidator,
        ledger,
        history,
        &prompt,
        turn_config,
    )? {
        TurnOutcome::Accepted {
            candidate: Candidate::Found(seat),
            ..
        } => Ok(Some(seat)),
        TurnOutcome::Accepted {
            candidate: Candidate::NotFound,
            ..
        }
        | TurnOutcome::RetriesExhausted { .. } => Ok(None),
    }
}

fn outcome_label(outcome: &SessionOutcome<FlightDetails>) -> &'static str {
    match outcome {
        SessionOutcome::Accepted { .. } => "accepted",
        SessionOutcome::NoResult { .. } => "no_result",
        SessionOutcome::Exhausted { .. } => "exhausted",
        SessionOutcome::Aborted { .. } => "aborted",
    }
}

fn session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("session-{millis}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use seeker::core::usage::UsageLimits;
    use seeker::test_support::{ScriptedEngine, candidate_response};
    use serde_json::json;

    #[test]
    fn parse_search() {
        let cli = Cli::parse_from([
            "seeker",
            "search",
            "--origin",
            "SFO",
            "--destination",
            "ANC",
            "--date",
            "2025-01-10",
        ]);
        match cli.command {
            Command::Search {
                origin,
                destination,
                date,
                listing,
                config,
                transcripts,
            } => {
                assert_eq!(origin, "SFO");
                assert_eq!(destination, "ANC");
                assert_eq!(date, "2025-01-10");
                assert!(listing.is_none());
                assert_eq!(config, PathBuf::from("seeker.toml"));
                assert_eq!(transcripts, PathBuf::from(".seeker"));
            }
            Command::Init { .. } => panic!("expected search"),
        }
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["seeker", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true, .. }));
    }

    /// An abandoned search discards the partial history: no transcript
    /// directory is created. Every other outcome persists one.
    #[test]
    fn only_aborted_sessions_skip_the_transcript() {
        let usage = UsageLedger::new().report();
        assert!(!persists_transcript::<FlightDetails>(
            &SessionOutcome::Aborted { usage }
        ));
        assert!(persists_transcript::<FlightDetails>(
            &SessionOutcome::NoResult { usage }
        ));
        assert!(persists_transcript::<FlightDetails>(
            &SessionOutcome::Exhausted { attempts: 4, usage }
        ));
    }

    /// A misunderstood seat answer stays in the history, so the next turn
    /// replays it alongside the new answer.
    #[test]
    fn seat_reasks_share_one_history() {
        let engine = ScriptedEngine::new(vec![
            candidate_response(json!({"kind": "not_found"}), 1),
            candidate_response(json!({"kind": "found", "row": 1, "seat": "A"}), 1),
        ]);
        let mut ledger = UsageLedger::new();
        let mut history = History::new();
        let turn_config = TurnConfig {
            max_attempts: 4,
            limits: UsageLimits::default(),
            result_schema: seat_result_schema(),
        };

        let first = extract_seat(
            &engine,
            &mut ledger,
            &mut history,
            &turn_config,
            "somewhere nice",
        )
        .expect("first turn");
        assert_eq!(first, None);

        let second = extract_seat(
            &engine,
            &mut ledger,
            &mut history,
            &turn_config,
            "row 1 seat A",
        )
        .expect("second turn");
        assert_eq!(second, Some(SeatPreference { row: 1, seat: 'A' }));

        // Second call saw the first prompt, its candidate, and the new prompt.
        assert_eq!(engine.history_lens(), vec![1, 3]);
        assert!(history.records().iter().any(|record| matches!(
            record,
            TurnRecord::Prompt { text } if text.contains("somewhere nice")
        )));
    }

    #[test]
    fn outcome_labels_are_stable() {
        let usage = UsageLedger::new().report();
        assert_eq!(
            outcome_label(&SessionOutcome::NoResult { usage }),
            "no_result"
        );
        assert_eq!(
            outcome_label(&SessionOutcome::Exhausted { attempts: 4, usage }),
            "exhausted"
        );
    }
}
