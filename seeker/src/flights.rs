//! Flight-search reference domain: details, constraints, validation, and
//! the listing-extraction tool.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::core::types::Candidate;
use crate::core::validator::{ResultValidator, RetryDirective, Verdict};
use crate::tools::{Tool, ToolContext, ToolSpec};

/// JSON Schema for `Candidate<FlightDetails>` (Draft 2020-12).
pub const FLIGHT_RESULT_SCHEMA: &str = include_str!("../schemas/flight_result.schema.json");
/// JSON Schema for `Candidate<SeatPreference>` (Draft 2020-12).
pub const SEAT_RESULT_SCHEMA: &str = include_str!("../schemas/seat_result.schema.json");
/// Bundled flight-listing page used when no listing file is given.
pub const SAMPLE_LISTING: &str = include_str!("../assets/sample_listing.txt");

pub fn flight_result_schema() -> Value {
    serde_json::from_str(FLIGHT_RESULT_SCHEMA).expect("flight result schema should be valid JSON")
}

pub fn seat_result_schema() -> Value {
    serde_json::from_str(SEAT_RESULT_SCHEMA).expect("seat result schema should be valid JSON")
}

/// Details of the most suitable flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetails {
    pub flight_number: String,
    /// Whole-dollar price.
    pub price: u32,
    /// Three-letter airport code.
    pub origin: String,
    /// Three-letter airport code.
    pub destination: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
}

/// Required fields a proposed flight must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightConstraints {
    pub origin: String,
    pub destination: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
}

/// Checks candidates field-by-field against the session constraints.
///
/// Checks run in constraint-declaration order (origin, destination, date) so
/// repeated runs against the same bad input produce identical feedback.
pub struct FlightValidator {
    pub constraints: FlightConstraints,
}

impl ResultValidator for FlightValidator {
    type Output = FlightDetails;

    fn validate(&self, candidate: &Candidate<FlightDetails>) -> Verdict {
        let flight = match candidate {
            // No constraint applies to an explicit non-answer.
            Candidate::NotFound => return Verdict::Accept,
            Candidate::Found(flight) => flight,
        };

        let req = &self.constraints;
        let mut messages = Vec::new();
        if flight.origin != req.origin {
            messages.push(format!(
                "Flight should have origin {}, not {}",
                req.origin, flight.origin
            ));
        }
        if flight.destination != req.destination {
            messages.push(format!(
                "Flight should have destination {}, not {}",
                req.destination, flight.destination
            ));
        }
        if flight.date != req.date {
            messages.push(format!(
                "Flight should have date {}, not {}",
                req.date, flight.date
            ));
        }

        match RetryDirective::from_messages(messages) {
            None => Verdict::Accept,
            Some(directive) => Verdict::Retry(directive),
        }
    }
}

/// Operator seat choice extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPreference {
    /// 1 is the front row; 30 is the last.
    pub row: u32,
    /// Column letter, `A` through `F`.
    pub seat: char,
}

/// Accepts any well-formed seat candidate; the seat flow re-asks the
/// operator on `NotFound` instead of correcting the engine.
pub struct SeatValidator;

impl ResultValidator for SeatValidator {
    type Output = SeatPreference;

    fn validate(&self, _candidate: &Candidate<SeatPreference>) -> Verdict {
        Verdict::Accept
    }
}

/// Extracts structured flight records from a listing page text.
///
/// Deterministic stand-in for a nested extraction agent; its cost is billed
/// against the session ledger like any nested call.
pub struct ExtractFlightsTool {
    pub page_text: String,
    /// Units charged per invocation.
    pub cost: u64,
}

impl Tool for ExtractFlightsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "extract_flights".to_string(),
            description: "Get details of all flights in the listing.".to_string(),
            parameters: json!({
                "type": "object",
                "additionalProperties": false
            }),
        }
    }

    fn call(&self, _arguments: &Value, ctx: &mut ToolContext<'_>) -> Result<Value> {
        ctx.ledger.charge(self.cost, ctx.limits)?;
        let flights = parse_listing(&self.page_text);
        info!(flight_count = flights.len(), "extracted flights");
        Ok(serde_json::to_value(flights)?)
    }
}

static LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*\d+\.\s*Flight (?P<number>\S+)\s*\n\s*- Price: \$(?P<price>\d+)\s*\n\s*- Origin: [^(\n]*\((?P<origin>[A-Z]{3})\)\s*\n\s*- Destination: [^(\n]*\((?P<destination>[A-Z]{3})\)\s*\n\s*- Date: (?P<date>[^\n]+)",
    )
    .expect("listing regex should compile")
});

static HUMAN_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<month>[A-Za-z]+) (?P<day>\d{1,2}), (?P<year>\d{4})$")
        .expect("date regex should compile")
});

/// Parse listing blocks of the form emitted by booking pages:
///
/// ```text
/// 1. Flight SFO-AK123
/// - Price: $350
/// - Origin: San Francisco International Airport (SFO)
/// - Destination: Ted Stevens Anchorage International Airport (ANC)
/// - Date: January 10, 2025
/// ```
///
/// Blocks that do not match are skipped.
pub fn parse_listing(text: &str) -> Vec<FlightDetails> {
    LISTING_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let price: u32 = caps["price"].parse().ok()?;
            let date = iso_date(caps["date"].trim())?;
            Some(FlightDetails {
                flight_number: caps["number"].to_string(),
                price,
                origin: caps["origin"].to_string(),
                destination: caps["destination"].to_string(),
                date,
            })
        })
        .collect()
}

/// Convert a human date like `January 10, 2025` to `2025-01-10`.
///
/// Dates already in ISO form pass through unchanged.
fn iso_date(text: &str) -> Option<String> {
    if text.len() == 10 && text.as_bytes()[4] == b'-' {
        return Some(text.to_string());
    }
    let caps = HUMAN_DATE_RE.captures(text)?;
    let month = match caps["month"].to_ascii_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    let day: u32 = caps["day"].parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{}-{:02}-{:02}", &caps["year"], month, day))
}
