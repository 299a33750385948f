//! Interactive prompts on stdin/stdout.
//!
//! Thin I/O boundary for the session loop's decision points: one fixed-choice
//! question and one free-text question per decision.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Resolve raw operator input against the allowed choices.
///
/// Empty input falls back to `default`; anything else must match a choice
/// exactly (after trimming) or the caller should re-ask.
pub fn resolve_choice<'a>(input: &str, choices: &[&'a str], default: &'a str) -> Option<&'a str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(default);
    }
    choices.iter().find(|choice| **choice == trimmed).copied()
}

/// Ask a fixed-choice question, re-asking until the answer is recognized.
pub fn prompt_choice(question: &str, choices: &[&str], default: &str) -> Result<String> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        write!(stdout, "{question} ").context("write prompt")?;
        stdout.flush().context("flush prompt")?;

        let mut line = String::new();
        stdin
            .lock()
            .read_line(&mut line)
            .context("read choice from stdin")?;
        if let Some(choice) = resolve_choice(&line, choices, default) {
            return Ok(choice.to_string());
        }
        writeln!(stdout, "please answer one of: {}", choices.join("/"))
            .context("write choice help")?;
    }
}

/// Ask a free-text question and return the trimmed answer.
pub fn prompt_line(question: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{question} ").context("write prompt")?;
    stdout.flush().context("flush prompt")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read line from stdin")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_falls_back_to_default() {
        assert_eq!(
            resolve_choice("  \n", &["buy", "search"], "search"),
            Some("search")
        );
    }

    #[test]
    fn exact_match_wins_after_trimming() {
        assert_eq!(
            resolve_choice(" buy \n", &["buy", "search"], "search"),
            Some("buy")
        );
    }

    #[test]
    fn unrecognized_input_is_rejected() {
        assert_eq!(resolve_choice("maybe", &["buy", "search"], "search"), None);
    }
}
