//! Result validation contracts.
//!
//! Validation failures are data, not errors: the orchestrator consumes a
//! [`Verdict::Retry`] by feeding its messages back to the engine as
//! corrective context.

use crate::core::types::Candidate;

/// Ordered, human-readable reasons a candidate was rejected.
///
/// Message order must follow constraint declaration order so repeated runs
/// against the same bad input produce identical feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDirective {
    pub messages: Vec<String>,
}

impl RetryDirective {
    /// Build a directive from collected violation messages.
    ///
    /// Returns `None` when there are no violations, so a directive always
    /// carries at least one message.
    pub fn from_messages(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self { messages })
        }
    }

    /// Render the messages as corrective feedback, one per line.
    pub fn feedback(&self) -> String {
        self.messages.join("\n")
    }
}

/// Validator decision for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Retry(RetryDirective),
}

/// Domain predicate set applied to every candidate before it is surfaced.
///
/// Implementations must be deterministic and must accept
/// [`Candidate::NotFound`] unconditionally: no constraint applies to an
/// explicit non-answer.
pub trait ResultValidator {
    type Output;

    fn validate(&self, candidate: &Candidate<Self::Output>) -> Verdict;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_requires_at_least_one_message() {
        assert_eq!(RetryDirective::from_messages(Vec::new()), None);

        let directive = RetryDirective::from_messages(vec!["bad origin".to_string()])
            .expect("non-empty messages");
        assert_eq!(directive.feedback(), "bad origin");
    }

    #[test]
    fn feedback_joins_messages_in_order() {
        let directive =
            RetryDirective::from_messages(vec!["first".to_string(), "second".to_string()])
                .expect("messages");
        assert_eq!(directive.feedback(), "first\nsecond");
    }
}
