//! Append-only conversation history.

use serde::Serialize;

use crate::core::types::TurnRecord;

/// Ordered log of turn records for one session.
///
/// Append-only by construction: records can be pushed and read but never
/// rewritten, so earlier turns are never altered by later retries. The full
/// log is replayed into every engine call of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    records: Vec<TurnRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record in arrival order.
    pub fn push(&mut self, record: TurnRecord) {
        self.records.push(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
