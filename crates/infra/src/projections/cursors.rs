use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use foodflow_core::AggregateId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Whether an envelope should be applied or silently skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDecision {
    Apply,
    /// Duplicate or replay at-or-below the cursor; safe to ignore.
    Skip,
}

/// Per-stream sequence cursors shared by all projections.
///
/// At-least-once delivery means an envelope can arrive twice; a cursor per
/// `(aggregate stream)` lets a projection skip replays and reject gaps. The
/// first event of a stream may carry any positive sequence (stores start at
/// 1); after that increments must be strict.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    fn last(&self, aggregate_id: AggregateId) -> u64 {
        match self.inner.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    /// Decide whether an envelope at `sequence_number` should be applied.
    pub fn decide(
        &self,
        aggregate_id: AggregateId,
        sequence_number: u64,
    ) -> Result<CursorDecision, CursorError> {
        let last = self.last(aggregate_id);

        if sequence_number == 0 {
            return Err(CursorError::NonMonotonicSequence { last, found: 0 });
        }

        if sequence_number <= last {
            return Ok(CursorDecision::Skip);
        }

        if last != 0 && sequence_number != last + 1 {
            return Err(CursorError::NonMonotonicSequence {
                last,
                found: sequence_number,
            });
        }

        Ok(CursorDecision::Apply)
    }

    /// Advance the cursor after a successful apply.
    pub fn advance(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    /// Forget all cursors (read-model rebuild support).
    pub fn clear(&self) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_are_skipped_and_gaps_rejected() {
        let cursors = StreamCursors::new();
        let stream = AggregateId::new();

        assert_eq!(cursors.decide(stream, 1), Ok(CursorDecision::Apply));
        cursors.advance(stream, 1);

        // Replay of an applied event.
        assert_eq!(cursors.decide(stream, 1), Ok(CursorDecision::Skip));

        // Gap after the first applied event.
        assert!(cursors.decide(stream, 3).is_err());

        assert_eq!(cursors.decide(stream, 2), Ok(CursorDecision::Apply));
    }

    #[test]
    fn first_event_may_start_above_one() {
        let cursors = StreamCursors::new();
        let stream = AggregateId::new();

        assert_eq!(cursors.decide(stream, 5), Ok(CursorDecision::Apply));
    }
}
