//! Read-model projections, one per domain area.
//!
//! Every projection consumes published envelopes (JSON payloads) from the
//! shared bus, routes on `aggregate_type`, and maintains a disposable read
//! model. Idempotency under at-least-once delivery comes from per-stream
//! sequence cursors ([`StreamCursors`]).

pub mod catalog;
pub mod cursors;
pub mod cycles;
pub mod enterprises;
pub mod inventory;
pub mod relationships;
pub mod subscriptions;

pub use cursors::{CursorDecision, CursorError, StreamCursors};
