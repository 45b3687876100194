use crate::{Event, EventEnvelope};

/// A projection builds a read model from an append-only event stream.
///
/// Projections are the CQRS read side: they transform events (write model)
/// into queryable state (read model). Read models are **disposable**: they
/// can be deleted and rebuilt from the event store at any time, which is how
/// schema changes and projection bug fixes are rolled out.
///
/// Projections must be **idempotent**: applying the same event twice must
/// produce the same result. At-least-once delivery and replay both rely on
/// this; tracking per-stream sequence numbers is the usual strategy.
///
/// Persistence of the read model is an infrastructure concern: in-memory
/// maps for tests, database tables for production.
pub trait Projection {
    type Ev: Event;

    /// Apply a single event to the projection, updating the read model.
    ///
    /// Does not return errors: an irrelevant event is ignored, a failed apply
    /// is logged and skipped. Structured error handling belongs to the infra
    /// wrappers that deserialize payloads before calling this.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>);
}
