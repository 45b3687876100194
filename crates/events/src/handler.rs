use crate::{Command, Event};

/// Handles a command and emits events (command handler abstraction).
///
/// A standalone interface for command → events transformation, independent of
/// the aggregate lifecycle. Useful for workers and integration tests that do
/// not need the full dispatch pipeline. Errors are domain-specific, so the
/// error type is associated.
pub trait CommandHandler {
    type Cmd: Command;
    type Ev: Event;
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn handle(&self, command: Self::Cmd) -> Result<Vec<Self::Ev>, Self::Error>;
}

/// Execute an aggregate command deterministically (no IO, no async).
///
/// The canonical event-sourced lifecycle in one step:
///
/// 1. **Decide**: `aggregate.handle(command)` returns events (pure).
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`.
///
/// Mutates the aggregate in place. For the full pipeline with persistence and
/// publication, use the infra dispatcher; this helper is for unit tests and
/// inline processing where no store is involved.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error>
where
    A: foodflow_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
