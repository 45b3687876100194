//! `foodflow-events` — event mechanics shared by all platform modules.
//!
//! Defines the event/command abstractions, the envelope persisted and
//! published for every committed event, the pub/sub bus contract with an
//! in-memory implementation, and the projection trait for read models.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;
pub mod projection;

#[cfg(test)]
mod tests;

pub use bus::{EventBus, Subscription};
pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::{CommandHandler, execute};
pub use in_memory_bus::InMemoryEventBus;
pub use projection::Projection;
