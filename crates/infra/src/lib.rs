//! `foodflow-infra` — infrastructure for the event-sourced platform core.
//!
//! Composes the pure domain crates with storage and distribution:
//!
//! - `event_store`: append-only streams with optimistic concurrency
//!   (in-memory always; Postgres behind the `postgres` feature)
//! - `command_dispatcher`: load → rehydrate → decide → append → publish
//! - `read_model`: key/value store abstraction for disposable read models
//! - `projections`: per-domain read models with idempotent cursors

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;

#[cfg(test)]
mod integration_tests;
