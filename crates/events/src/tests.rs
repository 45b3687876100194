//! Crate-level tests driving the event mechanics together: a toy counter
//! aggregate run through `execute`, distributed over the in-memory bus, and
//! folded into a read model via the `Projection` trait.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};

use crate::{
    Command, CommandHandler, Event, EventBus, EventEnvelope, InMemoryEventBus, Projection, execute,
};

#[derive(Debug, Clone)]
struct Increment {
    counter_id: AggregateId,
    by: u64,
    occurred_at: DateTime<Utc>,
}

impl Command for Increment {
    fn target_aggregate_id(&self) -> AggregateId {
        self.counter_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Incremented {
    counter_id: AggregateId,
    by: u64,
    occurred_at: DateTime<Utc>,
}

impl Event for Incremented {
    fn event_type(&self) -> &'static str {
        "test.counter.incremented"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Clone)]
struct Counter {
    id: AggregateId,
    total: u64,
    version: u64,
}

impl Counter {
    fn new(id: AggregateId) -> Self {
        Self {
            id,
            total: 0,
            version: 0,
        }
    }
}

impl AggregateRoot for Counter {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Counter {
    type Command = Increment;
    type Event = Incremented;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        self.total += event.by;
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if command.by == 0 {
            return Err(DomainError::validation("increment must be positive"));
        }
        Ok(vec![Incremented {
            counter_id: command.counter_id,
            by: command.by,
            occurred_at: command.occurred_at,
        }])
    }
}

struct CounterHandler;

impl CommandHandler for CounterHandler {
    type Cmd = Increment;
    type Ev = Incremented;
    type Error = DomainError;

    fn handle(&self, command: Self::Cmd) -> Result<Vec<Self::Ev>, Self::Error> {
        Counter::new(command.target_aggregate_id()).handle(&command)
    }
}

/// Read model: per-counter totals, idempotent by sequence number.
#[derive(Default)]
struct TotalsProjection {
    totals: HashMap<AggregateId, u64>,
    cursors: HashMap<AggregateId, u64>,
}

impl Projection for TotalsProjection {
    type Ev = Incremented;

    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>) {
        let last = self.cursors.get(&envelope.aggregate_id()).copied().unwrap_or(0);
        if envelope.sequence_number() <= last {
            return;
        }

        *self.totals.entry(envelope.aggregate_id()).or_default() += envelope.payload().by;
        self.cursors.insert(envelope.aggregate_id(), envelope.sequence_number());
    }
}

fn envelope(seq: u64, event: Incremented) -> EventEnvelope<Incremented> {
    EventEnvelope::new(Uuid::now_v7(), event.counter_id, "test.counter", seq, event)
}

#[test]
fn execute_decides_and_evolves_in_one_step() {
    let id = AggregateId::new();
    let mut counter = Counter::new(id);

    let events = execute(
        &mut counter,
        &Increment {
            counter_id: id,
            by: 3,
            occurred_at: Utc::now(),
        },
    )
    .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(counter.total, 3);
    assert_eq!(counter.version(), 1);
}

#[test]
fn command_handler_rejects_invalid_commands() {
    let err = CounterHandler
        .handle(Increment {
            counter_id: AggregateId::new(),
            by: 0,
            occurred_at: Utc::now(),
        })
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[test]
fn bus_broadcasts_to_every_subscriber() {
    let bus: InMemoryEventBus<u64> = InMemoryEventBus::new();
    let first = bus.subscribe();
    let second = bus.subscribe();

    bus.publish(7).unwrap();

    assert_eq!(first.try_recv(), Ok(7));
    assert_eq!(second.try_recv(), Ok(7));

    // A dropped subscriber is pruned; publishing keeps working.
    drop(first);
    bus.publish(8).unwrap();
    assert_eq!(second.try_recv(), Ok(8));
}

#[test]
fn projection_is_idempotent_under_redelivery() {
    let id = AggregateId::new();
    let mut projection = TotalsProjection::default();

    let first = envelope(
        1,
        Incremented {
            counter_id: id,
            by: 2,
            occurred_at: Utc::now(),
        },
    );
    let second = envelope(
        2,
        Incremented {
            counter_id: id,
            by: 5,
            occurred_at: Utc::now(),
        },
    );

    // At-least-once delivery: the first envelope arrives twice.
    projection.apply(&first);
    projection.apply(&first);
    projection.apply(&second);

    assert_eq!(projection.totals.get(&id), Some(&7));
}
