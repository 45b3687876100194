//! Dispatch pipeline benchmarks: command execution cost and rehydration of
//! long streams through the in-memory store.

use std::sync::Arc;

use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::Value as JsonValue;

use foodflow_core::AggregateId;
use foodflow_cycles::{
    AddIncomingExchange, AttachExchangeVariant, CreateOrderCycle, ExchangeId, OrderCycle,
    OrderCycleCommand, OrderCycleId,
};
use foodflow_catalog::VariantId;
use foodflow_enterprises::EnterpriseId;
use foodflow_events::{EventEnvelope, InMemoryEventBus};
use foodflow_infra::command_dispatcher::CommandDispatcher;
use foodflow_infra::event_store::InMemoryEventStore;

type BenchDispatcher =
    CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

fn dispatcher() -> BenchDispatcher {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
    CommandDispatcher::new(store, bus)
}

fn seeded_cycle(dispatcher: &BenchDispatcher, attach_count: usize) -> (AggregateId, ExchangeId) {
    let agg = AggregateId::new();
    let cycle_id = OrderCycleId::new(agg);
    let make = |id: AggregateId| OrderCycle::empty(OrderCycleId::new(id));

    dispatcher
        .dispatch::<OrderCycle>(
            agg,
            "cycles.order_cycle",
            OrderCycleCommand::CreateOrderCycle(CreateOrderCycle {
                cycle_id,
                name: "Bench cycle".to_string(),
                coordinator: EnterpriseId::new(AggregateId::new()),
                orders_open_at: None,
                orders_close_at: None,
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

    let exchange_id = ExchangeId::new(AggregateId::new());
    dispatcher
        .dispatch::<OrderCycle>(
            agg,
            "cycles.order_cycle",
            OrderCycleCommand::AddIncomingExchange(AddIncomingExchange {
                cycle_id,
                exchange_id,
                supplier: EnterpriseId::new(AggregateId::new()),
                receival_instructions: "instructions".to_string(),
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

    for _ in 0..attach_count {
        dispatcher
            .dispatch::<OrderCycle>(
                agg,
                "cycles.order_cycle",
                OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                    cycle_id,
                    exchange_id,
                    variant_id: VariantId::new(AggregateId::new()),
                    occurred_at: Utc::now(),
                }),
                make,
            )
            .unwrap();
    }

    (agg, exchange_id)
}

fn bench_dispatch(c: &mut Criterion) {
    c.bench_function("dispatch_attach_variant_short_stream", |b| {
        let dispatcher = dispatcher();
        let (agg, exchange_id) = seeded_cycle(&dispatcher, 0);
        let cycle_id = OrderCycleId::new(agg);

        b.iter(|| {
            dispatcher
                .dispatch::<OrderCycle>(
                    agg,
                    "cycles.order_cycle",
                    OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                        cycle_id,
                        exchange_id,
                        variant_id: VariantId::new(AggregateId::new()),
                        occurred_at: Utc::now(),
                    }),
                    |id| OrderCycle::empty(OrderCycleId::new(id)),
                )
                .unwrap()
        });
    });

    c.bench_function("dispatch_rehydrates_long_stream", |b| {
        let dispatcher = dispatcher();
        let (agg, exchange_id) = seeded_cycle(&dispatcher, 500);
        let cycle_id = OrderCycleId::new(agg);

        b.iter(|| {
            dispatcher
                .dispatch::<OrderCycle>(
                    agg,
                    "cycles.order_cycle",
                    OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                        cycle_id,
                        exchange_id,
                        variant_id: VariantId::new(AggregateId::new()),
                        occurred_at: Utc::now(),
                    }),
                    |id| OrderCycle::empty(OrderCycleId::new(id)),
                )
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
