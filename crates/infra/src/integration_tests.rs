//! End-to-end tests for the dispatch → store → bus → projection pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use foodflow_auth::AccessScope;
use foodflow_catalog::VariantId;
use foodflow_core::{AggregateId, ExpectedVersion};
use foodflow_cycles::{
    AddIncomingExchange, AddOutgoingExchange, AttachExchangeVariant, CreateOrderCycle, ExchangeId,
    OrderCycle, OrderCycleCommand, OrderCycleId,
};
use foodflow_enterprises::{
    Enterprise, EnterpriseCommand, EnterpriseId, RegisterEnterprise, SellsScope,
};
use foodflow_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use foodflow_relationships::{
    CreateRelationship, Permission, RelationshipId, RelationshipRegistry,
    RelationshipRegistryCommand,
};
use foodflow_subscriptions::{
    CreateSubscription, CustomerId, GenerateProxyOrder, ProxyOrderId, ScheduleId,
    Subscription as StandingOrder, SubscriptionCommand, SubscriptionId,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{EventStore, InMemoryEventStore, UncommittedEvent};
use crate::projections::cycles::OrderCyclesProjection;
use crate::projections::enterprises::EnterpriseDirectoryProjection;
use crate::projections::relationships::RelationshipsProjection;
use crate::read_model::InMemoryReadModelStore;

type TestDispatcher =
    CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

fn pipeline() -> (
    TestDispatcher,
    Arc<InMemoryEventStore>,
    Subscription<EventEnvelope<JsonValue>>,
) {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
    let sub = bus.subscribe();
    (CommandDispatcher::new(store.clone(), bus), store, sub)
}

fn drain(sub: &Subscription<EventEnvelope<JsonValue>>, mut apply: impl FnMut(&EventEnvelope<JsonValue>)) {
    while let Ok(env) = sub.try_recv() {
        apply(&env);
    }
}

fn register_enterprise(dispatcher: &TestDispatcher, name: &str) -> EnterpriseId {
    let agg = AggregateId::new();
    let enterprise_id = EnterpriseId::new(agg);
    dispatcher
        .dispatch::<Enterprise>(
            agg,
            "enterprises.enterprise",
            EnterpriseCommand::RegisterEnterprise(RegisterEnterprise {
                enterprise_id,
                owner: foodflow_core::UserId::new(),
                name: name.to_string(),
                sells: SellsScope::Any,
                is_primary_producer: false,
                description: None,
                contact: None,
                occurred_at: Utc::now(),
            }),
            |id| Enterprise::empty(EnterpriseId::new(id)),
        )
        .unwrap();
    enterprise_id
}

fn create_relationship(
    dispatcher: &TestDispatcher,
    registry_stream: AggregateId,
    parent: EnterpriseId,
    child: EnterpriseId,
    permissions: &[Permission],
) -> Result<RelationshipId, DispatchError> {
    let relationship_id = RelationshipId::new(AggregateId::new());
    dispatcher
        .dispatch::<RelationshipRegistry>(
            registry_stream,
            "relationships.registry",
            RelationshipRegistryCommand::CreateRelationship(CreateRelationship {
                relationship_id,
                parent,
                child,
                permissions: permissions.iter().copied().collect(),
                occurred_at: Utc::now(),
            }),
            |id| RelationshipRegistry::empty(RelationshipId::new(id)),
        )
        .map(|_| relationship_id)
}

#[test]
fn duplicate_relationship_is_rejected_through_the_full_pipeline() {
    let (dispatcher, store, sub) = pipeline();
    let registry_stream = AggregateId::new();

    let one = register_enterprise(&dispatcher, "One");
    let two = register_enterprise(&dispatcher, "Two");

    create_relationship(&dispatcher, registry_stream, one, two, &[Permission::AddToOrderCycle])
        .unwrap();
    let stream_len = store.load_stream(registry_stream).unwrap().len();

    // Second create of the same ordered pair: user-facing validation error,
    // nothing persisted.
    let err = create_relationship(&dispatcher, registry_stream, one, two, &[]).unwrap_err();
    match err {
        DispatchError::InvariantViolation(msg) => {
            assert_eq!(msg, "That relationship is already established.");
        }
        other => panic!("expected invariant violation, got {other:?}"),
    }
    assert_eq!(store.load_stream(registry_stream).unwrap().len(), stream_len);

    // The reverse direction is an independent grant.
    create_relationship(&dispatcher, registry_stream, two, one, &[]).unwrap();

    // Projection sees exactly the two surviving relationships.
    let projection = RelationshipsProjection::new(Arc::new(InMemoryReadModelStore::new()));
    drain(&sub, |env| projection.apply_envelope(env).unwrap());
    assert_eq!(projection.list().len(), 2);
}

#[test]
fn concurrent_appends_race_on_the_registry_stream() {
    let (dispatcher, store, _sub) = pipeline();
    let registry_stream = AggregateId::new();

    let one = register_enterprise(&dispatcher, "One");
    let two = register_enterprise(&dispatcher, "Two");

    create_relationship(&dispatcher, registry_stream, one, two, &[]).unwrap();

    // A second writer that loaded the registry before the create above
    // holds a stale expected version; its append must lose at the store.
    let stale = UncommittedEvent {
        event_id: uuid::Uuid::now_v7(),
        aggregate_id: registry_stream,
        aggregate_type: "relationships.registry".to_string(),
        event_type: "relationships.relationship.created".to_string(),
        event_version: 1,
        occurred_at: Utc::now(),
        payload: serde_json::json!({}),
    };
    let err = store.append(vec![stale], ExpectedVersion::Exact(0)).unwrap_err();
    assert!(matches!(err, crate::event_store::EventStoreError::Concurrency(_)));

    // The loser re-dispatches against fresh state and lands on the domain
    // duplicate rule instead of silently double-creating.
    let err = create_relationship(&dispatcher, registry_stream, one, two, &[]).unwrap_err();
    assert!(matches!(err, DispatchError::InvariantViolation(_)));
}

#[test]
fn scoped_visibility_flows_into_the_projection() {
    let (dispatcher, _store, sub) = pipeline();
    let registry_stream = AggregateId::new();

    let d1 = register_enterprise(&dispatcher, "Hub One");
    let d2 = register_enterprise(&dispatcher, "Hub Two");
    let d3 = register_enterprise(&dispatcher, "Hub Three");

    create_relationship(&dispatcher, registry_stream, d1, d2, &[]).unwrap();
    create_relationship(&dispatcher, registry_stream, d2, d1, &[]).unwrap();
    create_relationship(&dispatcher, registry_stream, d2, d3, &[]).unwrap();

    let projection = RelationshipsProjection::new(Arc::new(InMemoryReadModelStore::new()));
    drain(&sub, |env| projection.apply_envelope(env).unwrap());

    let scope = AccessScope::enterprises([d1.0]);
    let visible = projection.visible_for(&scope);
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|r| r.parent == d1 || r.child == d1));

    assert_eq!(projection.visible_for(&AccessScope::all()).len(), 3);
}

#[test]
fn exchange_network_round_trips_through_store_and_projection() {
    let (dispatcher, _store, sub) = pipeline();

    let coordinator = register_enterprise(&dispatcher, "Coordinator");
    let supplier = register_enterprise(&dispatcher, "Supplier");
    let distributor = register_enterprise(&dispatcher, "Distributor");

    let agg = AggregateId::new();
    let cycle_id = OrderCycleId::new(agg);
    let make = |id: AggregateId| OrderCycle::empty(OrderCycleId::new(id));

    dispatcher
        .dispatch::<OrderCycle>(
            agg,
            "cycles.order_cycle",
            OrderCycleCommand::CreateOrderCycle(CreateOrderCycle {
                cycle_id,
                name: "Cycle".to_string(),
                coordinator,
                orders_open_at: None,
                orders_close_at: None,
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

    let incoming = ExchangeId::new(AggregateId::new());
    dispatcher
        .dispatch::<OrderCycle>(
            agg,
            "cycles.order_cycle",
            OrderCycleCommand::AddIncomingExchange(AddIncomingExchange {
                cycle_id,
                exchange_id: incoming,
                supplier,
                receival_instructions: "dock 2".to_string(),
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

    let outgoing = ExchangeId::new(AggregateId::new());
    dispatcher
        .dispatch::<OrderCycle>(
            agg,
            "cycles.order_cycle",
            OrderCycleCommand::AddOutgoingExchange(AddOutgoingExchange {
                cycle_id,
                exchange_id: outgoing,
                distributor,
                pickup_time: "Wed 9am".to_string(),
                pickup_instructions: "side door".to_string(),
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

    let variant = VariantId::new(AggregateId::new());
    let attach = OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
        cycle_id,
        exchange_id: incoming,
        variant_id: variant,
        occurred_at: Utc::now(),
    });
    dispatcher
        .dispatch::<OrderCycle>(agg, "cycles.order_cycle", attach.clone(), make)
        .unwrap();

    // Idempotent retry commits nothing.
    let committed = dispatcher
        .dispatch::<OrderCycle>(agg, "cycles.order_cycle", attach, make)
        .unwrap();
    assert!(committed.is_empty());

    let projection = OrderCyclesProjection::new(Arc::new(InMemoryReadModelStore::new()));
    drain(&sub, |env| projection.apply_envelope(env).unwrap());

    let rm = projection.get(&cycle_id).unwrap();
    assert_eq!(rm.exchanges.len(), 2);
    assert_eq!(rm.incoming_variant_union(), BTreeSet::from([variant]));
}

#[test]
fn projections_tolerate_replayed_envelopes() {
    let (dispatcher, store, _sub) = pipeline();
    let enterprise_id = register_enterprise(&dispatcher, "Solo");

    let projection = EnterpriseDirectoryProjection::new(Arc::new(InMemoryReadModelStore::new()));
    let stream = store.load_stream(enterprise_id.0).unwrap();

    // At-least-once delivery: apply every envelope twice.
    for stored in stream.iter().chain(stream.iter()) {
        projection.apply_envelope(&stored.to_envelope()).unwrap();
    }

    assert_eq!(projection.list().len(), 1);
    assert_eq!(projection.get(&enterprise_id).unwrap().name, "Solo");
}

#[test]
fn schedule_mismatch_surfaces_through_the_dispatcher() {
    let (dispatcher, _store, _sub) = pipeline();

    let shop = register_enterprise(&dispatcher, "Shop");
    let member_cycle = OrderCycleId::new(AggregateId::new());

    let agg = AggregateId::new();
    let subscription_id = SubscriptionId::new(agg);
    let make = |id: AggregateId| StandingOrder::empty(SubscriptionId::new(id));

    dispatcher
        .dispatch::<StandingOrder>(
            agg,
            "subscriptions.subscription",
            SubscriptionCommand::CreateSubscription(CreateSubscription {
                subscription_id,
                shop,
                customer: CustomerId::new(AggregateId::new()),
                schedule_id: ScheduleId::new(AggregateId::new()),
                schedule_cycles: vec![member_cycle],
                begins_at: Utc::now(),
                ends_at: None,
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

    let err = dispatcher
        .dispatch::<StandingOrder>(
            agg,
            "subscriptions.subscription",
            SubscriptionCommand::GenerateProxyOrder(GenerateProxyOrder {
                subscription_id,
                proxy_order_id: ProxyOrderId::new(AggregateId::new()),
                order_cycle_id: OrderCycleId::new(AggregateId::new()),
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap_err();

    match err {
        DispatchError::InvariantViolation(msg) => {
            assert_eq!(msg, "order cycle is not part of the subscription's schedule");
        }
        other => panic!("expected invariant violation, got {other:?}"),
    }
}
