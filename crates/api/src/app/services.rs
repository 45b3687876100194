use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use uuid::Uuid;

use foodflow_catalog::ProductId;
use foodflow_core::AggregateId;
use foodflow_cycles::OrderCycleId;
use foodflow_enterprises::EnterpriseId;
use foodflow_events::{EventBus, EventEnvelope, InMemoryEventBus};
use foodflow_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{InMemoryEventStore, StoredEvent},
    projections::{
        catalog::{ProductCatalogProjection, ProductReadModel},
        cycles::{OrderCycleReadModel, OrderCyclesProjection},
        enterprises::{EnterpriseDirectoryProjection, EnterpriseReadModel},
        inventory::{
            InventoryItemReadModel, InventoryItemsProjection, VariantOverrideReadModel,
            VariantOverridesProjection,
        },
        relationships::RelationshipsProjection,
        subscriptions::{
            ScheduleReadModel, SchedulesProjection, SubscriptionReadModel, SubscriptionsProjection,
        },
    },
    read_model::InMemoryReadModelStore,
};
use foodflow_inventory::{InventoryItemId, VariantOverrideId};
use foodflow_relationships::{RelationshipId, RelationshipRecord};
use foodflow_subscriptions::{ScheduleId, SubscriptionId};

#[cfg(feature = "postgres")]
use foodflow_infra::event_store::PostgresEventStore;
#[cfg(feature = "postgres")]
use sqlx::PgPool;

/// Well-known stream id for the relationship registry.
///
/// All relationship mutations go through this single stream so ordered-pair
/// uniqueness survives concurrent requests (see the registry aggregate docs).
/// Stable across restarts and deployments.
const RELATIONSHIP_REGISTRY_STREAM: Uuid = Uuid::from_u128(0x464f4f44_464c_4f57_8000_000000000001);

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

type SharedBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, SharedBus>;
#[cfg(feature = "postgres")]
type PersistentDispatcher = CommandDispatcher<Arc<PostgresEventStore>, SharedBus>;

enum Dispatcher {
    InMemory(Arc<InMemoryDispatcher>),
    #[cfg(feature = "postgres")]
    Persistent(Arc<PersistentDispatcher>),
}

type Rm<K, V> = Arc<InMemoryReadModelStore<K, V>>;

type EnterprisesProj = EnterpriseDirectoryProjection<Rm<EnterpriseId, EnterpriseReadModel>>;
type RelationshipsProj = RelationshipsProjection<Rm<RelationshipId, RelationshipRecord>>;
type CyclesProj = OrderCyclesProjection<Rm<OrderCycleId, OrderCycleReadModel>>;
type CatalogProj = ProductCatalogProjection<Rm<ProductId, ProductReadModel>>;
type SchedulesProj = SchedulesProjection<Rm<ScheduleId, ScheduleReadModel>>;
type SubscriptionsProj = SubscriptionsProjection<Rm<SubscriptionId, SubscriptionReadModel>>;
type OverridesProj = VariantOverridesProjection<Rm<VariantOverrideId, VariantOverrideReadModel>>;
type ItemsProj = InventoryItemsProjection<Rm<InventoryItemId, InventoryItemReadModel>>;

/// Application services shared by all route handlers.
pub struct AppServices {
    dispatcher: Dispatcher,
    pub enterprises: Arc<EnterprisesProj>,
    pub relationships: Arc<RelationshipsProj>,
    pub cycles: Arc<CyclesProj>,
    pub catalog: Arc<CatalogProj>,
    pub schedules: Arc<SchedulesProj>,
    pub subscriptions: Arc<SubscriptionsProj>,
    pub overrides: Arc<OverridesProj>,
    pub items: Arc<ItemsProj>,
    registry_stream: AggregateId,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        #[cfg(feature = "postgres")]
        {
            return build_persistent_services().await;
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
        }
    }

    build_in_memory_services()
}

struct Projections {
    enterprises: Arc<EnterprisesProj>,
    relationships: Arc<RelationshipsProj>,
    cycles: Arc<CyclesProj>,
    catalog: Arc<CatalogProj>,
    schedules: Arc<SchedulesProj>,
    subscriptions: Arc<SubscriptionsProj>,
    overrides: Arc<OverridesProj>,
    items: Arc<ItemsProj>,
}

fn build_projections() -> Projections {
    Projections {
        enterprises: Arc::new(EnterpriseDirectoryProjection::new(Arc::new(
            InMemoryReadModelStore::new(),
        ))),
        relationships: Arc::new(RelationshipsProjection::new(Arc::new(
            InMemoryReadModelStore::new(),
        ))),
        cycles: Arc::new(OrderCyclesProjection::new(Arc::new(InMemoryReadModelStore::new()))),
        catalog: Arc::new(ProductCatalogProjection::new(Arc::new(
            InMemoryReadModelStore::new(),
        ))),
        schedules: Arc::new(SchedulesProjection::new(Arc::new(InMemoryReadModelStore::new()))),
        subscriptions: Arc::new(SubscriptionsProjection::new(Arc::new(
            InMemoryReadModelStore::new(),
        ))),
        overrides: Arc::new(VariantOverridesProjection::new(Arc::new(
            InMemoryReadModelStore::new(),
        ))),
        items: Arc::new(InventoryItemsProjection::new(Arc::new(InMemoryReadModelStore::new()))),
    }
}

/// Background subscriber: bus → projections, with a realtime notification
/// per applied envelope.
fn spawn_projection_worker(
    bus: &SharedBus,
    projections: &Projections,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
) {
    let sub = bus.subscribe();
    let enterprises = projections.enterprises.clone();
    let relationships = projections.relationships.clone();
    let cycles = projections.cycles.clone();
    let catalog = projections.catalog.clone();
    let schedules = projections.schedules.clone();
    let subscriptions = projections.subscriptions.clone();
    let overrides = projections.overrides.clone();
    let items = projections.items.clone();

    tokio::task::spawn_blocking(move || {
        loop {
            match sub.recv() {
                Ok(env) => {
                    let at = env.aggregate_type().to_string();

                    let apply_ok = match at.as_str() {
                        "enterprises.enterprise" => {
                            enterprises.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "relationships.registry" => {
                            relationships.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "cycles.order_cycle" => cycles.apply_envelope(&env).map_err(|e| e.to_string()),
                        "catalog.product" => catalog.apply_envelope(&env).map_err(|e| e.to_string()),
                        "subscriptions.schedule" => {
                            schedules.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "subscriptions.subscription" => {
                            subscriptions.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "inventory.variant_override" => {
                            overrides.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "inventory.item" => items.apply_envelope(&env).map_err(|e| e.to_string()),
                        _ => Ok(()),
                    };

                    if let Err(e) = apply_ok {
                        tracing::warn!("projection apply failed: {e}");
                        continue;
                    }

                    // Lossy broadcast; no backpressure on the write path.
                    let _ = realtime_tx.send(RealtimeMessage {
                        topic: format!("{at}.projection_updated"),
                        payload: serde_json::json!({
                            "aggregate_type": at,
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });
                }
                Err(_) => break,
            }
        }
    });
}

fn build_in_memory_services() -> AppServices {
    // In-memory infra wiring (dev/test): store + bus + projections.
    let store = Arc::new(InMemoryEventStore::new());
    let bus: SharedBus = Arc::new(InMemoryEventBus::new());

    let projections = build_projections();
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    spawn_projection_worker(&bus, &projections, realtime_tx.clone());

    let dispatcher: Arc<InMemoryDispatcher> = Arc::new(CommandDispatcher::new(store, bus));

    AppServices {
        dispatcher: Dispatcher::InMemory(dispatcher),
        enterprises: projections.enterprises,
        relationships: projections.relationships,
        cycles: projections.cycles,
        catalog: projections.catalog,
        schedules: projections.schedules,
        subscriptions: projections.subscriptions,
        overrides: projections.overrides,
        items: projections.items,
        registry_stream: AggregateId::from_uuid(RELATIONSHIP_REGISTRY_STREAM),
        realtime_tx,
    }
}

#[cfg(feature = "postgres")]
async fn build_persistent_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    let store = Arc::new(PostgresEventStore::new(pool));
    let bus: SharedBus = Arc::new(InMemoryEventBus::new());

    let projections = build_projections();
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    spawn_projection_worker(&bus, &projections, realtime_tx.clone());

    let dispatcher: Arc<PersistentDispatcher> = Arc::new(CommandDispatcher::new(store, bus));

    AppServices {
        dispatcher: Dispatcher::Persistent(dispatcher),
        enterprises: projections.enterprises,
        relationships: projections.relationships,
        cycles: projections.cycles,
        catalog: projections.catalog,
        schedules: projections.schedules,
        subscriptions: projections.subscriptions,
        overrides: projections.overrides,
        items: projections.items,
        registry_stream: AggregateId::from_uuid(RELATIONSHIP_REGISTRY_STREAM),
        realtime_tx,
    }
}

impl AppServices {
    /// The relationship registry's well-known stream.
    pub fn registry_stream(&self) -> AggregateId {
        self.registry_stream
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: foodflow_core::Aggregate,
        A::Error: Into<foodflow_core::DomainError>,
        A::Event: foodflow_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        match &self.dispatcher {
            Dispatcher::InMemory(dispatcher) => {
                dispatcher.dispatch::<A>(aggregate_id, aggregate_type, command, make_aggregate)
            }
            #[cfg(feature = "postgres")]
            Dispatcher::Persistent(dispatcher) => {
                dispatcher.dispatch::<A>(aggregate_id, aggregate_type, command, make_aggregate)
            }
        }
    }

    /// Dispatch with a bounded retry on optimistic-concurrency losses.
    ///
    /// Re-dispatching reloads fresh state, so the retry either succeeds or
    /// fails on the domain rule the race was guarding (e.g. the duplicate
    /// relationship error). Commands must be idempotent or conflict-checked,
    /// which all registry commands are.
    pub fn dispatch_with_retry<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: foodflow_core::Aggregate,
        A::Error: Into<foodflow_core::DomainError>,
        A::Event: foodflow_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        const MAX_ATTEMPTS: u32 = 3;

        let mut attempt = 1;
        loop {
            match self.dispatch::<A>(aggregate_id, aggregate_type, command.clone(), &make_aggregate)
            {
                Err(DispatchError::Concurrency(msg)) if attempt < MAX_ATTEMPTS => {
                    tracing::debug!("append race on {aggregate_type} (attempt {attempt}): {msg}");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Build an SSE stream of realtime messages (used by `/stream`).
pub fn realtime_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
