use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use foodflow_catalog::VariantId;
use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Entity};
use foodflow_enterprises::{EnterpriseId, FeeId};
use foodflow_events::Event;

use crate::window::OrderWindow;

/// Order cycle identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCycleId(pub AggregateId);

impl OrderCycleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderCycleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Exchange identifier (scoped to one order cycle).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(pub AggregateId);

impl ExchangeId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Errors specific to the exchange network.
///
/// Generic failures (not found, duplicates, bad names) flow through
/// [`DomainError`]; the variants here are the failure kinds callers
/// distinguish.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CycleError {
    /// An exchange was requested against a cycle that has no coordinator
    /// (i.e. the cycle was never created).
    #[error("order cycle has no coordinator")]
    MissingCoordinator,

    /// An exchange's direction contradicts its endpoints relative to the
    /// coordinator.
    #[error("exchange direction contradicts the coordinator: {0}")]
    InvalidDirection(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<CycleError> for DomainError {
    fn from(value: CycleError) -> Self {
        match value {
            CycleError::MissingCoordinator => {
                DomainError::invariant("order cycle has no coordinator")
            }
            CycleError::InvalidDirection(msg) => DomainError::invariant(format!(
                "exchange direction contradicts the coordinator: {msg}"
            )),
            CycleError::Domain(e) => e,
        }
    }
}

/// Direction-specific metadata carried by an exchange.
///
/// Incoming goods need receival instructions at the coordinator's dock;
/// outgoing goods need a pickup slot at the distributor. The enum makes the
/// wrong combination unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeDetail {
    Incoming {
        receival_instructions: String,
    },
    Outgoing {
        pickup_time: String,
        pickup_instructions: String,
    },
}

/// A directed goods-flow edge between an enterprise and the coordinator.
///
/// Lives inside its order cycle; has no independent lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    exchange_id: ExchangeId,
    sender: EnterpriseId,
    receiver: EnterpriseId,
    detail: ExchangeDetail,
    variants: BTreeSet<VariantId>,
    fees: Vec<FeeId>,
}

impl Exchange {
    pub fn exchange_id(&self) -> ExchangeId {
        self.exchange_id
    }

    pub fn sender(&self) -> EnterpriseId {
        self.sender
    }

    pub fn receiver(&self) -> EnterpriseId {
        self.receiver
    }

    pub fn detail(&self) -> &ExchangeDetail {
        &self.detail
    }

    pub fn incoming(&self) -> bool {
        matches!(self.detail, ExchangeDetail::Incoming { .. })
    }

    /// Variants flowing through this edge (deduplicated, stable order).
    pub fn variants(&self) -> &BTreeSet<VariantId> {
        &self.variants
    }

    /// Attached fees in insertion order (the fee-application sequence).
    pub fn fees(&self) -> &[FeeId] {
        &self.fees
    }
}

impl Entity for Exchange {
    type Id = ExchangeId;

    fn id(&self) -> &Self::Id {
        &self.exchange_id
    }
}

/// Aggregate root: OrderCycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCycle {
    id: OrderCycleId,
    name: String,
    coordinator: Option<EnterpriseId>,
    window: OrderWindow,
    exchanges: Vec<Exchange>,
    version: u64,
    created: bool,
}

impl OrderCycle {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderCycleId) -> Self {
        Self {
            id,
            name: String::new(),
            coordinator: None,
            window: OrderWindow::undated(),
            exchanges: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderCycleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinator(&self) -> Option<EnterpriseId> {
        self.coordinator
    }

    pub fn window(&self) -> &OrderWindow {
        &self.window
    }

    /// All exchanges in insertion order.
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn exchange(&self, exchange_id: ExchangeId) -> Option<&Exchange> {
        self.exchanges.iter().find(|ex| ex.exchange_id == exchange_id)
    }

    pub fn incoming_exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().filter(|ex| ex.incoming())
    }

    pub fn outgoing_exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().filter(|ex| !ex.incoming())
    }

    /// Enterprises supplying into this cycle.
    pub fn suppliers(&self) -> BTreeSet<EnterpriseId> {
        self.incoming_exchanges().map(Exchange::sender).collect()
    }

    /// Enterprises distributing out of this cycle.
    pub fn distributors(&self) -> BTreeSet<EnterpriseId> {
        self.outgoing_exchanges().map(Exchange::receiver).collect()
    }

    /// Union of variants present on all incoming exchanges.
    ///
    /// This is the pool an outgoing exchange may draw from. Outgoing
    /// exchanges carry their own copies; populating them from this union is
    /// the caller's move, not a derived view.
    pub fn incoming_variant_union(&self) -> BTreeSet<VariantId> {
        self.incoming_exchanges()
            .flat_map(|ex| ex.variants.iter().copied())
            .collect()
    }

    /// Variants an outgoing exchange is permitted to carry.
    pub fn variants_available_to(
        &self,
        exchange_id: ExchangeId,
    ) -> Result<BTreeSet<VariantId>, CycleError> {
        let exchange = self
            .exchange(exchange_id)
            .ok_or(CycleError::Domain(DomainError::NotFound))?;

        if exchange.incoming() {
            return Err(CycleError::InvalidDirection(
                "available variants apply to outgoing exchanges".to_string(),
            ));
        }

        Ok(self.incoming_variant_union())
    }
}

impl AggregateRoot for OrderCycle {
    type Id = OrderCycleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrderCycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderCycle {
    pub cycle_id: OrderCycleId,
    pub name: String,
    pub coordinator: EnterpriseId,
    pub orders_open_at: Option<DateTime<Utc>>,
    pub orders_close_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddIncomingExchange (supplier → coordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddIncomingExchange {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub supplier: EnterpriseId,
    pub receival_instructions: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddOutgoingExchange (coordinator → distributor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutgoingExchange {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub distributor: EnterpriseId,
    pub pickup_time: String,
    pub pickup_instructions: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachExchangeVariant (idempotent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachExchangeVariant {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub variant_id: VariantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachExchangeFee (idempotent, insertion-ordered).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachExchangeFee {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub fee_id: FeeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCycleCommand {
    CreateOrderCycle(CreateOrderCycle),
    AddIncomingExchange(AddIncomingExchange),
    AddOutgoingExchange(AddOutgoingExchange),
    AttachExchangeVariant(AttachExchangeVariant),
    AttachExchangeFee(AttachExchangeFee),
}

/// Event: OrderCycleCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCycleCreated {
    pub cycle_id: OrderCycleId,
    pub name: String,
    pub coordinator: EnterpriseId,
    pub orders_open_at: Option<DateTime<Utc>>,
    pub orders_close_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: IncomingExchangeAdded.
///
/// Carries both endpoints explicitly; `receiver` is the coordinator at the
/// time the exchange was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingExchangeAdded {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub sender: EnterpriseId,
    pub receiver: EnterpriseId,
    pub receival_instructions: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OutgoingExchangeAdded.
///
/// Carries both endpoints explicitly; `sender` is the coordinator at the
/// time the exchange was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingExchangeAdded {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub sender: EnterpriseId,
    pub receiver: EnterpriseId,
    pub pickup_time: String,
    pub pickup_instructions: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExchangeVariantAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeVariantAttached {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub variant_id: VariantId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExchangeFeeAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFeeAttached {
    pub cycle_id: OrderCycleId,
    pub exchange_id: ExchangeId,
    pub fee_id: FeeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCycleEvent {
    OrderCycleCreated(OrderCycleCreated),
    IncomingExchangeAdded(IncomingExchangeAdded),
    OutgoingExchangeAdded(OutgoingExchangeAdded),
    ExchangeVariantAttached(ExchangeVariantAttached),
    ExchangeFeeAttached(ExchangeFeeAttached),
}

impl Event for OrderCycleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderCycleEvent::OrderCycleCreated(_) => "cycles.order_cycle.created",
            OrderCycleEvent::IncomingExchangeAdded(_) => "cycles.order_cycle.incoming_exchange_added",
            OrderCycleEvent::OutgoingExchangeAdded(_) => "cycles.order_cycle.outgoing_exchange_added",
            OrderCycleEvent::ExchangeVariantAttached(_) => "cycles.order_cycle.variant_attached",
            OrderCycleEvent::ExchangeFeeAttached(_) => "cycles.order_cycle.fee_attached",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderCycleEvent::OrderCycleCreated(e) => e.occurred_at,
            OrderCycleEvent::IncomingExchangeAdded(e) => e.occurred_at,
            OrderCycleEvent::OutgoingExchangeAdded(e) => e.occurred_at,
            OrderCycleEvent::ExchangeVariantAttached(e) => e.occurred_at,
            OrderCycleEvent::ExchangeFeeAttached(e) => e.occurred_at,
        }
    }
}

impl Aggregate for OrderCycle {
    type Command = OrderCycleCommand;
    type Event = OrderCycleEvent;
    type Error = CycleError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderCycleEvent::OrderCycleCreated(e) => {
                self.id = e.cycle_id;
                self.name = e.name.clone();
                self.coordinator = Some(e.coordinator);
                self.window = OrderWindow::new(e.orders_open_at, e.orders_close_at);
                self.exchanges.clear();
                self.created = true;
            }
            OrderCycleEvent::IncomingExchangeAdded(e) => {
                self.exchanges.push(Exchange {
                    exchange_id: e.exchange_id,
                    sender: e.sender,
                    receiver: e.receiver,
                    detail: ExchangeDetail::Incoming {
                        receival_instructions: e.receival_instructions.clone(),
                    },
                    variants: BTreeSet::new(),
                    fees: Vec::new(),
                });
            }
            OrderCycleEvent::OutgoingExchangeAdded(e) => {
                self.exchanges.push(Exchange {
                    exchange_id: e.exchange_id,
                    sender: e.sender,
                    receiver: e.receiver,
                    detail: ExchangeDetail::Outgoing {
                        pickup_time: e.pickup_time.clone(),
                        pickup_instructions: e.pickup_instructions.clone(),
                    },
                    variants: BTreeSet::new(),
                    fees: Vec::new(),
                });
            }
            OrderCycleEvent::ExchangeVariantAttached(e) => {
                if let Some(ex) = self
                    .exchanges
                    .iter_mut()
                    .find(|ex| ex.exchange_id == e.exchange_id)
                {
                    ex.variants.insert(e.variant_id);
                }
            }
            OrderCycleEvent::ExchangeFeeAttached(e) => {
                if let Some(ex) = self
                    .exchanges
                    .iter_mut()
                    .find(|ex| ex.exchange_id == e.exchange_id)
                {
                    if !ex.fees.contains(&e.fee_id) {
                        ex.fees.push(e.fee_id);
                    }
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCycleCommand::CreateOrderCycle(cmd) => self.handle_create(cmd),
            OrderCycleCommand::AddIncomingExchange(cmd) => self.handle_add_incoming(cmd),
            OrderCycleCommand::AddOutgoingExchange(cmd) => self.handle_add_outgoing(cmd),
            OrderCycleCommand::AttachExchangeVariant(cmd) => self.handle_attach_variant(cmd),
            OrderCycleCommand::AttachExchangeFee(cmd) => self.handle_attach_fee(cmd),
        }
    }
}

impl OrderCycle {
    fn ensure_cycle_id(&self, cycle_id: OrderCycleId) -> Result<(), CycleError> {
        if self.id != cycle_id {
            return Err(CycleError::Domain(DomainError::invariant("cycle_id mismatch")));
        }
        Ok(())
    }

    /// The coordinator, or `MissingCoordinator` for a cycle that was never
    /// created.
    fn require_coordinator(&self) -> Result<EnterpriseId, CycleError> {
        self.coordinator.ok_or(CycleError::MissingCoordinator)
    }

    fn require_exchange(&self, exchange_id: ExchangeId) -> Result<&Exchange, CycleError> {
        self.exchange(exchange_id)
            .ok_or(CycleError::Domain(DomainError::NotFound))
    }

    fn handle_create(&self, cmd: &CreateOrderCycle) -> Result<Vec<OrderCycleEvent>, CycleError> {
        if self.created {
            return Err(CycleError::Domain(DomainError::conflict(
                "order cycle already exists",
            )));
        }

        if cmd.name.trim().is_empty() {
            return Err(CycleError::Domain(DomainError::validation("name cannot be empty")));
        }

        if let (Some(opens), Some(closes)) = (cmd.orders_open_at, cmd.orders_close_at) {
            if closes <= opens {
                return Err(CycleError::Domain(DomainError::validation(
                    "orders_close_at must be after orders_open_at",
                )));
            }
        }

        Ok(vec![OrderCycleEvent::OrderCycleCreated(OrderCycleCreated {
            cycle_id: cmd.cycle_id,
            name: cmd.name.clone(),
            coordinator: cmd.coordinator,
            orders_open_at: cmd.orders_open_at,
            orders_close_at: cmd.orders_close_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_incoming(
        &self,
        cmd: &AddIncomingExchange,
    ) -> Result<Vec<OrderCycleEvent>, CycleError> {
        let coordinator = self.require_coordinator()?;
        self.ensure_cycle_id(cmd.cycle_id)?;

        if cmd.supplier == coordinator {
            return Err(CycleError::InvalidDirection(
                "incoming exchange must be sent by a supplier, not the coordinator".to_string(),
            ));
        }

        if self.exchange(cmd.exchange_id).is_some() {
            return Err(CycleError::Domain(DomainError::conflict("exchange already exists")));
        }

        Ok(vec![OrderCycleEvent::IncomingExchangeAdded(IncomingExchangeAdded {
            cycle_id: cmd.cycle_id,
            exchange_id: cmd.exchange_id,
            sender: cmd.supplier,
            receiver: coordinator,
            receival_instructions: cmd.receival_instructions.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_outgoing(
        &self,
        cmd: &AddOutgoingExchange,
    ) -> Result<Vec<OrderCycleEvent>, CycleError> {
        let coordinator = self.require_coordinator()?;
        self.ensure_cycle_id(cmd.cycle_id)?;

        if cmd.distributor == coordinator {
            return Err(CycleError::InvalidDirection(
                "outgoing exchange must be received by a distributor, not the coordinator"
                    .to_string(),
            ));
        }

        if self.exchange(cmd.exchange_id).is_some() {
            return Err(CycleError::Domain(DomainError::conflict("exchange already exists")));
        }

        Ok(vec![OrderCycleEvent::OutgoingExchangeAdded(OutgoingExchangeAdded {
            cycle_id: cmd.cycle_id,
            exchange_id: cmd.exchange_id,
            sender: coordinator,
            receiver: cmd.distributor,
            pickup_time: cmd.pickup_time.clone(),
            pickup_instructions: cmd.pickup_instructions.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_variant(
        &self,
        cmd: &AttachExchangeVariant,
    ) -> Result<Vec<OrderCycleEvent>, CycleError> {
        self.require_coordinator()?;
        self.ensure_cycle_id(cmd.cycle_id)?;
        let exchange = self.require_exchange(cmd.exchange_id)?;

        // Idempotent: re-attaching is a no-op, not an error.
        if exchange.variants.contains(&cmd.variant_id) {
            return Ok(vec![]);
        }

        Ok(vec![OrderCycleEvent::ExchangeVariantAttached(ExchangeVariantAttached {
            cycle_id: cmd.cycle_id,
            exchange_id: cmd.exchange_id,
            variant_id: cmd.variant_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_fee(
        &self,
        cmd: &AttachExchangeFee,
    ) -> Result<Vec<OrderCycleEvent>, CycleError> {
        self.require_coordinator()?;
        self.ensure_cycle_id(cmd.cycle_id)?;
        let exchange = self.require_exchange(cmd.exchange_id)?;

        // Idempotent: re-attaching is a no-op, not an error.
        if exchange.fees.contains(&cmd.fee_id) {
            return Ok(vec![]);
        }

        Ok(vec![OrderCycleEvent::ExchangeFeeAttached(ExchangeFeeAttached {
            cycle_id: cmd.cycle_id,
            exchange_id: cmd.exchange_id,
            fee_id: cmd.fee_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodflow_events::execute;

    fn test_cycle_id() -> OrderCycleId {
        OrderCycleId::new(AggregateId::new())
    }

    fn test_enterprise() -> EnterpriseId {
        EnterpriseId::new(AggregateId::new())
    }

    fn test_variant() -> VariantId {
        VariantId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Explicit builder: a created, undated cycle for the given coordinator.
    fn created_cycle(cycle_id: OrderCycleId, coordinator: EnterpriseId) -> OrderCycle {
        let mut cycle = OrderCycle::empty(cycle_id);
        execute(
            &mut cycle,
            &OrderCycleCommand::CreateOrderCycle(CreateOrderCycle {
                cycle_id,
                name: "Weekly cycle".to_string(),
                coordinator,
                orders_open_at: None,
                orders_close_at: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        cycle
    }

    /// Explicit builder: add one incoming exchange carrying the given variants.
    fn add_incoming_with_variants(
        cycle: &mut OrderCycle,
        supplier: EnterpriseId,
        variants: &[VariantId],
    ) -> ExchangeId {
        let exchange_id = ExchangeId::new(AggregateId::new());
        let cycle_id = cycle.id_typed();
        execute(
            cycle,
            &OrderCycleCommand::AddIncomingExchange(AddIncomingExchange {
                cycle_id,
                exchange_id,
                supplier,
                receival_instructions: "instructions".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        for v in variants {
            execute(
                cycle,
                &OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                    cycle_id,
                    exchange_id,
                    variant_id: *v,
                    occurred_at: test_time(),
                }),
            )
            .unwrap();
        }
        exchange_id
    }

    /// Explicit builder: add one outgoing exchange for the given distributor.
    fn add_outgoing(cycle: &mut OrderCycle, distributor: EnterpriseId) -> ExchangeId {
        let exchange_id = ExchangeId::new(AggregateId::new());
        let cycle_id = cycle.id_typed();
        execute(
            cycle,
            &OrderCycleCommand::AddOutgoingExchange(AddOutgoingExchange {
                cycle_id,
                exchange_id,
                distributor,
                pickup_time: "time".to_string(),
                pickup_instructions: "instructions".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        exchange_id
    }

    #[test]
    fn create_rejects_inverted_window() {
        let cycle_id = test_cycle_id();
        let cycle = OrderCycle::empty(cycle_id);
        let now = test_time();

        let err = cycle
            .handle(&OrderCycleCommand::CreateOrderCycle(CreateOrderCycle {
                cycle_id,
                name: "Bad window".to_string(),
                coordinator: test_enterprise(),
                orders_open_at: Some(now),
                orders_close_at: Some(now - chrono::Duration::hours(1)),
                occurred_at: now,
            }))
            .unwrap_err();
        assert!(matches!(err, CycleError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn exchange_before_creation_is_missing_coordinator() {
        let cycle_id = test_cycle_id();
        let cycle = OrderCycle::empty(cycle_id);

        let err = cycle
            .handle(&OrderCycleCommand::AddIncomingExchange(AddIncomingExchange {
                cycle_id,
                exchange_id: ExchangeId::new(AggregateId::new()),
                supplier: test_enterprise(),
                receival_instructions: "instructions".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, CycleError::MissingCoordinator);
    }

    #[test]
    fn incoming_exchange_points_at_coordinator() {
        let coordinator = test_enterprise();
        let supplier = test_enterprise();
        let mut cycle = created_cycle(test_cycle_id(), coordinator);

        let exchange_id = add_incoming_with_variants(&mut cycle, supplier, &[]);
        let exchange = cycle.exchange(exchange_id).unwrap();

        assert!(exchange.incoming());
        assert_eq!(exchange.sender(), supplier);
        assert_eq!(exchange.receiver(), coordinator);
        assert!(matches!(
            exchange.detail(),
            ExchangeDetail::Incoming { receival_instructions } if receival_instructions == "instructions"
        ));
    }

    #[test]
    fn outgoing_exchange_starts_at_coordinator() {
        let coordinator = test_enterprise();
        let distributor = test_enterprise();
        let mut cycle = created_cycle(test_cycle_id(), coordinator);

        let exchange_id = add_outgoing(&mut cycle, distributor);
        let exchange = cycle.exchange(exchange_id).unwrap();

        assert!(!exchange.incoming());
        assert_eq!(exchange.sender(), coordinator);
        assert_eq!(exchange.receiver(), distributor);
    }

    #[test]
    fn coordinator_cannot_sit_on_both_ends() {
        let coordinator = test_enterprise();
        let cycle = created_cycle(test_cycle_id(), coordinator);
        let cycle_id = cycle.id_typed();

        let err = cycle
            .handle(&OrderCycleCommand::AddIncomingExchange(AddIncomingExchange {
                cycle_id,
                exchange_id: ExchangeId::new(AggregateId::new()),
                supplier: coordinator,
                receival_instructions: "instructions".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, CycleError::InvalidDirection(_)));

        let err = cycle
            .handle(&OrderCycleCommand::AddOutgoingExchange(AddOutgoingExchange {
                cycle_id,
                exchange_id: ExchangeId::new(AggregateId::new()),
                distributor: coordinator,
                pickup_time: "time".to_string(),
                pickup_instructions: "instructions".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, CycleError::InvalidDirection(_)));
    }

    #[test]
    fn attach_variant_is_idempotent() {
        let mut cycle = created_cycle(test_cycle_id(), test_enterprise());
        let exchange_id = add_incoming_with_variants(&mut cycle, test_enterprise(), &[]);
        let cycle_id = cycle.id_typed();
        let variant = test_variant();

        let cmd = OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
            cycle_id,
            exchange_id,
            variant_id: variant,
            occurred_at: test_time(),
        });

        let events = execute(&mut cycle, &cmd).unwrap();
        assert_eq!(events.len(), 1);

        // Second attach of the same variant is a no-op, not an error.
        let events = execute(&mut cycle, &cmd).unwrap();
        assert!(events.is_empty());
        assert_eq!(cycle.exchange(exchange_id).unwrap().variants().len(), 1);
    }

    #[test]
    fn attach_fee_keeps_insertion_order_and_is_idempotent() {
        let mut cycle = created_cycle(test_cycle_id(), test_enterprise());
        let exchange_id = add_incoming_with_variants(&mut cycle, test_enterprise(), &[]);
        let cycle_id = cycle.id_typed();

        let packing = FeeId::new(AggregateId::new());
        let transport = FeeId::new(AggregateId::new());

        for fee_id in [packing, transport, packing] {
            execute(
                &mut cycle,
                &OrderCycleCommand::AttachExchangeFee(AttachExchangeFee {
                    cycle_id,
                    exchange_id,
                    fee_id,
                    occurred_at: test_time(),
                }),
            )
            .unwrap();
        }

        assert_eq!(cycle.exchange(exchange_id).unwrap().fees(), &[packing, transport]);
    }

    #[test]
    fn attach_to_unknown_exchange_is_not_found() {
        let cycle = created_cycle(test_cycle_id(), test_enterprise());

        let err = cycle
            .handle(&OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                cycle_id: cycle.id_typed(),
                exchange_id: ExchangeId::new(AggregateId::new()),
                variant_id: test_variant(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, CycleError::Domain(DomainError::NotFound));
    }

    #[test]
    fn outgoing_exchanges_copied_from_union_carry_v1_union_v2() {
        let coordinator = test_enterprise();
        let mut cycle = created_cycle(test_cycle_id(), coordinator);

        let v1: Vec<VariantId> = (0..2).map(|_| test_variant()).collect();
        let v2: Vec<VariantId> = (0..3).map(|_| test_variant()).collect();
        add_incoming_with_variants(&mut cycle, test_enterprise(), &v1);
        add_incoming_with_variants(&mut cycle, test_enterprise(), &v2);

        let out1 = add_outgoing(&mut cycle, test_enterprise());
        let out2 = add_outgoing(&mut cycle, test_enterprise());

        // Populate outgoing exchanges from the incoming union (a copy, the
        // way admin setup does it).
        let union = cycle.incoming_variant_union();
        let cycle_id = cycle.id_typed();
        for exchange_id in [out1, out2] {
            for variant_id in &union {
                execute(
                    &mut cycle,
                    &OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                        cycle_id,
                        exchange_id,
                        variant_id: *variant_id,
                        occurred_at: test_time(),
                    }),
                )
                .unwrap();
            }
        }

        let expected: BTreeSet<VariantId> = v1.iter().chain(v2.iter()).copied().collect();
        assert_eq!(cycle.exchange(out1).unwrap().variants(), &expected);
        assert_eq!(cycle.exchange(out2).unwrap().variants(), &expected);
        assert_eq!(cycle.variants_available_to(out1).unwrap(), expected);
    }

    #[test]
    fn variants_available_to_rejects_incoming_exchange() {
        let mut cycle = created_cycle(test_cycle_id(), test_enterprise());
        let incoming = add_incoming_with_variants(&mut cycle, test_enterprise(), &[test_variant()]);

        let err = cycle.variants_available_to(incoming).unwrap_err();
        assert!(matches!(err, CycleError::InvalidDirection(_)));
    }

    #[test]
    fn suppliers_and_distributors_reflect_exchanges() {
        let coordinator = test_enterprise();
        let supplier = test_enterprise();
        let distributor = test_enterprise();
        let mut cycle = created_cycle(test_cycle_id(), coordinator);

        add_incoming_with_variants(&mut cycle, supplier, &[]);
        add_outgoing(&mut cycle, distributor);

        assert_eq!(cycle.suppliers(), BTreeSet::from([supplier]));
        assert_eq!(cycle.distributors(), BTreeSet::from([distributor]));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut cycle = created_cycle(test_cycle_id(), test_enterprise());
        add_incoming_with_variants(&mut cycle, test_enterprise(), &[test_variant()]);
        let before = cycle.clone();

        let _ = cycle
            .handle(&OrderCycleCommand::AddOutgoingExchange(AddOutgoingExchange {
                cycle_id: cycle.id_typed(),
                exchange_id: ExchangeId::new(AggregateId::new()),
                distributor: test_enterprise(),
                pickup_time: "time".to_string(),
                pickup_instructions: "instructions".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(cycle, before);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: an exchange's variant set is the dedup of whatever
            /// was attached, regardless of order and repetition.
            #[test]
            fn variant_set_collapses_duplicates(indices in proptest::collection::vec(0usize..8, 0..64)) {
                let pool: Vec<VariantId> = (0..8).map(|_| test_variant()).collect();
                let mut cycle = created_cycle(test_cycle_id(), test_enterprise());
                let exchange_id = add_incoming_with_variants(&mut cycle, test_enterprise(), &[]);
                let cycle_id = cycle.id_typed();

                for idx in &indices {
                    execute(
                        &mut cycle,
                        &OrderCycleCommand::AttachExchangeVariant(AttachExchangeVariant {
                            cycle_id,
                            exchange_id,
                            variant_id: pool[*idx],
                            occurred_at: test_time(),
                        }),
                    )
                    .unwrap();
                }

                let expected: BTreeSet<VariantId> = indices.iter().map(|i| pool[*i]).collect();
                prop_assert_eq!(cycle.exchange(exchange_id).unwrap().variants(), &expected);
            }
        }
    }
}
