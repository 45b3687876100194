use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodflow_catalog::VariantId;
use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use foodflow_enterprises::EnterpriseId;
use foodflow_events::Event;

/// Variant override identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantOverrideId(pub AggregateId);

impl VariantOverrideId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VariantOverrideId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Stock policy for an override.
///
/// One closed choice instead of two nullable columns: an on-demand override
/// cannot carry a count, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Defer to the producer's own stock settings.
    UseProducerStock,
    /// Made to order; no count tracked.
    OnDemand,
    /// Hub-held stock with an explicit count.
    Limited { count: u64 },
}

/// Aggregate root: VariantOverride, the per-(variant, hub) price/stock override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOverride {
    id: VariantOverrideId,
    variant: Option<VariantId>,
    hub: Option<EnterpriseId>,
    /// Price in smallest currency unit; `None` keeps the variant's price.
    price: Option<u64>,
    stock: StockPolicy,
    default_stock: Option<u64>,
    resettable: bool,
    version: u64,
    created: bool,
}

impl VariantOverride {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: VariantOverrideId) -> Self {
        Self {
            id,
            variant: None,
            hub: None,
            price: None,
            stock: StockPolicy::UseProducerStock,
            default_stock: None,
            resettable: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> VariantOverrideId {
        self.id
    }

    pub fn variant(&self) -> Option<VariantId> {
        self.variant
    }

    pub fn hub(&self) -> Option<EnterpriseId> {
        self.hub
    }

    pub fn price(&self) -> Option<u64> {
        self.price
    }

    pub fn stock(&self) -> StockPolicy {
        self.stock
    }

    pub fn default_stock(&self) -> Option<u64> {
        self.default_stock
    }

    pub fn resettable(&self) -> bool {
        self.resettable
    }

    /// The counted stock level, if this override tracks one.
    pub fn count_on_hand(&self) -> Option<u64> {
        match self.stock {
            StockPolicy::Limited { count } => Some(count),
            _ => None,
        }
    }
}

impl AggregateRoot for VariantOverride {
    type Id = VariantOverrideId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateVariantOverride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVariantOverride {
    pub override_id: VariantOverrideId,
    pub variant_id: VariantId,
    pub hub: EnterpriseId,
    pub price: Option<u64>,
    pub stock: StockPolicy,
    pub default_stock: Option<u64>,
    pub resettable: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetOverridePrice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOverridePrice {
    pub override_id: VariantOverrideId,
    pub price: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetStockPolicy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStockPolicy {
    pub override_id: VariantOverrideId,
    pub stock: StockPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordSale (decrement counted stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub override_id: VariantOverrideId,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResetStock (restore the default stock level, if configured).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetStock {
    pub override_id: VariantOverrideId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantOverrideCommand {
    CreateVariantOverride(CreateVariantOverride),
    SetOverridePrice(SetOverridePrice),
    SetStockPolicy(SetStockPolicy),
    RecordSale(RecordSale),
    ResetStock(ResetStock),
}

/// Event: VariantOverrideCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOverrideCreated {
    pub override_id: VariantOverrideId,
    pub variant_id: VariantId,
    pub hub: EnterpriseId,
    pub price: Option<u64>,
    pub stock: StockPolicy,
    pub default_stock: Option<u64>,
    pub resettable: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OverridePriceSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverridePriceSet {
    pub override_id: VariantOverrideId,
    pub price: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockPolicySet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPolicySet {
    pub override_id: VariantOverrideId,
    pub stock: StockPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReduced {
    pub override_id: VariantOverrideId,
    pub quantity: u64,
    pub remaining: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReset {
    pub override_id: VariantOverrideId,
    pub count: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantOverrideEvent {
    VariantOverrideCreated(VariantOverrideCreated),
    OverridePriceSet(OverridePriceSet),
    StockPolicySet(StockPolicySet),
    StockReduced(StockReduced),
    StockReset(StockReset),
}

impl Event for VariantOverrideEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VariantOverrideEvent::VariantOverrideCreated(_) => "inventory.variant_override.created",
            VariantOverrideEvent::OverridePriceSet(_) => "inventory.variant_override.price_set",
            VariantOverrideEvent::StockPolicySet(_) => "inventory.variant_override.stock_policy_set",
            VariantOverrideEvent::StockReduced(_) => "inventory.variant_override.stock_reduced",
            VariantOverrideEvent::StockReset(_) => "inventory.variant_override.stock_reset",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VariantOverrideEvent::VariantOverrideCreated(e) => e.occurred_at,
            VariantOverrideEvent::OverridePriceSet(e) => e.occurred_at,
            VariantOverrideEvent::StockPolicySet(e) => e.occurred_at,
            VariantOverrideEvent::StockReduced(e) => e.occurred_at,
            VariantOverrideEvent::StockReset(e) => e.occurred_at,
        }
    }
}

impl Aggregate for VariantOverride {
    type Command = VariantOverrideCommand;
    type Event = VariantOverrideEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VariantOverrideEvent::VariantOverrideCreated(e) => {
                self.id = e.override_id;
                self.variant = Some(e.variant_id);
                self.hub = Some(e.hub);
                self.price = e.price;
                self.stock = e.stock;
                self.default_stock = e.default_stock;
                self.resettable = e.resettable;
                self.created = true;
            }
            VariantOverrideEvent::OverridePriceSet(e) => {
                self.price = e.price;
            }
            VariantOverrideEvent::StockPolicySet(e) => {
                self.stock = e.stock;
            }
            VariantOverrideEvent::StockReduced(e) => {
                self.stock = StockPolicy::Limited { count: e.remaining };
            }
            VariantOverrideEvent::StockReset(e) => {
                self.stock = StockPolicy::Limited { count: e.count };
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VariantOverrideCommand::CreateVariantOverride(cmd) => self.handle_create(cmd),
            VariantOverrideCommand::SetOverridePrice(cmd) => self.handle_set_price(cmd),
            VariantOverrideCommand::SetStockPolicy(cmd) => self.handle_set_stock(cmd),
            VariantOverrideCommand::RecordSale(cmd) => self.handle_record_sale(cmd),
            VariantOverrideCommand::ResetStock(cmd) => self.handle_reset(cmd),
        }
    }
}

impl VariantOverride {
    fn ensure_override_id(&self, override_id: VariantOverrideId) -> Result<(), DomainError> {
        if self.id != override_id {
            return Err(DomainError::invariant("override_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateVariantOverride) -> Result<Vec<VariantOverrideEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("variant override already exists"));
        }

        if cmd.resettable && cmd.default_stock.is_none() {
            return Err(DomainError::validation(
                "resettable override requires default_stock",
            ));
        }

        Ok(vec![VariantOverrideEvent::VariantOverrideCreated(VariantOverrideCreated {
            override_id: cmd.override_id,
            variant_id: cmd.variant_id,
            hub: cmd.hub,
            price: cmd.price,
            stock: cmd.stock,
            default_stock: cmd.default_stock,
            resettable: cmd.resettable,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_price(&self, cmd: &SetOverridePrice) -> Result<Vec<VariantOverrideEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_override_id(cmd.override_id)?;

        if self.price == cmd.price {
            return Ok(vec![]);
        }

        Ok(vec![VariantOverrideEvent::OverridePriceSet(OverridePriceSet {
            override_id: cmd.override_id,
            price: cmd.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_stock(&self, cmd: &SetStockPolicy) -> Result<Vec<VariantOverrideEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_override_id(cmd.override_id)?;

        if self.stock == cmd.stock {
            return Ok(vec![]);
        }

        Ok(vec![VariantOverrideEvent::StockPolicySet(StockPolicySet {
            override_id: cmd.override_id,
            stock: cmd.stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_sale(&self, cmd: &RecordSale) -> Result<Vec<VariantOverrideEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_override_id(cmd.override_id)?;

        if cmd.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        match self.stock {
            // Nothing to count down for on-demand or pass-through stock.
            StockPolicy::OnDemand | StockPolicy::UseProducerStock => Ok(vec![]),
            StockPolicy::Limited { count } => {
                let remaining = count.checked_sub(cmd.quantity).ok_or_else(|| {
                    DomainError::validation(format!(
                        "insufficient stock: {} on hand, {} requested",
                        count, cmd.quantity
                    ))
                })?;

                Ok(vec![VariantOverrideEvent::StockReduced(StockReduced {
                    override_id: cmd.override_id,
                    quantity: cmd.quantity,
                    remaining,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }

    fn handle_reset(&self, cmd: &ResetStock) -> Result<Vec<VariantOverrideEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_override_id(cmd.override_id)?;

        // Reset is a no-op (not an error) when the override opted out.
        let (true, Some(count)) = (self.resettable, self.default_stock) else {
            return Ok(vec![]);
        };

        if self.stock == (StockPolicy::Limited { count }) {
            return Ok(vec![]);
        }

        Ok(vec![VariantOverrideEvent::StockReset(StockReset {
            override_id: cmd.override_id,
            count,
            occurred_at: cmd.occurred_at,
        })])
    }
}
