use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodflow_catalog::VariantId;
use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use foodflow_enterprises::EnterpriseId;
use foodflow_events::Event;

/// Inventory item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryItemId(pub AggregateId);

impl InventoryItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: InventoryItem, whether a variant is listed in an
/// enterprise's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    id: InventoryItemId,
    enterprise: Option<EnterpriseId>,
    variant: Option<VariantId>,
    visible: bool,
    version: u64,
    created: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            enterprise: None,
            variant: None,
            visible: true,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn enterprise(&self) -> Option<EnterpriseId> {
        self.enterprise
    }

    pub fn variant(&self) -> Option<VariantId> {
        self.variant
    }

    pub fn visible(&self) -> bool {
        self.visible
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInventoryItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInventoryItem {
    pub item_id: InventoryItemId,
    pub enterprise: EnterpriseId,
    pub variant_id: VariantId,
    pub visible: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetVisibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVisibility {
    pub item_id: InventoryItemId,
    pub visible: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryItemCommand {
    CreateInventoryItem(CreateInventoryItem),
    SetVisibility(SetVisibility),
}

/// Event: InventoryItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItemCreated {
    pub item_id: InventoryItemId,
    pub enterprise: EnterpriseId,
    pub variant_id: VariantId,
    pub visible: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InventoryItemVisibilityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItemVisibilityChanged {
    pub item_id: InventoryItemId,
    pub visible: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryItemEvent {
    InventoryItemCreated(InventoryItemCreated),
    InventoryItemVisibilityChanged(InventoryItemVisibilityChanged),
}

impl Event for InventoryItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryItemEvent::InventoryItemCreated(_) => "inventory.item.created",
            InventoryItemEvent::InventoryItemVisibilityChanged(_) => {
                "inventory.item.visibility_changed"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryItemEvent::InventoryItemCreated(e) => e.occurred_at,
            InventoryItemEvent::InventoryItemVisibilityChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryItemCommand;
    type Event = InventoryItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryItemEvent::InventoryItemCreated(e) => {
                self.id = e.item_id;
                self.enterprise = Some(e.enterprise);
                self.variant = Some(e.variant_id);
                self.visible = e.visible;
                self.created = true;
            }
            InventoryItemEvent::InventoryItemVisibilityChanged(e) => {
                self.visible = e.visible;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryItemCommand::CreateInventoryItem(cmd) => self.handle_create(cmd),
            InventoryItemCommand::SetVisibility(cmd) => self.handle_set_visibility(cmd),
        }
    }
}

impl InventoryItem {
    fn handle_create(&self, cmd: &CreateInventoryItem) -> Result<Vec<InventoryItemEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("inventory item already exists"));
        }

        Ok(vec![InventoryItemEvent::InventoryItemCreated(InventoryItemCreated {
            item_id: cmd.item_id,
            enterprise: cmd.enterprise,
            variant_id: cmd.variant_id,
            visible: cmd.visible,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_visibility(&self, cmd: &SetVisibility) -> Result<Vec<InventoryItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != cmd.item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }

        if self.visible == cmd.visible {
            return Ok(vec![]);
        }

        Ok(vec![InventoryItemEvent::InventoryItemVisibilityChanged(
            InventoryItemVisibilityChanged {
                item_id: cmd.item_id,
                visible: cmd.visible,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodflow_events::execute;

    fn test_item_id() -> InventoryItemId {
        InventoryItemId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Explicit builder: a created, visible inventory item.
    fn created_item(id: InventoryItemId) -> InventoryItem {
        let mut item = InventoryItem::empty(id);
        execute(
            &mut item,
            &InventoryItemCommand::CreateInventoryItem(CreateInventoryItem {
                item_id: id,
                enterprise: EnterpriseId::new(AggregateId::new()),
                variant_id: VariantId::new(AggregateId::new()),
                visible: true,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        item
    }

    #[test]
    fn visibility_toggles_and_identical_value_is_a_no_op() {
        let id = test_item_id();
        let mut item = created_item(id);

        let events = execute(
            &mut item,
            &InventoryItemCommand::SetVisibility(SetVisibility {
                item_id: id,
                visible: true,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert!(events.is_empty());

        execute(
            &mut item,
            &InventoryItemCommand::SetVisibility(SetVisibility {
                item_id: id,
                visible: false,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert!(!item.visible());
    }

    #[test]
    fn set_visibility_requires_existing_item() {
        let id = test_item_id();
        let item = InventoryItem::empty(id);

        let err = item
            .handle(&InventoryItemCommand::SetVisibility(SetVisibility {
                item_id: id,
                visible: false,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
