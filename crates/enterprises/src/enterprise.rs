use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use foodflow_events::Event;

use crate::fee::{FeeDefinition, FeeId, FeeType};

/// Enterprise identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnterpriseId(pub AggregateId);

impl EnterpriseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for EnterpriseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What an enterprise is allowed to sell through the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellsScope {
    /// Supplies goods only; no shopfront.
    None,
    /// Sells its own produce.
    Own,
    /// Full hub: sells anything flowing through its order cycles.
    Any,
}

/// Contact information for an enterprise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Aggregate root: Enterprise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enterprise {
    id: EnterpriseId,
    owner: Option<UserId>,
    name: String,
    sells: SellsScope,
    is_primary_producer: bool,
    description: Option<String>,
    contact: ContactInfo,
    fees: Vec<FeeDefinition>,
    version: u64,
    created: bool,
}

impl Enterprise {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: EnterpriseId) -> Self {
        Self {
            id,
            owner: None,
            name: String::new(),
            sells: SellsScope::None,
            is_primary_producer: false,
            description: None,
            contact: ContactInfo::default(),
            fees: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> EnterpriseId {
        self.id
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sells(&self) -> SellsScope {
        self.sells
    }

    pub fn is_primary_producer(&self) -> bool {
        self.is_primary_producer
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn fees(&self) -> &[FeeDefinition] {
        &self.fees
    }

    pub fn fee(&self, fee_id: FeeId) -> Option<&FeeDefinition> {
        self.fees.iter().find(|f| f.fee_id == fee_id)
    }

    /// Whether this enterprise can act as a hub (coordinate/distribute).
    pub fn is_hub(&self) -> bool {
        matches!(self.sells, SellsScope::Any)
    }
}

impl AggregateRoot for Enterprise {
    type Id = EnterpriseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterEnterprise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEnterprise {
    pub enterprise_id: EnterpriseId,
    pub owner: UserId,
    pub name: String,
    pub sells: SellsScope,
    pub is_primary_producer: bool,
    pub description: Option<String>,
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub enterprise_id: EnterpriseId,
    /// Optional new name (if None, keep existing).
    pub name: Option<String>,
    /// Optional new description (if None, keep existing).
    pub description: Option<String>,
    /// Optional new contact info (if None, keep existing).
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DefineFee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineFee {
    pub enterprise_id: EnterpriseId,
    pub fee_id: FeeId,
    pub fee_type: FeeType,
    pub name: String,
    pub amount_per_item: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnterpriseCommand {
    RegisterEnterprise(RegisterEnterprise),
    UpdateProfile(UpdateProfile),
    DefineFee(DefineFee),
}

/// Event: EnterpriseRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseRegistered {
    pub enterprise_id: EnterpriseId,
    pub owner: UserId,
    pub name: String,
    pub sells: SellsScope,
    pub is_primary_producer: bool,
    pub description: Option<String>,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EnterpriseProfileUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseProfileUpdated {
    pub enterprise_id: EnterpriseId,
    pub name: String,
    pub description: Option<String>,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EnterpriseFeeDefined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseFeeDefined {
    pub enterprise_id: EnterpriseId,
    pub fee_id: FeeId,
    pub fee_type: FeeType,
    pub name: String,
    pub amount_per_item: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnterpriseEvent {
    EnterpriseRegistered(EnterpriseRegistered),
    EnterpriseProfileUpdated(EnterpriseProfileUpdated),
    EnterpriseFeeDefined(EnterpriseFeeDefined),
}

impl Event for EnterpriseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EnterpriseEvent::EnterpriseRegistered(_) => "enterprises.enterprise.registered",
            EnterpriseEvent::EnterpriseProfileUpdated(_) => "enterprises.enterprise.profile_updated",
            EnterpriseEvent::EnterpriseFeeDefined(_) => "enterprises.enterprise.fee_defined",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EnterpriseEvent::EnterpriseRegistered(e) => e.occurred_at,
            EnterpriseEvent::EnterpriseProfileUpdated(e) => e.occurred_at,
            EnterpriseEvent::EnterpriseFeeDefined(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Enterprise {
    type Command = EnterpriseCommand;
    type Event = EnterpriseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            EnterpriseEvent::EnterpriseRegistered(e) => {
                self.id = e.enterprise_id;
                self.owner = Some(e.owner);
                self.name = e.name.clone();
                self.sells = e.sells;
                self.is_primary_producer = e.is_primary_producer;
                self.description = e.description.clone();
                self.contact = e.contact.clone();
                self.created = true;
            }
            EnterpriseEvent::EnterpriseProfileUpdated(e) => {
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.contact = e.contact.clone();
            }
            EnterpriseEvent::EnterpriseFeeDefined(e) => {
                self.fees.push(FeeDefinition {
                    fee_id: e.fee_id,
                    fee_type: e.fee_type,
                    name: e.name.clone(),
                    amount_per_item: e.amount_per_item,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            EnterpriseCommand::RegisterEnterprise(cmd) => self.handle_register(cmd),
            EnterpriseCommand::UpdateProfile(cmd) => self.handle_update(cmd),
            EnterpriseCommand::DefineFee(cmd) => self.handle_define_fee(cmd),
        }
    }
}

impl Enterprise {
    fn ensure_enterprise_id(&self, enterprise_id: EnterpriseId) -> Result<(), DomainError> {
        if self.id != enterprise_id {
            return Err(DomainError::invariant("enterprise_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterEnterprise) -> Result<Vec<EnterpriseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("enterprise already registered"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![EnterpriseEvent::EnterpriseRegistered(EnterpriseRegistered {
            enterprise_id: cmd.enterprise_id,
            owner: cmd.owner,
            name: cmd.name.clone(),
            sells: cmd.sells,
            is_primary_producer: cmd.is_primary_producer,
            description: cmd.description.clone(),
            contact: cmd.contact.clone().unwrap_or_default(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProfile) -> Result<Vec<EnterpriseEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_enterprise_id(cmd.enterprise_id)?;

        let new_name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if new_name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let new_description = cmd.description.clone().or_else(|| self.description.clone());
        let new_contact = cmd.contact.clone().unwrap_or_else(|| self.contact.clone());

        Ok(vec![EnterpriseEvent::EnterpriseProfileUpdated(EnterpriseProfileUpdated {
            enterprise_id: cmd.enterprise_id,
            name: new_name,
            description: new_description,
            contact: new_contact,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_define_fee(&self, cmd: &DefineFee) -> Result<Vec<EnterpriseEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_enterprise_id(cmd.enterprise_id)?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("fee name cannot be empty"));
        }

        if self.fee(cmd.fee_id).is_some() {
            return Err(DomainError::conflict("fee already defined"));
        }

        Ok(vec![EnterpriseEvent::EnterpriseFeeDefined(EnterpriseFeeDefined {
            enterprise_id: cmd.enterprise_id,
            fee_id: cmd.fee_id,
            fee_type: cmd.fee_type,
            name: cmd.name.clone(),
            amount_per_item: cmd.amount_per_item,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodflow_events::execute;

    fn test_enterprise_id() -> EnterpriseId {
        EnterpriseId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Explicit builder: a registered enterprise with the given shape.
    fn registered_enterprise(
        id: EnterpriseId,
        sells: SellsScope,
        is_primary_producer: bool,
    ) -> Enterprise {
        let mut enterprise = Enterprise::empty(id);
        execute(
            &mut enterprise,
            &EnterpriseCommand::RegisterEnterprise(RegisterEnterprise {
                enterprise_id: id,
                owner: UserId::new(),
                name: "Test Enterprise".to_string(),
                sells,
                is_primary_producer,
                description: Some("enterprise".to_string()),
                contact: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        enterprise
    }

    #[test]
    fn register_emits_enterprise_registered_event() {
        let id = test_enterprise_id();
        let enterprise = Enterprise::empty(id);
        let owner = UserId::new();
        let cmd = RegisterEnterprise {
            enterprise_id: id,
            owner,
            name: "Green Valley Hub".to_string(),
            sells: SellsScope::Any,
            is_primary_producer: false,
            description: None,
            contact: Some(ContactInfo {
                email: Some("hub@example.com".to_string()),
                phone: None,
                address: Some("12 Market St".to_string()),
            }),
            occurred_at: test_time(),
        };

        let events = enterprise
            .handle(&EnterpriseCommand::RegisterEnterprise(cmd))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            EnterpriseEvent::EnterpriseRegistered(e) => {
                assert_eq!(e.enterprise_id, id);
                assert_eq!(e.owner, owner);
                assert_eq!(e.name, "Green Valley Hub");
                assert_eq!(e.sells, SellsScope::Any);
                assert!(!e.is_primary_producer);
                assert_eq!(e.contact.email.as_deref(), Some("hub@example.com"));
            }
            _ => panic!("Expected EnterpriseRegistered event"),
        }
    }

    #[test]
    fn register_rejects_empty_name() {
        let id = test_enterprise_id();
        let enterprise = Enterprise::empty(id);
        let cmd = RegisterEnterprise {
            enterprise_id: id,
            owner: UserId::new(),
            name: "   ".to_string(),
            sells: SellsScope::None,
            is_primary_producer: true,
            description: None,
            contact: None,
            occurred_at: test_time(),
        };

        let err = enterprise
            .handle(&EnterpriseCommand::RegisterEnterprise(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_rejects_duplicate_registration() {
        let id = test_enterprise_id();
        let enterprise = registered_enterprise(id, SellsScope::Own, true);

        let cmd = RegisterEnterprise {
            enterprise_id: id,
            owner: UserId::new(),
            name: "Again".to_string(),
            sells: SellsScope::Own,
            is_primary_producer: true,
            description: None,
            contact: None,
            occurred_at: test_time(),
        };

        let err = enterprise
            .handle(&EnterpriseCommand::RegisterEnterprise(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn update_profile_keeps_unset_fields() {
        let id = test_enterprise_id();
        let mut enterprise = registered_enterprise(id, SellsScope::Any, false);

        execute(
            &mut enterprise,
            &EnterpriseCommand::UpdateProfile(UpdateProfile {
                enterprise_id: id,
                name: Some("Renamed Hub".to_string()),
                description: None,
                contact: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(enterprise.name(), "Renamed Hub");
        // Description was not part of the update and survives.
        assert_eq!(enterprise.description(), Some("enterprise"));
    }

    #[test]
    fn update_profile_requires_existing_enterprise() {
        let id = test_enterprise_id();
        let enterprise = Enterprise::empty(id);

        let err = enterprise
            .handle(&EnterpriseCommand::UpdateProfile(UpdateProfile {
                enterprise_id: id,
                name: Some("Name".to_string()),
                description: None,
                contact: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn define_fee_records_definition_in_order() {
        let id = test_enterprise_id();
        let mut enterprise = registered_enterprise(id, SellsScope::Any, false);

        let packing = FeeId::new(AggregateId::new());
        let transport = FeeId::new(AggregateId::new());

        for (fee_id, fee_type, name) in [
            (packing, FeeType::Packing, "Packing fee"),
            (transport, FeeType::Transport, "Transport fee"),
        ] {
            execute(
                &mut enterprise,
                &EnterpriseCommand::DefineFee(DefineFee {
                    enterprise_id: id,
                    fee_id,
                    fee_type,
                    name: name.to_string(),
                    amount_per_item: 50,
                    occurred_at: test_time(),
                }),
            )
            .unwrap();
        }

        assert_eq!(enterprise.fees().len(), 2);
        assert_eq!(enterprise.fees()[0].fee_id, packing);
        assert_eq!(enterprise.fees()[1].fee_id, transport);
        assert_eq!(enterprise.fee(transport).unwrap().fee_type, FeeType::Transport);
    }

    #[test]
    fn define_fee_rejects_duplicate_fee_id() {
        let id = test_enterprise_id();
        let mut enterprise = registered_enterprise(id, SellsScope::Any, false);
        let fee_id = FeeId::new(AggregateId::new());

        let cmd = EnterpriseCommand::DefineFee(DefineFee {
            enterprise_id: id,
            fee_id,
            fee_type: FeeType::Admin,
            name: "Admin fee".to_string(),
            amount_per_item: 10,
            occurred_at: test_time(),
        });

        execute(&mut enterprise, &cmd).unwrap();
        let err = enterprise.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn hub_and_producer_flags_reflect_registration() {
        let supplier = registered_enterprise(test_enterprise_id(), SellsScope::None, true);
        assert!(supplier.is_primary_producer());
        assert!(!supplier.is_hub());

        let hub = registered_enterprise(test_enterprise_id(), SellsScope::Any, false);
        assert!(hub.is_hub());
    }

    #[test]
    fn version_increments_on_apply() {
        let id = test_enterprise_id();
        let mut enterprise = registered_enterprise(id, SellsScope::Any, false);
        assert_eq!(enterprise.version(), 1);

        execute(
            &mut enterprise,
            &EnterpriseCommand::DefineFee(DefineFee {
                enterprise_id: id,
                fee_id: FeeId::new(AggregateId::new()),
                fee_type: FeeType::Sales,
                name: "Sales fee".to_string(),
                amount_per_item: 25,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(enterprise.version(), 2);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let id = test_enterprise_id();
        let enterprise = registered_enterprise(id, SellsScope::Any, false);
        let before = enterprise.clone();

        let cmd = EnterpriseCommand::DefineFee(DefineFee {
            enterprise_id: id,
            fee_id: FeeId::new(AggregateId::new()),
            fee_type: FeeType::Packing,
            name: "Packing".to_string(),
            amount_per_item: 5,
            occurred_at: test_time(),
        });
        let _ = enterprise.handle(&cmd).unwrap();

        assert_eq!(enterprise, before);
    }
}
