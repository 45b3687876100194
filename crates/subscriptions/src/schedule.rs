use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use foodflow_cycles::OrderCycleId;
use foodflow_events::Event;

/// Schedule identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub AggregateId);

impl ScheduleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Schedule, a named, ordered set of order cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    id: ScheduleId,
    name: String,
    order_cycles: Vec<OrderCycleId>,
    version: u64,
    created: bool,
}

impl Schedule {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ScheduleId) -> Self {
        Self {
            id,
            name: String::new(),
            order_cycles: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ScheduleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member cycles in schedule order.
    pub fn order_cycles(&self) -> &[OrderCycleId] {
        &self.order_cycles
    }

    pub fn contains(&self, cycle_id: OrderCycleId) -> bool {
        self.order_cycles.contains(&cycle_id)
    }
}

impl AggregateRoot for Schedule {
    type Id = ScheduleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSchedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSchedule {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub order_cycles: Vec<OrderCycleId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddScheduleOrderCycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddScheduleOrderCycle {
    pub schedule_id: ScheduleId,
    pub order_cycle_id: OrderCycleId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveScheduleOrderCycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveScheduleOrderCycle {
    pub schedule_id: ScheduleId,
    pub order_cycle_id: OrderCycleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleCommand {
    CreateSchedule(CreateSchedule),
    AddScheduleOrderCycle(AddScheduleOrderCycle),
    RemoveScheduleOrderCycle(RemoveScheduleOrderCycle),
}

/// Event: ScheduleCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCreated {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub order_cycles: Vec<OrderCycleId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ScheduleOrderCycleAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOrderCycleAdded {
    pub schedule_id: ScheduleId,
    pub order_cycle_id: OrderCycleId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ScheduleOrderCycleRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOrderCycleRemoved {
    pub schedule_id: ScheduleId,
    pub order_cycle_id: OrderCycleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    ScheduleCreated(ScheduleCreated),
    ScheduleOrderCycleAdded(ScheduleOrderCycleAdded),
    ScheduleOrderCycleRemoved(ScheduleOrderCycleRemoved),
}

impl Event for ScheduleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ScheduleEvent::ScheduleCreated(_) => "subscriptions.schedule.created",
            ScheduleEvent::ScheduleOrderCycleAdded(_) => "subscriptions.schedule.order_cycle_added",
            ScheduleEvent::ScheduleOrderCycleRemoved(_) => {
                "subscriptions.schedule.order_cycle_removed"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ScheduleEvent::ScheduleCreated(e) => e.occurred_at,
            ScheduleEvent::ScheduleOrderCycleAdded(e) => e.occurred_at,
            ScheduleEvent::ScheduleOrderCycleRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Schedule {
    type Command = ScheduleCommand;
    type Event = ScheduleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ScheduleEvent::ScheduleCreated(e) => {
                self.id = e.schedule_id;
                self.name = e.name.clone();
                self.order_cycles = e.order_cycles.clone();
                self.created = true;
            }
            ScheduleEvent::ScheduleOrderCycleAdded(e) => {
                self.order_cycles.push(e.order_cycle_id);
            }
            ScheduleEvent::ScheduleOrderCycleRemoved(e) => {
                self.order_cycles.retain(|id| *id != e.order_cycle_id);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ScheduleCommand::CreateSchedule(cmd) => self.handle_create(cmd),
            ScheduleCommand::AddScheduleOrderCycle(cmd) => self.handle_add(cmd),
            ScheduleCommand::RemoveScheduleOrderCycle(cmd) => self.handle_remove(cmd),
        }
    }
}

impl Schedule {
    fn ensure_schedule_id(&self, schedule_id: ScheduleId) -> Result<(), DomainError> {
        if self.id != schedule_id {
            return Err(DomainError::invariant("schedule_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSchedule) -> Result<Vec<ScheduleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("schedule already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for cycle_id in &cmd.order_cycles {
            if !seen.insert(*cycle_id) {
                return Err(DomainError::validation(
                    "schedule cannot contain the same order cycle twice",
                ));
            }
        }

        Ok(vec![ScheduleEvent::ScheduleCreated(ScheduleCreated {
            schedule_id: cmd.schedule_id,
            name: cmd.name.clone(),
            order_cycles: cmd.order_cycles.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add(&self, cmd: &AddScheduleOrderCycle) -> Result<Vec<ScheduleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_schedule_id(cmd.schedule_id)?;

        if self.contains(cmd.order_cycle_id) {
            return Err(DomainError::validation(
                "schedule cannot contain the same order cycle twice",
            ));
        }

        Ok(vec![ScheduleEvent::ScheduleOrderCycleAdded(ScheduleOrderCycleAdded {
            schedule_id: cmd.schedule_id,
            order_cycle_id: cmd.order_cycle_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(
        &self,
        cmd: &RemoveScheduleOrderCycle,
    ) -> Result<Vec<ScheduleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_schedule_id(cmd.schedule_id)?;

        if !self.contains(cmd.order_cycle_id) {
            return Err(DomainError::not_found());
        }

        Ok(vec![ScheduleEvent::ScheduleOrderCycleRemoved(ScheduleOrderCycleRemoved {
            schedule_id: cmd.schedule_id,
            order_cycle_id: cmd.order_cycle_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodflow_events::execute;

    fn test_schedule_id() -> ScheduleId {
        ScheduleId::new(AggregateId::new())
    }

    fn test_cycle_id() -> OrderCycleId {
        OrderCycleId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Explicit builder: a created schedule over the given cycles.
    fn created_schedule(id: ScheduleId, cycles: &[OrderCycleId]) -> Schedule {
        let mut schedule = Schedule::empty(id);
        execute(
            &mut schedule,
            &ScheduleCommand::CreateSchedule(CreateSchedule {
                schedule_id: id,
                name: "Weekly".to_string(),
                order_cycles: cycles.to_vec(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        schedule
    }

    #[test]
    fn create_keeps_cycle_order() {
        let cycles = [test_cycle_id(), test_cycle_id(), test_cycle_id()];
        let schedule = created_schedule(test_schedule_id(), &cycles);
        assert_eq!(schedule.order_cycles(), &cycles);
    }

    #[test]
    fn create_rejects_duplicate_cycles() {
        let id = test_schedule_id();
        let cycle = test_cycle_id();
        let schedule = Schedule::empty(id);

        let err = schedule
            .handle(&ScheduleCommand::CreateSchedule(CreateSchedule {
                schedule_id: id,
                name: "Weekly".to_string(),
                order_cycles: vec![cycle, cycle],
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn add_and_remove_maintain_membership() {
        let id = test_schedule_id();
        let first = test_cycle_id();
        let mut schedule = created_schedule(id, &[first]);

        let second = test_cycle_id();
        execute(
            &mut schedule,
            &ScheduleCommand::AddScheduleOrderCycle(AddScheduleOrderCycle {
                schedule_id: id,
                order_cycle_id: second,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert!(schedule.contains(second));

        execute(
            &mut schedule,
            &ScheduleCommand::RemoveScheduleOrderCycle(RemoveScheduleOrderCycle {
                schedule_id: id,
                order_cycle_id: first,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert!(!schedule.contains(first));
        assert_eq!(schedule.order_cycles(), &[second]);
    }

    #[test]
    fn add_rejects_member_cycle_and_remove_rejects_stranger() {
        let id = test_schedule_id();
        let member = test_cycle_id();
        let schedule = created_schedule(id, &[member]);

        let err = schedule
            .handle(&ScheduleCommand::AddScheduleOrderCycle(AddScheduleOrderCycle {
                schedule_id: id,
                order_cycle_id: member,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = schedule
            .handle(&ScheduleCommand::RemoveScheduleOrderCycle(RemoveScheduleOrderCycle {
                schedule_id: id,
                order_cycle_id: test_cycle_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
