use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use stockroom_events::Event;

/// Employee identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub AggregateId);

impl EmployeeId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

/// Aggregate root: Employee, the counterpart of deliveries and returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    id: EmployeeId,
    tenant_id: Option<TenantId>,
    name: String,
    email: Option<String>,
    area: String,
    position: String,
    status: EmployeeStatus,
    version: u64,
    created: bool,
}

impl Employee {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: EmployeeId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            email: None,
            area: String::new(),
            position: String::new(),
            status: EmployeeStatus::Inactive,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> EmployeeId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn status(&self) -> EmployeeStatus {
        self.status
    }

    /// Only active employees can receive or return goods.
    pub fn can_receive(&self) -> bool {
        self.created && self.status == EmployeeStatus::Active
    }
}

impl AggregateRoot for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterEmployee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEmployee {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub name: String,
    pub email: Option<String>,
    pub area: String,
    pub position: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateEmployee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateEmployee {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateEmployee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateEmployee {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeCommand {
    RegisterEmployee(RegisterEmployee),
    DeactivateEmployee(DeactivateEmployee),
    ReactivateEmployee(ReactivateEmployee),
}

/// Event: EmployeeRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRegistered {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub name: String,
    pub email: Option<String>,
    pub area: String,
    pub position: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EmployeeDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDeactivated {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: EmployeeReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeReactivated {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeEvent {
    EmployeeRegistered(EmployeeRegistered),
    EmployeeDeactivated(EmployeeDeactivated),
    EmployeeReactivated(EmployeeReactivated),
}

impl EmployeeEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            EmployeeEvent::EmployeeRegistered(e) => e.tenant_id,
            EmployeeEvent::EmployeeDeactivated(e) => e.tenant_id,
            EmployeeEvent::EmployeeReactivated(e) => e.tenant_id,
        }
    }

    pub fn employee_id(&self) -> EmployeeId {
        match self {
            EmployeeEvent::EmployeeRegistered(e) => e.employee_id,
            EmployeeEvent::EmployeeDeactivated(e) => e.employee_id,
            EmployeeEvent::EmployeeReactivated(e) => e.employee_id,
        }
    }
}

impl Event for EmployeeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EmployeeEvent::EmployeeRegistered(_) => "ledger.employee.registered",
            EmployeeEvent::EmployeeDeactivated(_) => "ledger.employee.deactivated",
            EmployeeEvent::EmployeeReactivated(_) => "ledger.employee.reactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EmployeeEvent::EmployeeRegistered(e) => e.occurred_at,
            EmployeeEvent::EmployeeDeactivated(e) => e.occurred_at,
            EmployeeEvent::EmployeeReactivated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Employee {
    type Command = EmployeeCommand;
    type Event = EmployeeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            EmployeeEvent::EmployeeRegistered(e) => {
                self.id = e.employee_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.area = e.area.clone();
                self.position = e.position.clone();
                self.status = EmployeeStatus::Active;
                self.created = true;
            }
            EmployeeEvent::EmployeeDeactivated(_) => {
                self.status = EmployeeStatus::Inactive;
            }
            EmployeeEvent::EmployeeReactivated(_) => {
                self.status = EmployeeStatus::Active;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            EmployeeCommand::RegisterEmployee(cmd) => self.handle_register(cmd),
            EmployeeCommand::DeactivateEmployee(cmd) => self.handle_deactivate(cmd),
            EmployeeCommand::ReactivateEmployee(cmd) => self.handle_reactivate(cmd),
        }
    }
}

impl Employee {
    fn ensure_target(&self, tenant_id: TenantId, employee_id: EmployeeId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != employee_id {
            return Err(DomainError::invariant("employee_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterEmployee) -> Result<Vec<EmployeeEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("employee already exists"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let email = cmd
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(DomainError::validation("email must contain '@'"));
            }
        }

        Ok(vec![EmployeeEvent::EmployeeRegistered(EmployeeRegistered {
            tenant_id: cmd.tenant_id,
            employee_id: cmd.employee_id,
            name: name.to_string(),
            email,
            area: cmd.area.trim().to_string(),
            position: cmd.position.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateEmployee) -> Result<Vec<EmployeeEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.employee_id)?;
        if self.status == EmployeeStatus::Inactive {
            return Err(DomainError::conflict("employee is already inactive"));
        }
        Ok(vec![EmployeeEvent::EmployeeDeactivated(EmployeeDeactivated {
            tenant_id: cmd.tenant_id,
            employee_id: cmd.employee_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &ReactivateEmployee) -> Result<Vec<EmployeeEvent>, DomainError> {
        self.ensure_target(cmd.tenant_id, cmd.employee_id)?;
        if self.status == EmployeeStatus::Active {
            return Err(DomainError::conflict("employee is already active"));
        }
        Ok(vec![EmployeeEvent::EmployeeReactivated(EmployeeReactivated {
            tenant_id: cmd.tenant_id,
            employee_id: cmd.employee_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
