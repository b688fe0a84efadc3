use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::maintenance::{
    Aircraft, AuditEntityType, AuditLog, ComplianceSnapshot, Component, Directive, DueItem,
    Embedding, MaintenanceEvent, MaintenanceEventDetails, MaintenanceEventDirective, Organization,
    Signatory, User,
};

use super::Result;

/// Repository for organization (tenant) operations.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Gets an organization by its ID.
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>>;

    /// Gets an organization by its unique slug.
    async fn get_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    /// Creates a new organization.
    async fn create_organization(&self, org: &Organization) -> Result<()>;
}

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Gets a user by organization and email address.
    async fn get_user_by_email(&self, org_id: Uuid, email: &str) -> Result<Option<User>>;

    /// Creates a new user. Fails with `AlreadyExists` when the email is taken in the org.
    async fn create_user(&self, user: &User) -> Result<()>;
}

/// Repository for aircraft and installed components.
#[async_trait]
pub trait FleetRepository: Send + Sync {
    async fn get_aircraft(&self, id: Uuid) -> Result<Option<Aircraft>>;

    async fn get_aircraft_by_tail_number(
        &self,
        org_id: Uuid,
        tail_number: &str,
    ) -> Result<Option<Aircraft>>;

    /// Creates a new aircraft. Fails with `AlreadyExists` when the tail number is taken in the org.
    async fn create_aircraft(&self, aircraft: &Aircraft) -> Result<()>;

    async fn get_component(&self, id: Uuid) -> Result<Option<Component>>;

    /// Creates a component. Fails with `NotFound` when its aircraft does not exist.
    async fn create_component(&self, component: &Component) -> Result<()>;
}

/// Repository for the compliance side of the logbook: signatories,
/// directives, maintenance events and their directive links.
#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    async fn create_signatory(&self, signatory: &Signatory) -> Result<()>;

    async fn create_directive(&self, directive: &Directive) -> Result<()>;

    async fn get_directive(&self, id: Uuid) -> Result<Option<Directive>>;

    /// Creates an event. Hours with more than one decimal place fail with `InvalidData`.
    async fn create_maintenance_event(&self, event: &MaintenanceEvent) -> Result<()>;

    async fn get_maintenance_event(&self, id: Uuid) -> Result<Option<MaintenanceEvent>>;

    /// Links an event to a directive with a compliance status.
    async fn link_directive(&self, link: &MaintenanceEventDirective) -> Result<()>;

    /// Gets an event together with its component, signatory and directive links.
    async fn get_maintenance_event_details(
        &self,
        id: Uuid,
    ) -> Result<Option<MaintenanceEventDetails>>;
}

/// Repository for compliance snapshots and due items.
#[async_trait]
pub trait ComplianceRepository: Send + Sync {
    async fn create_compliance_snapshot(&self, snapshot: &ComplianceSnapshot) -> Result<()>;

    /// Gets the most recent snapshot for an aircraft.
    async fn latest_compliance_snapshot(
        &self,
        aircraft_id: Uuid,
    ) -> Result<Option<ComplianceSnapshot>>;

    async fn create_due_item(&self, item: &DueItem) -> Result<()>;

    /// Lists open due items for an aircraft due at or before `before`, soonest first.
    async fn list_due_items(&self, aircraft_id: Uuid, before: DateTime<Utc>)
        -> Result<Vec<DueItem>>;
}

/// Repository for embedding vectors.
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    async fn create_embedding(&self, embedding: &Embedding) -> Result<()>;

    async fn list_embeddings(&self, org_id: Uuid) -> Result<Vec<Embedding>>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append_audit_log(&self, entry: &AuditLog) -> Result<()>;

    async fn get_audit_log(&self, id: Uuid) -> Result<Option<AuditLog>>;

    /// Lists the audit history of one entity, oldest first.
    async fn list_audit_logs_for_entity(
        &self,
        entity_type: AuditEntityType,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLog>>;
}
