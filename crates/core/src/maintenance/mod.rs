mod enums;
mod error;
mod operations;
mod types;

pub use enums::{
    ActorType, AuditAction, AuditEntityType, ComplianceStatus, ComponentType, CredentialType,
    DirectiveType, DueItemStatus, EmbeddingScope, EventOrigin, MaintenanceEventType, UserRole,
    UserStatus,
};
pub use error::{UnknownVariant, ValidationError};
pub use operations::{
    ensure_same_org, is_valid_slug, validate_aircraft, validate_component, validate_due_item,
    validate_embedding, validate_maintenance_event, validate_organization, validate_user,
};
pub use types::{
    Aircraft, AuditLog, ComplianceSnapshot, Component, Directive, DueItem, Embedding,
    EmbeddingTarget, MaintenanceEvent, MaintenanceEventDetails, MaintenanceEventDirective,
    Organization, Signatory, User,
};
