use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{
    ActorType, AuditAction, AuditEntityType, ComplianceStatus, ComponentType, CredentialType,
    DirectiveType, DueItemStatus, EmbeddingScope, EventOrigin, MaintenanceEventType, UserRole,
    UserStatus,
};

/// Tenant root. Every other record is scoped to exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Globally unique, URL-safe identifier.
    pub slug: String,
    /// IANA timezone name used when rendering logbook dates.
    pub timezone: String,
}

impl Organization {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            timezone: "UTC".to_string(),
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Sets a specific ID for this organization (useful for testing).
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A person with access to one organization. Unique per (org, email).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl User {
    pub fn new(
        org_id: Uuid,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            email: email.into(),
            display_name: display_name.into(),
            role,
            status: UserStatus::Active,
        }
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// An aircraft in an organization's fleet. Unique per (org, tail number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    pub id: Uuid,
    pub org_id: Uuid,
    pub tail_number: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub year: Option<i32>,
}

impl Aircraft {
    pub fn new(org_id: Uuid, tail_number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            tail_number: tail_number.into(),
            make: None,
            model: None,
            serial_number: None,
            year: None,
        }
    }

    /// Sets make and model together; they are almost always known as a pair.
    pub fn with_make_model(mut self, make: impl Into<String>, model: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self.model = Some(model.into());
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A tracked part installed on an aircraft (engine, propeller, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: Uuid,
    pub org_id: Uuid,
    pub aircraft_id: Uuid,
    pub name: String,
    pub component_type: ComponentType,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

impl Component {
    pub fn new(
        aircraft: &Aircraft,
        name: impl Into<String>,
        component_type: ComponentType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id: aircraft.org_id,
            aircraft_id: aircraft.id,
            name: name.into(),
            component_type,
            serial_number: None,
            manufacturer: None,
            model: None,
        }
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_manufacturer_model(
        mut self,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self.model = Some(model.into());
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A certificated person who can attest maintenance events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signatory {
    pub id: Uuid,
    pub org_id: Uuid,
    pub full_name: String,
    pub credential_type: CredentialType,
    pub certificate_id: String,
    pub email: Option<String>,
}

impl Signatory {
    pub fn new(
        org_id: Uuid,
        full_name: impl Into<String>,
        credential_type: CredentialType,
        certificate_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            full_name: full_name.into(),
            credential_type,
            certificate_id: certificate_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A regulatory or manufacturer requirement aircraft must comply with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub id: Uuid,
    pub org_id: Uuid,
    pub directive_type: DirectiveType,
    /// Regulator reference, e.g. `AD 2024-01-01`. Unique per organization.
    pub reference_code: String,
    pub title: String,
    /// Structured applicability criteria (models, serial ranges, ...).
    pub applicability: serde_json::Value,
}

impl Directive {
    pub fn new(
        org_id: Uuid,
        directive_type: DirectiveType,
        reference_code: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            directive_type,
            reference_code: reference_code.into(),
            title: title.into(),
            applicability: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_applicability(mut self, applicability: serde_json::Value) -> Self {
        self.applicability = applicability;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// A logbook entry: work performed on an aircraft or one of its components.
///
/// Hour counters are fixed-point decimals so a tach reading of `1234.5`
/// is stored and read back exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceEvent {
    pub id: Uuid,
    pub org_id: Uuid,
    pub aircraft_id: Uuid,
    pub component_id: Option<Uuid>,
    pub signatory_id: Option<Uuid>,
    pub event_type: MaintenanceEventType,
    pub origin: EventOrigin,
    pub performed_at: DateTime<Utc>,
    pub description: String,
    pub corrective_action: Option<String>,
    pub tach_hours: Option<Decimal>,
    pub hobbs_hours: Option<Decimal>,
}

impl MaintenanceEvent {
    pub fn new(
        aircraft: &Aircraft,
        event_type: MaintenanceEventType,
        performed_at: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id: aircraft.org_id,
            aircraft_id: aircraft.id,
            component_id: None,
            signatory_id: None,
            event_type,
            origin: EventOrigin::Manual,
            performed_at,
            description: description.into(),
            corrective_action: None,
            tach_hours: None,
            hobbs_hours: None,
        }
    }

    pub fn with_component(mut self, component: &Component) -> Self {
        self.component_id = Some(component.id);
        self
    }

    pub fn signed_by(mut self, signatory: &Signatory) -> Self {
        self.signatory_id = Some(signatory.id);
        self
    }

    pub fn with_origin(mut self, origin: EventOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_corrective_action(mut self, corrective_action: impl Into<String>) -> Self {
        self.corrective_action = Some(corrective_action.into());
        self
    }

    pub fn with_hours(mut self, tach_hours: Decimal, hobbs_hours: Decimal) -> Self {
        self.tach_hours = Some(tach_hours);
        self.hobbs_hours = Some(hobbs_hours);
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// Links a maintenance event to a directive it addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceEventDirective {
    pub event_id: Uuid,
    pub directive_id: Uuid,
    pub compliance_status: ComplianceStatus,
    pub notes: Option<String>,
}

impl MaintenanceEventDirective {
    pub fn new(
        event: &MaintenanceEvent,
        directive: &Directive,
        compliance_status: ComplianceStatus,
    ) -> Self {
        Self {
            event_id: event.id,
            directive_id: directive.id,
            compliance_status,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A maintenance event fetched together with its related records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceEventDetails {
    pub event: MaintenanceEvent,
    pub component: Option<Component>,
    pub signatory: Option<Signatory>,
    pub directives: Vec<MaintenanceEventDirective>,
}

/// Point-in-time summary of an aircraft's compliance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSnapshot {
    pub id: Uuid,
    pub org_id: Uuid,
    pub aircraft_id: Uuid,
    pub as_of: DateTime<Utc>,
    pub summary: serde_json::Value,
}

impl ComplianceSnapshot {
    pub fn new(aircraft: &Aircraft, as_of: DateTime<Utc>, summary: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id: aircraft.org_id,
            aircraft_id: aircraft.id,
            as_of,
            summary,
        }
    }
}

/// The record an embedding represents. Exactly one target exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmbeddingTarget {
    MaintenanceEvent(Uuid),
    ComplianceSnapshot(Uuid),
}

impl EmbeddingTarget {
    pub fn scope(&self) -> EmbeddingScope {
        match self {
            EmbeddingTarget::MaintenanceEvent(_) => EmbeddingScope::MaintenanceEvent,
            EmbeddingTarget::ComplianceSnapshot(_) => EmbeddingScope::ComplianceSnapshot,
        }
    }

    pub fn event_id(&self) -> Option<Uuid> {
        match self {
            EmbeddingTarget::MaintenanceEvent(id) => Some(*id),
            EmbeddingTarget::ComplianceSnapshot(_) => None,
        }
    }

    pub fn compliance_snapshot_id(&self) -> Option<Uuid> {
        match self {
            EmbeddingTarget::ComplianceSnapshot(id) => Some(*id),
            EmbeddingTarget::MaintenanceEvent(_) => None,
        }
    }
}

/// A vector representation of an event or snapshot used for retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embedding {
    pub id: Uuid,
    pub org_id: Uuid,
    pub target: EmbeddingTarget,
    pub dimensions: i32,
    pub vector: Vec<f32>,
    /// Name of the model that produced the vector.
    pub model: Option<String>,
}

impl Embedding {
    /// Creates an embedding whose dimension count is taken from the vector.
    pub fn new(org_id: Uuid, target: EmbeddingTarget, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            target,
            dimensions: i32::try_from(vector.len()).unwrap_or(i32::MAX),
            vector,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn scope(&self) -> EmbeddingScope {
        self.target.scope()
    }
}

/// An upcoming maintenance obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub id: Uuid,
    pub org_id: Uuid,
    pub aircraft_id: Uuid,
    pub component_id: Option<Uuid>,
    pub directive_id: Option<Uuid>,
    pub event_type: MaintenanceEventType,
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub due_hours: Option<Decimal>,
    pub status: DueItemStatus,
}

impl DueItem {
    pub fn new(
        aircraft: &Aircraft,
        event_type: MaintenanceEventType,
        title: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id: aircraft.org_id,
            aircraft_id: aircraft.id,
            component_id: None,
            directive_id: None,
            event_type,
            title: title.into(),
            due_at,
            due_hours: None,
            status: DueItemStatus::Open,
        }
    }

    pub fn with_component(mut self, component: &Component) -> Self {
        self.component_id = Some(component.id);
        self
    }

    pub fn for_directive(mut self, directive: &Directive) -> Self {
        self.directive_id = Some(directive.id);
        self
    }

    pub fn with_due_hours(mut self, due_hours: Decimal) -> Self {
        self.due_hours = Some(due_hours);
        self
    }
}

/// An immutable record of an action taken against an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub org_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_type: ActorType,
    pub entity_type: AuditEntityType,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub summary: Option<String>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        org_id: Uuid,
        actor_type: ActorType,
        entity_type: AuditEntityType,
        entity_id: Uuid,
        action: AuditAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            actor_id: None,
            actor_type,
            entity_type,
            entity_id,
            action,
            summary: None,
            before: None,
            after: None,
            created_at: Utc::now(),
        }
    }

    pub fn by_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Records the entity state before and after the action.
    pub fn with_snapshots(
        mut self,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn test_children_inherit_parent_organization() {
        let org = Organization::new("SkyShare Aviation", "skyshare");
        let aircraft = Aircraft::new(org.id, "N9876Q").with_make_model("Piper", "PA-46");
        let engine = Component::new(&aircraft, "Left Engine", ComponentType::Engine);
        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::Inspection,
            Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap(),
            "Annual inspection",
        )
        .with_component(&engine);

        assert_eq!(engine.org_id, org.id);
        assert_eq!(engine.aircraft_id, aircraft.id);
        assert_eq!(event.org_id, org.id);
        assert_eq!(event.component_id, Some(engine.id));
        assert_eq!(event.origin, EventOrigin::Manual);
    }

    #[test]
    fn test_embedding_dimensions_follow_vector() {
        let target = EmbeddingTarget::MaintenanceEvent(Uuid::new_v4());
        let embedding = Embedding::new(Uuid::new_v4(), target, vec![0.1, 0.2, 0.3, 0.4]);

        assert_eq!(embedding.dimensions, 4);
        assert_eq!(embedding.scope(), EmbeddingScope::MaintenanceEvent);
        assert!(embedding.target.compliance_snapshot_id().is_none());
    }

    #[test]
    fn test_hours_serialize_without_float_rounding() {
        let aircraft = Aircraft::new(Uuid::new_v4(), "N1234");
        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::Repair,
            Utc::now(),
            "Replaced alternator belt",
        )
        .with_hours(
            Decimal::from_str("1234.5").unwrap(),
            Decimal::from_str("1200.3").unwrap(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tachHours"], "1234.5");
        assert_eq!(json["hobbsHours"], "1200.3");

        let back: MaintenanceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.tach_hours, event.tach_hours);
    }
}
