//! PostgreSQL row conversion functions.
//!
//! Enum columns are selected as `::text` and parsed with the domain enum's
//! `FromStr`, so these functions only depend on column names. The pure
//! helpers are testable without a database.

use std::str::FromStr;

use logbook_core::maintenance::{
    Aircraft, AuditLog, ComplianceSnapshot, Component, Directive, DueItem, Embedding,
    EmbeddingScope, EmbeddingTarget, MaintenanceEvent, MaintenanceEventDirective, Organization,
    Signatory, UnknownVariant, User,
};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

// ============================================================================
// Tenancy conversions
// ============================================================================

/// Expected columns: id, name, slug, timezone
pub fn row_to_organization(row: &PgRow) -> sqlx::Result<Organization> {
    Ok(Organization {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        timezone: row.try_get("timezone")?,
    })
}

/// Expected columns: id, org_id, email, display_name, role, status
pub fn row_to_user(row: &PgRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        role: get_label(row, "role")?,
        status: get_label(row, "status")?,
    })
}

// ============================================================================
// Fleet conversions
// ============================================================================

pub fn row_to_aircraft(row: &PgRow) -> sqlx::Result<Aircraft> {
    Ok(Aircraft {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        tail_number: row.try_get("tail_number")?,
        make: row.try_get("make")?,
        model: row.try_get("model")?,
        serial_number: row.try_get("serial_number")?,
        year: row.try_get("year")?,
    })
}

/// Expected columns: id, org_id, aircraft_id, name, type, serial_number, manufacturer, model
pub fn row_to_component(row: &PgRow) -> sqlx::Result<Component> {
    Ok(Component {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        aircraft_id: row.try_get("aircraft_id")?,
        name: row.try_get("name")?,
        component_type: get_label(row, "type")?,
        serial_number: row.try_get("serial_number")?,
        manufacturer: row.try_get("manufacturer")?,
        model: row.try_get("model")?,
    })
}

// ============================================================================
// Maintenance conversions
// ============================================================================

pub fn row_to_signatory(row: &PgRow) -> sqlx::Result<Signatory> {
    Ok(Signatory {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        full_name: row.try_get("full_name")?,
        credential_type: get_label(row, "credential_type")?,
        certificate_id: row.try_get("certificate_id")?,
        email: row.try_get("email")?,
    })
}

pub fn row_to_directive(row: &PgRow) -> sqlx::Result<Directive> {
    Ok(Directive {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        directive_type: get_label(row, "directive_type")?,
        reference_code: row.try_get("reference_code")?,
        title: row.try_get("title")?,
        applicability: row.try_get("applicability")?,
    })
}

pub fn row_to_maintenance_event(row: &PgRow) -> sqlx::Result<MaintenanceEvent> {
    Ok(MaintenanceEvent {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        aircraft_id: row.try_get("aircraft_id")?,
        component_id: row.try_get("component_id")?,
        signatory_id: row.try_get("signatory_id")?,
        event_type: get_label(row, "event_type")?,
        origin: get_label(row, "origin")?,
        performed_at: row.try_get("performed_at")?,
        description: row.try_get("description")?,
        corrective_action: row.try_get("corrective_action")?,
        tach_hours: row.try_get("tach_hours")?,
        hobbs_hours: row.try_get("hobbs_hours")?,
    })
}

/// Expected columns: event_id, directive_id, compliance_status, notes
pub fn row_to_event_directive(row: &PgRow) -> sqlx::Result<MaintenanceEventDirective> {
    Ok(MaintenanceEventDirective {
        event_id: row.try_get("event_id")?,
        directive_id: row.try_get("directive_id")?,
        compliance_status: get_label(row, "compliance_status")?,
        notes: row.try_get("notes")?,
    })
}

// ============================================================================
// Compliance conversions
// ============================================================================

pub fn row_to_compliance_snapshot(row: &PgRow) -> sqlx::Result<ComplianceSnapshot> {
    Ok(ComplianceSnapshot {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        aircraft_id: row.try_get("aircraft_id")?,
        as_of: row.try_get("as_of")?,
        summary: row.try_get("summary")?,
    })
}

pub fn row_to_due_item(row: &PgRow) -> sqlx::Result<DueItem> {
    Ok(DueItem {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        aircraft_id: row.try_get("aircraft_id")?,
        component_id: row.try_get("component_id")?,
        directive_id: row.try_get("directive_id")?,
        event_type: get_label(row, "event_type")?,
        title: row.try_get("title")?,
        due_at: row.try_get("due_at")?,
        due_hours: row.try_get("due_hours")?,
        status: get_label(row, "status")?,
    })
}

/// Expected columns: id, org_id, scope, target_event_id,
/// target_compliance_snapshot_id, dimensions, vector, model
pub fn row_to_embedding(row: &PgRow) -> sqlx::Result<Embedding> {
    let scope: EmbeddingScope = get_label(row, "scope")?;
    let target = embedding_target(
        scope,
        row.try_get("target_event_id")?,
        row.try_get("target_compliance_snapshot_id")?,
    )
    .map_err(|reason| sqlx::Error::ColumnDecode {
        index: "scope".to_string(),
        source: reason.into(),
    })?;

    Ok(Embedding {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        target,
        dimensions: row.try_get("dimensions")?,
        vector: row.try_get("vector")?,
        model: row.try_get("model")?,
    })
}

// ============================================================================
// Audit conversions
// ============================================================================

pub fn row_to_audit_log(row: &PgRow) -> sqlx::Result<AuditLog> {
    Ok(AuditLog {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        actor_id: row.try_get("actor_id")?,
        actor_type: get_label(row, "actor_type")?,
        entity_type: get_label(row, "entity_type")?,
        entity_id: row.try_get("entity_id")?,
        action: get_label(row, "action")?,
        summary: row.try_get("summary")?,
        before: row.try_get("before")?,
        after: row.try_get("after")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

fn get_label<T>(row: &PgRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let label: String = row.try_get(column)?;
    parse_label(column, &label)
}

/// Parses an enum label, reporting the column on failure.
pub fn parse_label<T>(column: &str, label: &str) -> sqlx::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    label.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Rebuilds an embedding target from its scope and the two nullable columns.
pub fn embedding_target(
    scope: EmbeddingScope,
    event_id: Option<Uuid>,
    snapshot_id: Option<Uuid>,
) -> Result<EmbeddingTarget, String> {
    match (scope, event_id, snapshot_id) {
        (EmbeddingScope::MaintenanceEvent, Some(id), None) => {
            Ok(EmbeddingTarget::MaintenanceEvent(id))
        }
        (EmbeddingScope::ComplianceSnapshot, None, Some(id)) => {
            Ok(EmbeddingTarget::ComplianceSnapshot(id))
        }
        (scope, event_id, snapshot_id) => Err(format!(
            "embedding scope {scope} does not match targets (event: {event_id:?}, snapshot: {snapshot_id:?})"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logbook_core::maintenance::{ComplianceStatus, UserRole};

    #[test]
    fn test_parse_label() {
        let role: UserRole = parse_label("role", "MECHANIC").unwrap();
        assert_eq!(role, UserRole::Mechanic);

        let status: ComplianceStatus = parse_label("compliance_status", "NOT_APPLICABLE").unwrap();
        assert_eq!(status, ComplianceStatus::NotApplicable);
    }

    #[test]
    fn test_parse_label_unknown_names_column() {
        let err = parse_label::<UserRole>("role", "CAPTAIN").unwrap_err();
        match err {
            sqlx::Error::ColumnDecode { index, source } => {
                assert_eq!(index, "role");
                assert_eq!(source.to_string(), "Unknown user_role value: CAPTAIN");
            }
            other => panic!("Expected ColumnDecode, got {other:?}"),
        }
    }

    #[test]
    fn test_embedding_target_requires_exactly_one_matching_id() {
        let id = Uuid::new_v4();

        assert_eq!(
            embedding_target(EmbeddingScope::MaintenanceEvent, Some(id), None),
            Ok(EmbeddingTarget::MaintenanceEvent(id))
        );
        assert_eq!(
            embedding_target(EmbeddingScope::ComplianceSnapshot, None, Some(id)),
            Ok(EmbeddingTarget::ComplianceSnapshot(id))
        );
        assert!(embedding_target(EmbeddingScope::MaintenanceEvent, None, Some(id)).is_err());
        assert!(embedding_target(EmbeddingScope::MaintenanceEvent, Some(id), Some(id)).is_err());
        assert!(embedding_target(EmbeddingScope::ComplianceSnapshot, None, None).is_err());
    }
}
