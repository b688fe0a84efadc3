//! PostgreSQL repository implementation.
//!
//! Implements the repository traits from `logbook_core::storage` on a
//! `sqlx::PgPool`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use uuid::Uuid;

use logbook_core::maintenance::{
    validate_aircraft, validate_component, validate_due_item, validate_embedding,
    validate_maintenance_event, validate_organization, validate_user, Aircraft, AuditEntityType, AuditLog, ComplianceSnapshot, Component, Directive, DueItem, Embedding,
    MaintenanceEvent, MaintenanceEventDetails, MaintenanceEventDirective, Organization, Signatory,
    User,
};
use logbook_core::storage::{
    AuditLogRepository, ComplianceRepository, EmbeddingRepository, FleetRepository,
    MaintenanceRepository, OrganizationRepository, RepositoryError, Result, UserRepository,
};

use super::conversions::{
    row_to_aircraft, row_to_audit_log, row_to_component, row_to_compliance_snapshot,
    row_to_directive, row_to_due_item, row_to_embedding, row_to_event_directive,
    row_to_maintenance_event, row_to_organization, row_to_signatory, row_to_user,
};
use super::error::{map_sqlx_error, map_sqlx_error_with_id};
use super::queries;

/// PostgreSQL-based repository implementation.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn get_signatory(&self, id: Uuid) -> Result<Option<Signatory>> {
        sqlx::query(queries::SELECT_SIGNATORY_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_signatory(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Signatory", id.to_string()))
    }

    /// Loads the aircraft a child record is attached to.
    async fn require_aircraft(&self, aircraft_id: Uuid) -> Result<Aircraft> {
        self.get_aircraft(aircraft_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity_type: "Aircraft",
                id: aircraft_id.to_string(),
            })
    }

    async fn get_event_directives(&self, event_id: Uuid) -> Result<Vec<MaintenanceEventDirective>> {
        sqlx::query(queries::SELECT_EVENT_DIRECTIVES)
            .bind(event_id)
            .try_map(|row: PgRow| row_to_event_directive(&row))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "MaintenanceEventDirective"))
    }
}

// ============================================================================
// OrganizationRepository implementation
// ============================================================================

#[async_trait]
impl OrganizationRepository for PgRepository {
    async fn get_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        sqlx::query(queries::SELECT_ORGANIZATION_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_organization(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Organization", id.to_string()))
    }

    async fn get_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        sqlx::query(queries::SELECT_ORGANIZATION_BY_SLUG)
            .bind(slug)
            .try_map(|row: PgRow| row_to_organization(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Organization", slug))
    }

    async fn create_organization(&self, org: &Organization) -> Result<()> {
        validate_organization(org)?;

        sqlx::query(queries::INSERT_ORGANIZATION)
            .bind(org.id)
            .bind(&org.name)
            .bind(&org.slug)
            .bind(&org.timezone)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Organization", &org.slug))?;
        Ok(())
    }
}

// ============================================================================
// UserRepository implementation
// ============================================================================

#[async_trait]
impl UserRepository for PgRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query(queries::SELECT_USER_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_user(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "User", id.to_string()))
    }

    async fn get_user_by_email(&self, org_id: Uuid, email: &str) -> Result<Option<User>> {
        sqlx::query(queries::SELECT_USER_BY_EMAIL)
            .bind(org_id)
            .bind(email)
            .try_map(|row: PgRow| row_to_user(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "User", email))
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        validate_user(user)?;

        sqlx::query(queries::INSERT_USER)
            .bind(user.id)
            .bind(user.org_id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "User", &user.email))?;
        Ok(())
    }
}

// ============================================================================
// FleetRepository implementation
// ============================================================================

#[async_trait]
impl FleetRepository for PgRepository {
    async fn get_aircraft(&self, id: Uuid) -> Result<Option<Aircraft>> {
        sqlx::query(queries::SELECT_AIRCRAFT_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_aircraft(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Aircraft", id.to_string()))
    }

    async fn get_aircraft_by_tail_number(
        &self,
        org_id: Uuid,
        tail_number: &str,
    ) -> Result<Option<Aircraft>> {
        sqlx::query(queries::SELECT_AIRCRAFT_BY_TAIL_NUMBER)
            .bind(org_id)
            .bind(tail_number)
            .try_map(|row: PgRow| row_to_aircraft(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Aircraft", tail_number))
    }

    async fn create_aircraft(&self, aircraft: &Aircraft) -> Result<()> {
        validate_aircraft(aircraft)?;

        sqlx::query(queries::INSERT_AIRCRAFT)
            .bind(aircraft.id)
            .bind(aircraft.org_id)
            .bind(&aircraft.tail_number)
            .bind(&aircraft.make)
            .bind(&aircraft.model)
            .bind(&aircraft.serial_number)
            .bind(aircraft.year)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Aircraft", &aircraft.tail_number))?;
        Ok(())
    }

    async fn get_component(&self, id: Uuid) -> Result<Option<Component>> {
        sqlx::query(queries::SELECT_COMPONENT_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_component(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Component", id.to_string()))
    }

    async fn create_component(&self, component: &Component) -> Result<()> {
        let aircraft = self.require_aircraft(component.aircraft_id).await?;
        validate_component(component, &aircraft)?;

        sqlx::query(queries::INSERT_COMPONENT)
            .bind(component.id)
            .bind(component.org_id)
            .bind(component.aircraft_id)
            .bind(&component.name)
            .bind(component.component_type.as_str())
            .bind(&component.serial_number)
            .bind(&component.manufacturer)
            .bind(&component.model)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Component", component.id.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// MaintenanceRepository implementation
// ============================================================================

#[async_trait]
impl MaintenanceRepository for PgRepository {
    async fn create_signatory(&self, signatory: &Signatory) -> Result<()> {
        sqlx::query(queries::INSERT_SIGNATORY)
            .bind(signatory.id)
            .bind(signatory.org_id)
            .bind(&signatory.full_name)
            .bind(signatory.credential_type.as_str())
            .bind(&signatory.certificate_id)
            .bind(&signatory.email)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Signatory", signatory.id.to_string()))?;
        Ok(())
    }

    async fn create_directive(&self, directive: &Directive) -> Result<()> {
        sqlx::query(queries::INSERT_DIRECTIVE)
            .bind(directive.id)
            .bind(directive.org_id)
            .bind(directive.directive_type.as_str())
            .bind(&directive.reference_code)
            .bind(&directive.title)
            .bind(&directive.applicability)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Directive", &directive.reference_code))?;
        Ok(())
    }

    async fn get_directive(&self, id: Uuid) -> Result<Option<Directive>> {
        sqlx::query(queries::SELECT_DIRECTIVE_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_directive(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Directive", id.to_string()))
    }

    async fn create_maintenance_event(&self, event: &MaintenanceEvent) -> Result<()> {
        let aircraft = self.require_aircraft(event.aircraft_id).await?;
        validate_maintenance_event(event, &aircraft)?;

        sqlx::query(queries::INSERT_MAINTENANCE_EVENT)
            .bind(event.id)
            .bind(event.org_id)
            .bind(event.aircraft_id)
            .bind(event.component_id)
            .bind(event.signatory_id)
            .bind(event.event_type.as_str())
            .bind(event.origin.as_str())
            .bind(event.performed_at)
            .bind(&event.description)
            .bind(&event.corrective_action)
            .bind(event.tach_hours)
            .bind(event.hobbs_hours)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "MaintenanceEvent", event.id.to_string()))?;
        Ok(())
    }

    async fn get_maintenance_event(&self, id: Uuid) -> Result<Option<MaintenanceEvent>> {
        sqlx::query(queries::SELECT_MAINTENANCE_EVENT_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_maintenance_event(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "MaintenanceEvent", id.to_string()))
    }

    async fn link_directive(&self, link: &MaintenanceEventDirective) -> Result<()> {
        let id = format!("{}/{}", link.event_id, link.directive_id);

        let result = sqlx::query(queries::INSERT_EVENT_DIRECTIVE)
            .bind(link.event_id)
            .bind(link.directive_id)
            .bind(link.compliance_status.as_str())
            .bind(&link.notes)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "MaintenanceEventDirective", id))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "MaintenanceEvent",
                id: link.event_id.to_string(),
            });
        }
        Ok(())
    }

    async fn get_maintenance_event_details(
        &self,
        id: Uuid,
    ) -> Result<Option<MaintenanceEventDetails>> {
        let Some(event) = self.get_maintenance_event(id).await? else {
            return Ok(None);
        };

        let component = match event.component_id {
            Some(component_id) => self.get_component(component_id).await?,
            None => None,
        };
        let signatory = match event.signatory_id {
            Some(signatory_id) => self.get_signatory(signatory_id).await?,
            None => None,
        };
        let directives = self.get_event_directives(event.id).await?;

        Ok(Some(MaintenanceEventDetails {
            event,
            component,
            signatory,
            directives,
        }))
    }
}

// ============================================================================
// ComplianceRepository implementation
// ============================================================================

#[async_trait]
impl ComplianceRepository for PgRepository {
    async fn create_compliance_snapshot(&self, snapshot: &ComplianceSnapshot) -> Result<()> {
        sqlx::query(queries::INSERT_COMPLIANCE_SNAPSHOT)
            .bind(snapshot.id)
            .bind(snapshot.org_id)
            .bind(snapshot.aircraft_id)
            .bind(snapshot.as_of)
            .bind(&snapshot.summary)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "ComplianceSnapshot", snapshot.id.to_string()))?;
        Ok(())
    }

    async fn latest_compliance_snapshot(
        &self,
        aircraft_id: Uuid,
    ) -> Result<Option<ComplianceSnapshot>> {
        sqlx::query(queries::SELECT_LATEST_COMPLIANCE_SNAPSHOT)
            .bind(aircraft_id)
            .try_map(|row: PgRow| row_to_compliance_snapshot(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "ComplianceSnapshot"))
    }

    async fn create_due_item(&self, item: &DueItem) -> Result<()> {
        let aircraft = self.require_aircraft(item.aircraft_id).await?;
        validate_due_item(item, &aircraft)?;

        sqlx::query(queries::INSERT_DUE_ITEM)
            .bind(item.id)
            .bind(item.org_id)
            .bind(item.aircraft_id)
            .bind(item.component_id)
            .bind(item.directive_id)
            .bind(item.event_type.as_str())
            .bind(&item.title)
            .bind(item.due_at)
            .bind(item.due_hours)
            .bind(item.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "DueItem", item.id.to_string()))?;
        Ok(())
    }

    async fn list_due_items(
        &self,
        aircraft_id: Uuid,
        before: DateTime<Utc>,
    ) -> Result<Vec<DueItem>> {
        sqlx::query(queries::SELECT_OPEN_DUE_ITEMS)
            .bind(aircraft_id)
            .bind(before)
            .try_map(|row: PgRow| row_to_due_item(&row))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "DueItem"))
    }
}

// ============================================================================
// EmbeddingRepository implementation
// ============================================================================

#[async_trait]
impl EmbeddingRepository for PgRepository {
    async fn create_embedding(&self, embedding: &Embedding) -> Result<()> {
        validate_embedding(embedding)?;

        sqlx::query(queries::INSERT_EMBEDDING)
            .bind(embedding.id)
            .bind(embedding.org_id)
            .bind(embedding.scope().as_str())
            .bind(embedding.target.event_id())
            .bind(embedding.target.compliance_snapshot_id())
            .bind(embedding.dimensions)
            .bind(&embedding.vector)
            .bind(&embedding.model)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "Embedding", embedding.id.to_string()))?;
        Ok(())
    }

    async fn list_embeddings(&self, org_id: Uuid) -> Result<Vec<Embedding>> {
        sqlx::query(queries::SELECT_EMBEDDINGS_BY_ORG)
            .bind(org_id)
            .try_map(|row: PgRow| row_to_embedding(&row))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Embedding"))
    }
}

// ============================================================================
// AuditLogRepository implementation
// ============================================================================

#[async_trait]
impl AuditLogRepository for PgRepository {
    async fn append_audit_log(&self, entry: &AuditLog) -> Result<()> {
        sqlx::query(queries::INSERT_AUDIT_LOG)
            .bind(entry.id)
            .bind(entry.org_id)
            .bind(entry.actor_id)
            .bind(entry.actor_type.as_str())
            .bind(entry.entity_type.as_str())
            .bind(entry.entity_id)
            .bind(entry.action.as_str())
            .bind(&entry.summary)
            .bind(&entry.before)
            .bind(&entry.after)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "AuditLog", entry.id.to_string()))?;
        Ok(())
    }

    async fn get_audit_log(&self, id: Uuid) -> Result<Option<AuditLog>> {
        sqlx::query(queries::SELECT_AUDIT_LOG_BY_ID)
            .bind(id)
            .try_map(|row: PgRow| row_to_audit_log(&row))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error_with_id(e, "AuditLog", id.to_string()))
    }

    async fn list_audit_logs_for_entity(
        &self,
        entity_type: AuditEntityType,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLog>> {
        sqlx::query(queries::SELECT_AUDIT_LOGS_FOR_ENTITY)
            .bind(entity_type.as_str())
            .bind(entity_id)
            .try_map(|row: PgRow| row_to_audit_log(&row))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "AuditLog"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDatabase;
    use chrono::TimeZone;
    use logbook_core::maintenance::{
        ActorType, AuditAction, ComplianceStatus, ComponentType, CredentialType, DirectiveType,
        DueItemStatus, EmbeddingTarget, MaintenanceEventType, UserRole,
    };
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    /// An organization with one aircraft, stored.
    async fn create_fleet(repo: &PgRepository) -> (Organization, Aircraft) {
        let org = Organization::new("SkyShare Aviation", "skyshare").with_timezone("America/Denver");
        repo.create_organization(&org).await.unwrap();

        let aircraft = Aircraft::new(org.id, "N9876Q")
            .with_make_model("Piper", "PA-46")
            .with_serial_number("PA46-001")
            .with_year(2014);
        repo.create_aircraft(&aircraft).await.unwrap();

        (org, aircraft)
    }

    fn performed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_aircraft_rejected() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, _) = create_fleet(&repo).await;

        let duplicate = Aircraft::new(org.id, "N9876Q");
        let err = repo.create_aircraft(&duplicate).await.unwrap_err();

        assert_eq!(
            err,
            RepositoryError::AlreadyExists {
                entity_type: "Aircraft",
                id: "N9876Q".to_string(),
            }
        );

        // The same tail number is fine in another organization.
        let other = Organization::new("Other Club", "other-club");
        repo.create_organization(&other).await.unwrap();
        repo.create_aircraft(&Aircraft::new(other.id, "N9876Q"))
            .await
            .unwrap();

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, _) = create_fleet(&repo).await;

        let owner = User::new(org.id, "owner@skyshare.aero", "Owner", UserRole::Owner);
        repo.create_user(&owner).await.unwrap();

        let again = User::new(org.id, "owner@skyshare.aero", "Other", UserRole::Viewer);
        let err = repo.create_user(&again).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::AlreadyExists {
                entity_type: "User",
                ..
            }
        ));

        let found = repo
            .get_user_by_email(org.id, "owner@skyshare.aero")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, owner);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_maintenance_event_details_include_relations() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, aircraft) = create_fleet(&repo).await;

        let engine = Component::new(&aircraft, "Left Engine", ComponentType::Engine)
            .with_serial_number("LIO-540-001")
            .with_manufacturer_model("Lycoming", "IO-540");
        repo.create_component(&engine).await.unwrap();

        let ia = Signatory::new(org.id, "Jordan Wrench", CredentialType::Ia, "123456789")
            .with_email("jordan@example.com");
        repo.create_signatory(&ia).await.unwrap();

        let directive = Directive::new(
            org.id,
            DirectiveType::AirworthinessDirective,
            "AD 2024-01-01",
            "Example AD for testing",
        )
        .with_applicability(json!({ "aircraft": ["PA-46"], "engines": ["IO-540"] }));
        repo.create_directive(&directive).await.unwrap();

        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::AdCompliance,
            performed_at(),
            "Complied with AD 2024-01-01",
        )
        .with_component(&engine)
        .signed_by(&ia)
        .with_hours(
            Decimal::from_str("1234.5").unwrap(),
            Decimal::from_str("1200.3").unwrap(),
        );
        repo.create_maintenance_event(&event).await.unwrap();

        let link = MaintenanceEventDirective::new(&event, &directive, ComplianceStatus::Complied)
            .with_notes("Verified by IA");
        repo.link_directive(&link).await.unwrap();

        let details = repo
            .get_maintenance_event_details(event.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(details.event, event);
        assert_eq!(details.directives, vec![link]);
        assert_eq!(details.component, Some(engine));
        let signatory = details.signatory.unwrap();
        assert_eq!(signatory.full_name, "Jordan Wrench");
        assert_eq!(signatory.credential_type, CredentialType::Ia);

        let stored = repo.get_directive(directive.id).await.unwrap().unwrap();
        assert_eq!(stored.applicability["engines"][0], "IO-540");

        assert!(repo
            .get_maintenance_event_details(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_decimal_hours_round_trip_exactly() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (_, aircraft) = create_fleet(&repo).await;

        let tach = Decimal::from_str("1234.5").unwrap();
        let hobbs = Decimal::from_str("0.1").unwrap();
        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::Inspection,
            performed_at(),
            "Annual inspection",
        )
        .with_hours(tach, hobbs);
        repo.create_maintenance_event(&event).await.unwrap();

        let stored = repo.get_maintenance_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.tach_hours, Some(tach));
        assert_eq!(stored.hobbs_hours, Some(hobbs));
        assert_eq!(stored.tach_hours.unwrap().to_string(), "1234.5");

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_hours_with_extra_precision_rejected_before_insert() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (_, aircraft) = create_fleet(&repo).await;

        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::Inspection,
            performed_at(),
            "Annual inspection",
        )
        .with_hours(
            Decimal::from_str("1234.56").unwrap(),
            Decimal::from_str("0.04").unwrap(),
        );
        let err = repo.create_maintenance_event(&event).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::InvalidData(
                "tach_hours allows at most one decimal place, got 1234.56".to_string()
            )
        );
        assert!(repo.get_maintenance_event(event.id).await.unwrap().is_none());

        let item = DueItem::new(
            &aircraft,
            MaintenanceEventType::Other,
            "Oil change",
            performed_at(),
        )
        .with_due_hours(Decimal::from_str("1284.55").unwrap());
        let err = repo.create_due_item(&item).await.unwrap_err();
        assert!(
            matches!(&err, RepositoryError::InvalidData(msg) if msg.starts_with("due_hours")),
            "unexpected error: {err:?}"
        );
        let before = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(repo.list_due_items(aircraft.id, before).await.unwrap().is_empty());

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_child_of_missing_aircraft_is_not_found() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, _) = create_fleet(&repo).await;

        let unsaved = Aircraft::new(org.id, "N1234X");
        let component = Component::new(&unsaved, "Magneto", ComponentType::Appliance);
        let err = repo.create_component(&component).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::NotFound {
                entity_type: "Aircraft",
                id: unsaved.id.to_string(),
            }
        );

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_child_with_mismatched_organization_rejected() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (_, aircraft) = create_fleet(&repo).await;

        let other = Organization::new("Other Club", "other-club");
        repo.create_organization(&other).await.unwrap();

        let mut component = Component::new(&aircraft, "Propeller", ComponentType::Propeller);
        component.org_id = other.id;
        let err = repo.create_component(&component).await.unwrap_err();
        assert!(
            matches!(&err, RepositoryError::InvalidData(msg) if msg.starts_with("Component belongs to organization")),
            "unexpected error: {err:?}"
        );
        assert!(repo.get_component(component.id).await.unwrap().is_none());

        let foreign_directive = Directive::new(
            other.id,
            DirectiveType::ServiceBulletin,
            "SB 1",
            "Foreign bulletin",
        );
        repo.create_directive(&foreign_directive).await.unwrap();
        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::ServiceBulletin,
            performed_at(),
            "Bulletin work",
        );
        repo.create_maintenance_event(&event).await.unwrap();

        let link = MaintenanceEventDirective::new(&event, &foreign_directive, ComplianceStatus::Complied);
        let err = repo.link_directive(&link).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_link_directive_for_missing_event_is_not_found() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, aircraft) = create_fleet(&repo).await;

        let directive = Directive::new(org.id, DirectiveType::ServiceLetter, "SL 7", "Letter");
        repo.create_directive(&directive).await.unwrap();
        let unsaved = MaintenanceEvent::new(&aircraft, MaintenanceEventType::Other, performed_at(), "x");

        let link = MaintenanceEventDirective::new(&unsaved, &directive, ComplianceStatus::Pending);
        let err = repo.link_directive(&link).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::NotFound {
                entity_type: "MaintenanceEvent",
                ..
            }
        ));

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_embeddings_target_exactly_one_record() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, aircraft) = create_fleet(&repo).await;

        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::Inspection,
            performed_at(),
            "Annual inspection",
        );
        repo.create_maintenance_event(&event).await.unwrap();
        let snapshot = ComplianceSnapshot::new(
            &aircraft,
            performed_at(),
            json!({ "overdue": [], "complied": ["AD 2024-01-01"] }),
        );
        repo.create_compliance_snapshot(&snapshot).await.unwrap();

        let for_event = Embedding::new(
            org.id,
            EmbeddingTarget::MaintenanceEvent(event.id),
            vec![0.1, 0.2, 0.3, 0.4],
        )
        .with_model("text-embedding-test");
        let for_snapshot = Embedding::new(
            org.id,
            EmbeddingTarget::ComplianceSnapshot(snapshot.id),
            vec![0.05, 0.1, 0.15, 0.2],
        );
        repo.create_embedding(&for_event).await.unwrap();
        repo.create_embedding(&for_snapshot).await.unwrap();

        let stored = repo.list_embeddings(org.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.contains(&for_event));
        assert!(stored.contains(&for_snapshot));

        // The typed API cannot express these rows, so insert them directly.
        let insert = r#"
            INSERT INTO embeddings (org_id, scope, target_event_id, target_compliance_snapshot_id, dimensions, vector)
            VALUES ($1, 'MAINTENANCE_EVENT', $2, $3, 1, ARRAY[0.5]::real[])
        "#;
        for (event_id, snapshot_id) in [(Some(event.id), Some(snapshot.id)), (None, None)] {
            let err = sqlx::query(insert)
                .bind(org.id)
                .bind(event_id)
                .bind(snapshot_id)
                .execute(&db.pool)
                .await
                .unwrap_err();
            assert!(matches!(
                map_sqlx_error(err, "Embedding"),
                RepositoryError::InvalidData(_)
            ));
        }

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_latest_snapshot_and_due_items() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (_, aircraft) = create_fleet(&repo).await;

        let older = ComplianceSnapshot::new(
            &aircraft,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            json!({ "overdue": ["AD 2023-02-02"] }),
        );
        let newer = ComplianceSnapshot::new(&aircraft, performed_at(), json!({ "overdue": [] }));
        repo.create_compliance_snapshot(&newer).await.unwrap();
        repo.create_compliance_snapshot(&older).await.unwrap();

        let latest = repo
            .latest_compliance_snapshot(aircraft.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest, newer);

        let annual = DueItem::new(
            &aircraft,
            MaintenanceEventType::Inspection,
            "Next annual due",
            Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap(),
        );
        let oil = DueItem::new(
            &aircraft,
            MaintenanceEventType::Other,
            "Oil change",
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        )
        .with_due_hours(Decimal::from_str("1284.5").unwrap());
        let mut done = DueItem::new(
            &aircraft,
            MaintenanceEventType::Repair,
            "Fixed already",
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        done.status = DueItemStatus::Completed;
        let far = DueItem::new(
            &aircraft,
            MaintenanceEventType::Inspection,
            "Far future",
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        );
        for item in [&annual, &oil, &done, &far] {
            repo.create_due_item(item).await.unwrap();
        }

        let before = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let due = repo.list_due_items(aircraft.id, before).await.unwrap();
        assert_eq!(due, vec![oil, annual]);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_audit_logs_are_append_only() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();
        let (org, aircraft) = create_fleet(&repo).await;

        let actor = User::new(org.id, "ia@skyshare.aero", "Jordan Wrench", UserRole::Mechanic);
        repo.create_user(&actor).await.unwrap();

        let event = MaintenanceEvent::new(
            &aircraft,
            MaintenanceEventType::AdCompliance,
            performed_at(),
            "Complied with AD 2024-01-01",
        );
        repo.create_maintenance_event(&event).await.unwrap();

        let entry = AuditLog::new(
            org.id,
            ActorType::User,
            AuditEntityType::MaintenanceEvent,
            event.id,
            AuditAction::Created,
        )
        .by_actor(actor.id)
        .with_summary("Created AD compliance event")
        .with_snapshots(None, Some(json!({ "description": event.description })));
        repo.append_audit_log(&entry).await.unwrap();

        let stored = repo.get_audit_log(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.entity_type, AuditEntityType::MaintenanceEvent);
        assert_eq!(stored.actor_id, Some(actor.id));
        assert_eq!(stored.after, entry.after);

        let history = repo
            .list_audit_logs_for_entity(AuditEntityType::MaintenanceEvent, event.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        let err = sqlx::query("UPDATE audit_logs SET summary = 'tampered' WHERE id = $1")
            .bind(entry.id)
            .execute(&db.pool)
            .await
            .unwrap_err();
        assert!(matches!(
            map_sqlx_error(err, "AuditLog"),
            RepositoryError::InvalidData(_)
        ));

        let unchanged = repo.get_audit_log(entry.id).await.unwrap().unwrap();
        assert_eq!(unchanged.summary.as_deref(), Some("Created AD compliance event"));

        db.cleanup().await;
    }
}
