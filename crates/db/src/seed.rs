//! Baseline seed data.
//!
//! Seeding is idempotent: the organization is matched by slug, users by
//! (org, email) and aircraft by (org, tail number). Rows that already exist
//! are left untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logbook_core::fixture::{validate_fixture, FixtureError, SeedFixture};
use sqlx::postgres::PgPool;
use thiserror::Error;
use uuid::Uuid;

/// Fixture path relative to the `logbook_db` crate directory.
pub const DEFAULT_FIXTURE: &str = "fixtures/default-seed.json";

const UPSERT_ORGANIZATION: &str = r#"
INSERT INTO organizations (id, name, slug, timezone)
VALUES ($1, $2, $3, $4)
ON CONFLICT (slug) DO NOTHING
RETURNING id
"#;

const SELECT_ORGANIZATION_ID_BY_SLUG: &str = "SELECT id FROM organizations WHERE slug = $1";

const UPSERT_USER: &str = r#"
INSERT INTO users (id, org_id, email, display_name, role, status)
VALUES ($1, $2, $3, $4, $5::user_role, $6::user_status)
ON CONFLICT (org_id, email) DO NOTHING
"#;

const UPSERT_AIRCRAFT: &str = r#"
INSERT INTO aircraft (id, org_id, tail_number, make, model, serial_number, year)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (org_id, tail_number) DO NOTHING
"#;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read fixture {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error("Seed failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Counts of what a seed run inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub organization_id: Uuid,
    pub organization_created: bool,
    pub users_created: usize,
    pub users_existing: usize,
    pub aircraft_created: usize,
    pub aircraft_existing: usize,
}

/// Reads a fixture file and seeds it.
pub async fn seed_from_path(pool: &PgPool, path: &Path) -> Result<SeedSummary, SeedError> {
    let json = fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let fixture = SeedFixture::from_json(&json)?;

    tracing::info!(
        path = %path.display(),
        organization = %fixture.organization.slug,
        "Seeding fixture"
    );
    seed(pool, &fixture).await
}

/// Seeds a fixture inside one transaction.
pub async fn seed(pool: &PgPool, fixture: &SeedFixture) -> Result<SeedSummary, SeedError> {
    validate_fixture(fixture)?;

    let mut tx = pool.begin().await?;

    let org = fixture.organization.to_organization();
    let inserted: Option<Uuid> = sqlx::query_scalar(UPSERT_ORGANIZATION)
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.slug)
        .bind(&org.timezone)
        .fetch_optional(&mut *tx)
        .await?;

    let (organization_id, organization_created) = match inserted {
        Some(id) => (id, true),
        None => {
            let id: Uuid = sqlx::query_scalar(SELECT_ORGANIZATION_ID_BY_SLUG)
                .bind(&org.slug)
                .fetch_one(&mut *tx)
                .await?;
            (id, false)
        }
    };

    let mut users_created = 0;
    for user in fixture.users.iter().map(|u| u.to_user(organization_id)) {
        let result = sqlx::query(UPSERT_USER)
            .bind(user.id)
            .bind(user.org_id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .execute(&mut *tx)
            .await?;
        users_created += result.rows_affected() as usize;
    }

    let mut aircraft_created = 0;
    for aircraft in fixture.aircraft.iter().map(|a| a.to_aircraft(organization_id)) {
        let result = sqlx::query(UPSERT_AIRCRAFT)
            .bind(aircraft.id)
            .bind(aircraft.org_id)
            .bind(&aircraft.tail_number)
            .bind(&aircraft.make)
            .bind(&aircraft.model)
            .bind(&aircraft.serial_number)
            .bind(aircraft.year)
            .execute(&mut *tx)
            .await?;
        aircraft_created += result.rows_affected() as usize;
    }

    tx.commit().await?;

    let summary = SeedSummary {
        organization_id,
        organization_created,
        users_created,
        users_existing: fixture.users.len() - users_created,
        aircraft_created,
        aircraft_existing: fixture.aircraft.len() - aircraft_created,
    };

    tracing::info!(
        organization_id = %summary.organization_id,
        organization_created = summary.organization_created,
        users_created = summary.users_created,
        aircraft_created = summary.aircraft_created,
        "Seed complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDatabase;
    use logbook_core::maintenance::{UserRole, UserStatus};
    use logbook_core::storage::{FleetRepository, OrganizationRepository, UserRepository};

    fn default_fixture_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_FIXTURE)
    }

    #[test]
    fn test_default_fixture_is_valid() {
        let json = fs::read_to_string(default_fixture_path()).unwrap();
        let fixture = SeedFixture::from_json(&json).unwrap();
        validate_fixture(&fixture).unwrap();

        assert_eq!(fixture.organization.slug, "skyshare");
        assert!(fixture.users.iter().any(|u| u.role == UserRole::Owner));
        assert!(fixture.aircraft.iter().any(|a| a.tail_number == "N9876Q"));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };

        let first = seed_from_path(&db.pool, &default_fixture_path()).await.unwrap();
        assert!(first.organization_created);
        assert_eq!(first.users_created, 3);
        assert_eq!(first.aircraft_created, 2);

        let second = seed_from_path(&db.pool, &default_fixture_path()).await.unwrap();
        assert_eq!(second.organization_id, first.organization_id);
        assert!(!second.organization_created);
        assert_eq!(second.users_created, 0);
        assert_eq!(second.users_existing, 3);
        assert_eq!(second.aircraft_existing, 2);

        let users: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(users, 3);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_seed_leaves_existing_rows_untouched() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };
        let repo = db.repository();

        let json = fs::read_to_string(default_fixture_path()).unwrap();
        let mut fixture = SeedFixture::from_json(&json).unwrap();
        seed(&db.pool, &fixture).await.unwrap();

        fixture.organization.name = "Renamed Aviation".to_string();
        fixture.users[0].display_name = "Someone Else".to_string();
        fixture.users[0].status = Some(UserStatus::Suspended);
        fixture.aircraft[0].year = Some(2020);
        seed(&db.pool, &fixture).await.unwrap();

        let org = repo.get_organization_by_slug("skyshare").await.unwrap().unwrap();
        assert_eq!(org.name, "SkyShare Aviation");
        assert_eq!(org.timezone, "America/Denver");

        let owner = repo
            .get_user_by_email(org.id, "owner@skyshare.aero")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.display_name, "SkyShare Owner");
        assert_eq!(owner.status, UserStatus::Active);

        let aircraft = repo
            .get_aircraft_by_tail_number(org.id, "N9876Q")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(aircraft.year, Some(2014));

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_invalid_fixture_rejected_before_connecting() {
        let pool = PgPool::connect_lazy("postgres://postgres@127.0.0.1:1/unreachable").unwrap();
        let json = fs::read_to_string(default_fixture_path()).unwrap();
        let mut fixture = SeedFixture::from_json(&json).unwrap();
        fixture.users.push(fixture.users[0].clone());

        let err = seed(&pool, &fixture).await.unwrap_err();
        assert!(matches!(
            err,
            SeedError::Fixture(FixtureError::DuplicateEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_fixture_is_read_error() {
        let Some(db) = TestDatabase::create().await else {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        };

        let err = seed_from_path(&db.pool, Path::new("/nonexistent/seed.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));

        db.cleanup().await;
    }
}
