//! Throwaway databases for database-backed tests.
//!
//! Tests call [`TestDatabase::create`] and skip themselves when it returns
//! `None` (no `TEST_DATABASE_URL`). Each test gets its own database so tests
//! can run in parallel against one server.

use std::path::Path;

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPool;
use url::Url;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::repository::PgRepository;

pub const TEST_DATABASE_URL_VAR: &str = "TEST_DATABASE_URL";

pub struct TestDatabase {
    pub pool: PgPool,
    pub url: String,
    name: String,
    admin_url: String,
}

impl TestDatabase {
    /// Creates a uniquely named database with all migrations applied.
    pub async fn create() -> Option<Self> {
        let db = Self::create_empty().await?;
        let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        Migrator::new(migrations.as_path())
            .await
            .expect("migrations should load")
            .run(&db.pool)
            .await
            .expect("migrations should apply");
        Some(db)
    }

    /// Creates a uniquely named database with no schema.
    pub async fn create_empty() -> Option<Self> {
        let admin_url = std::env::var(TEST_DATABASE_URL_VAR).ok()?;
        let name = format!("logbook_test_{}", Uuid::new_v4().simple());

        let admin = DatabaseConfig::new(&admin_url)
            .connect()
            .await
            .expect("TEST_DATABASE_URL should be reachable");
        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&admin)
            .await
            .expect("test database should be created");
        admin.close().await;

        let mut url = Url::parse(&admin_url).expect("TEST_DATABASE_URL should be a URL");
        url.set_path(&format!("/{name}"));
        let url = url.to_string();

        let pool = DatabaseConfig::new(&url)
            .connect()
            .await
            .expect("test database should be reachable");

        Some(Self {
            pool,
            url,
            name,
            admin_url,
        })
    }

    pub fn repository(&self) -> PgRepository {
        PgRepository::new(self.pool.clone())
    }

    /// Closes the pool and drops the database.
    pub async fn cleanup(self) {
        self.pool.close().await;

        let Ok(admin) = DatabaseConfig::new(&self.admin_url).connect().await else {
            eprintln!("Could not reconnect to drop {}", self.name);
            return;
        };
        let drop = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name);
        if let Err(err) = sqlx::query(&drop).execute(&admin).await {
            eprintln!("Failed to drop {}: {err}", self.name);
        }
        admin.close().await;
    }
}
