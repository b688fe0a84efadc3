//! Schema composition, migrations and seed data.

mod error;

pub use error::{DbError, Result};

use std::path::{Path, PathBuf};

use dialoguer::Confirm;
use logbook_db::config::{is_local_url, redact_url, DATABASE_URL_VAR};
use logbook_db::migrate::LinkKind;
use logbook_db::{
    apply_migrations, compose_schema, seed_from_path, DatabaseConfig, MigrationOptions,
    SeedSummary, DEFAULT_FIXTURE,
};

use crate::prelude::*;

/// Database schema and data tasks.
#[derive(Debug, clap::Parser)]
pub struct DbCommand {
    #[command(subcommand)]
    pub action: DbAction,
}

#[derive(Debug, clap::Subcommand)]
pub enum DbAction {
    /// Validate the schema fragments and write the generated schema.
    Compose,

    /// Apply pending migrations to DATABASE_URL.
    Migrate(MigrateCommand),

    /// Load the baseline fixture (organization, users, aircraft).
    Seed(SeedCommand),
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Apply pending migrations.

Composes crates/db/schema/fragments into crates/db/schema/.generated/schema.sql,
links the migrations into the generated directory, applies every pending
migration and refreshes the offline query data with `cargo sqlx prepare`.

Migrating a database that is not on localhost asks for confirmation.

Environment variables:
  DATABASE_URL    - Target database (required)")]
pub struct MigrateCommand {
    /// Target database.
    #[arg(long, env = DATABASE_URL_VAR, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Do not run `cargo sqlx prepare` after migrating.
    #[arg(long)]
    pub skip_generate: bool,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, clap::Parser)]
#[command(long_about = "Seed baseline data.

Upserts the organization by slug, users by (organization, email) and aircraft
by (organization, tail number). Rows that already exist are left untouched, so
the command can be run repeatedly.

Environment variables:
  DATABASE_URL               - Target database (required)
  DATABASE_LOG_QUERIES       - Log every statement (default: false)
  DATABASE_MAX_CONNECTIONS   - Pool size (default: 5)")]
pub struct SeedCommand {
    /// Fixture to load (defaults to crates/db/fixtures/default-seed.json).
    #[arg(long, value_name = "PATH")]
    pub fixture: Option<PathBuf>,
}

/// Main entry point for db command.
pub async fn run(command: DbCommand, global: crate::Global) -> Result<()> {
    match command.action {
        DbAction::Compose => run_compose(&global),
        DbAction::Migrate(cmd) => run_migrate(cmd, &global).await,
        DbAction::Seed(cmd) => run_seed(cmd, &global).await,
    }
}

fn run_compose(global: &crate::Global) -> Result<()> {
    let composed = compose_schema(&db_crate_dir())?;

    if !global.is_silent() {
        aprintln!("{}", p_c("Fragments:"));
        for fragment in &composed.fragments {
            aprintln!("  {}", fragment);
        }
        aprintln!();
        aprintln!(
            "{} {} tables written to {}",
            p_g("Composed:"),
            composed.tables.len(),
            composed.path.display()
        );
    }

    Ok(())
}

async fn run_migrate(cmd: MigrateCommand, global: &crate::Global) -> Result<()> {
    if let Some(url) = cmd.database_url.as_deref() {
        if !global.is_silent() {
            aprintln!("{} {}", p_b("Target:"), redact_url(url));
            aprintln!();
        }

        if !cmd.force && !is_local_url(url) {
            let confirmed = Confirm::new()
                .with_prompt("This database is not local. Apply migrations?")
                .default(false)
                .interact()
                .map_err(|e| DbError::Prompt(e.to_string()))?;

            if !confirmed {
                return Err(DbError::UserCancelled);
            }
        }
    }

    let options = MigrationOptions::new(cmd.database_url, db_crate_dir())
        .with_skip_generate(cmd.skip_generate)
        .with_workspace_root(workspace_root());

    let report = apply_migrations(&options).await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Schema:"), report.schema_path.display());
        aprintln!(
            "{} {} ({})",
            p_b("Migrations:"),
            report.migrations_dir.display(),
            match report.link {
                LinkKind::Symlink => "symlink",
                LinkKind::Copy => "copy",
            }
        );
        if !report.generated {
            aprintln!("{} {}", p_y("⚠️"), "Skipped `cargo sqlx prepare`");
        }
        aprintln!(
            "{} {} migrations up to date",
            p_g("Success:"),
            report.migration_count
        );
    }

    Ok(())
}

async fn run_seed(cmd: SeedCommand, global: &crate::Global) -> Result<()> {
    let fixture = cmd
        .fixture
        .unwrap_or_else(|| db_crate_dir().join(DEFAULT_FIXTURE));

    let summary = seed_fixture(|name| std::env::var(name).ok(), &fixture, global)
        .await
        .inspect_err(|err| {
            tracing::error!(error = %err, fixture = %fixture.display(), "Seed failed");
        })?;

    if !global.is_silent() {
        aprintln!(
            "{} organization {} ({})",
            p_g("Seeded:"),
            summary.organization_id,
            if summary.organization_created {
                "created"
            } else {
                "existing"
            }
        );
        aprintln!(
            "  users: {} created, {} existing",
            summary.users_created,
            summary.users_existing
        );
        aprintln!(
            "  aircraft: {} created, {} existing",
            summary.aircraft_created,
            summary.aircraft_existing
        );
    }

    Ok(())
}

/// Resolves the database, connects and seeds. The pool is closed on every path.
async fn seed_fixture<F>(lookup: F, fixture: &Path, global: &crate::Global) -> Result<SeedSummary>
where
    F: Fn(&str) -> Option<String>,
{
    let config = DatabaseConfig::from_lookup(lookup)?;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), config.redacted_url());
        aprintln!("{} {}", p_b("Fixture:"), fixture.display());
        aprintln!();
    }

    let pool = config.connect().await?;
    let result = seed_from_path(&pool, fixture).await;
    pool.close().await;

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logbook_db::DatabaseConfigError;

    fn silent() -> crate::Global {
        crate::Global {
            silent: true,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_seed_without_database_url_is_config_error() {
        let err = seed_fixture(|_| None, Path::new("seed.json"), &silent())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Config(DatabaseConfigError::MissingUrl)
        ));
    }

    #[tokio::test]
    async fn test_seed_with_malformed_url_is_config_error() {
        let lookup = |name: &str| (name == DATABASE_URL_VAR).then(|| "not a url".to_string());
        let err = seed_fixture(lookup, Path::new("seed.json"), &silent())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Config(DatabaseConfigError::InvalidUrl(_))
        ));
    }
}
