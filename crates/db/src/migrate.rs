//! Applying migrations.
//!
//! Sequence: compose the schema, expose `migrations/` at the generated
//! location, apply pending migrations, then regenerate offline query data.
//! Each step is awaited before the next; the first failure stops the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sqlx::migrate::Migrator;
use thiserror::Error;
use tokio::process::Command;

use crate::compose::{compose_schema, ComposeError, GENERATED_DIR};
use crate::config::{DatabaseConfig, DatabaseConfigError};

pub const MIGRATIONS_DIR: &str = "migrations";

const PREPARE_PROGRAM: &str = "cargo";
const PREPARE_ARGS: [&str; 3] = ["sqlx", "prepare", "--workspace"];

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("DATABASE_URL is required to apply migrations.")]
    MissingDatabaseUrl,
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error("Failed to expose {target} at {link}: {source}")]
    Link {
        target: PathBuf,
        link: PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    Connect(#[from] DatabaseConfigError),
    #[error("Failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to start `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("`{command}` failed with {}", describe_exit(.code))]
    CommandFailed { command: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;

/// Inputs to [`apply_migrations`].
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub database_url: Option<String>,
    /// Skip regenerating offline query data after migrating.
    pub skip_generate: bool,
    /// The `logbook_db` crate directory (holds `schema/` and `migrations/`).
    pub root: PathBuf,
    /// Directory `cargo sqlx prepare --workspace` runs in.
    pub workspace_root: PathBuf,
}

impl MigrationOptions {
    pub fn new(database_url: Option<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            database_url,
            skip_generate: false,
            workspace_root: root.clone(),
            root,
        }
    }

    pub fn with_skip_generate(mut self, skip_generate: bool) -> Self {
        self.skip_generate = skip_generate;
        self
    }

    pub fn with_workspace_root(mut self, workspace_root: impl Into<PathBuf>) -> Self {
        self.workspace_root = workspace_root.into();
        self
    }

    /// Where the migrator reads from.
    pub fn generated_migrations_dir(&self) -> PathBuf {
        self.root.join(GENERATED_DIR).join(MIGRATIONS_DIR)
    }
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub schema_path: PathBuf,
    pub migrations_dir: PathBuf,
    pub link: LinkKind,
    /// Migrations known to the migrator, applied or already present.
    pub migration_count: usize,
    pub generated: bool,
}

/// How the generated migrations directory was materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Symlink,
    Copy,
}

/// Applies pending migrations to the database named by `options`.
pub async fn apply_migrations(options: &MigrationOptions) -> Result<MigrationReport> {
    let database_url = options
        .database_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(MigrateError::MissingDatabaseUrl)?;

    let config = DatabaseConfig::new(database_url);
    tracing::info!(database = %config.redacted_url(), "Applying migrations");

    let composed = compose_schema(&options.root)?;

    let source = options.root.join(MIGRATIONS_DIR);
    let migrations_dir = options.generated_migrations_dir();
    let link = link_or_copy(&source, &migrations_dir)?;

    let migrator = Migrator::new(migrations_dir.as_path()).await?;
    let migration_count = migrator.iter().count();

    let pool = config.connect().await?;
    let run = migrator.run(&pool).await;
    pool.close().await;
    run?;
    tracing::info!(migrations = migration_count, "Database is up to date");

    let generated = if options.skip_generate {
        tracing::info!("Skipping offline query data generation");
        false
    } else {
        prepare_offline_data(database_url, &options.workspace_root).await?;
        true
    };

    Ok(MigrationReport {
        schema_path: composed.path,
        migrations_dir,
        link,
        migration_count,
        generated,
    })
}

/// Runs `cargo sqlx prepare --workspace` against the migrated database.
async fn prepare_offline_data(database_url: &str, workspace_root: &Path) -> Result<()> {
    let command = format!("{PREPARE_PROGRAM} {}", PREPARE_ARGS.join(" "));
    tracing::info!(command = %command, "Generating offline query data");

    let status = Command::new(PREPARE_PROGRAM)
        .args(PREPARE_ARGS)
        .env("DATABASE_URL", database_url)
        .current_dir(workspace_root)
        .status()
        .await
        .map_err(|source| MigrateError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !status.success() {
        return Err(MigrateError::CommandFailed {
            command,
            code: status.code(),
        });
    }
    Ok(())
}

/// Points `link` at `target`, replacing whatever is there. Falls back to a
/// recursive copy when the platform refuses the symlink.
pub fn link_or_copy(target: &Path, link: &Path) -> Result<LinkKind> {
    link_or_copy_with(target, link, symlink_dir)
}

fn link_or_copy_with<F>(target: &Path, link: &Path, make_link: F) -> Result<LinkKind>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let link_err = |source: io::Error| MigrateError::Link {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source,
    };

    remove_existing(link).map_err(link_err)?;
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).map_err(link_err)?;
    }

    let absolute_target = target.canonicalize().map_err(link_err)?;
    match make_link(&absolute_target, link) {
        Ok(()) => Ok(LinkKind::Symlink),
        Err(err) => {
            tracing::warn!(
                error = %err,
                link = %link.display(),
                "Symlink failed, copying migrations instead"
            );
            copy_dir_recursive(&absolute_target, link).map_err(link_err)?;
            Ok(LinkKind::Copy)
        }
    }
}

fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink_dir(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), dest)?;
        }
    }
    Ok(())
}
