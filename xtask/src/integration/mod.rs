//! Database-backed integration tests.

mod error;

pub use error::{IntegrationError, Result};

use std::time::Duration;

use crate::containers::{
    detect_runtime, is_running, postgres_url, start_container, stop_container, wait_for_health,
    ContainerRuntime, POSTGRES_SPEC,
};
use crate::prelude::*;

const TEST_DATABASE_URL_VAR: &str = "TEST_DATABASE_URL";

/// Crates whose tests need a live database.
const DATABASE_TEST_PACKAGES: &[&str] = &["logbook_db"];

/// Run integration tests against PostgreSQL.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Run the database-backed test suites.

Starts a throwaway postgres:16-alpine container, points TEST_DATABASE_URL at
it and runs `cargo test` for the database crates. Every test creates and drops
its own database on that server. The container is removed afterwards, even
when tests fail.

Examples:
  cargo xtask integration                    # Start a container and run tests
  cargo xtask integration --keep-container   # Leave the server running
  cargo xtask integration --no-docker        # Use TEST_DATABASE_URL as-is")]
pub struct IntegrationCommand {
    /// Skip container management and use an already running server.
    #[arg(long)]
    pub no_docker: bool,

    /// Keep the container running after tests complete.
    #[arg(long)]
    pub keep_container: bool,

    /// Timeout in seconds for the container health check.
    #[arg(long, default_value = "30")]
    pub health_timeout: u64,

    /// Server to test against with --no-docker.
    #[arg(long, env = TEST_DATABASE_URL_VAR)]
    pub database_url: Option<String>,
}

/// Main entry point for integration command.
pub async fn run(command: IntegrationCommand, global: crate::Global) -> Result<()> {
    if !global.is_silent() {
        aprintln!("{}", p_b("Integration Tests"));
        aprintln!();
    }

    if command.no_docker {
        let url = command.database_url.ok_or_else(|| {
            IntegrationError::TestFailed(format!(
                "{TEST_DATABASE_URL_VAR} is required with --no-docker"
            ))
        })?;
        if !global.is_silent() {
            aprintln!(
                "{} {}",
                p_y("⚠️"),
                "Skipping container management (--no-docker)"
            );
        }
        return report(run_tests(&url, &global).await?);
    }

    let runtime = detect_runtime(false).await?;
    let started = start_postgres_container(command.health_timeout, &global, runtime).await?;

    // Tests run to completion before cleanup; their error is returned after it.
    let outcome = run_tests(&postgres_url(&POSTGRES_SPEC), &global).await;

    if !command.keep_container && started {
        stop_postgres_container(&global, runtime).await?;
    } else if started && !global.is_silent() {
        aprintln!(
            "{} {}",
            p_y("⚠️"),
            format!(
                "Container left running (--keep-container): {}={}",
                TEST_DATABASE_URL_VAR,
                postgres_url(&POSTGRES_SPEC)
            )
        );
    }

    report(outcome?)
}

fn report(all_passed: bool) -> Result<()> {
    aprintln!();
    if all_passed {
        aprintln!("{} {}", p_g("✅"), p_g("All integration tests passed!"));
        Ok(())
    } else {
        aprintln!("{} {}", p_r("❌"), p_r("Some integration tests failed"));
        Err(IntegrationError::TestFailed(
            "One or more test suites failed".to_string(),
        ))
    }
}

/// Runs `cargo test` for every database crate; `Ok(false)` when any failed.
async fn run_tests(database_url: &str, global: &crate::Global) -> Result<bool> {
    let mut all_passed = true;

    for package in DATABASE_TEST_PACKAGES.iter().copied() {
        if !global.is_silent() {
            aprintln!("{} Running {} tests", p_b("🔧"), p_y(package));
        }

        let mut args = vec!["test", "-p", package];
        if !global.is_verbose() {
            args.push("--quiet");
        }

        let status =
            execute_command_interactive("cargo", &args, &[(TEST_DATABASE_URL_VAR, database_url)])
                .await?;

        if status.success() {
            if !global.is_silent() {
                aprintln!("{} {} tests passed", p_g("✅"), package);
            }
        } else {
            aprintln!("{} {} tests failed", p_r("❌"), package);
            all_passed = false;
        }
    }

    Ok(all_passed)
}

/// Start the PostgreSQL container; `false` when one was already running.
async fn start_postgres_container(
    timeout_secs: u64,
    global: &crate::Global,
    runtime: ContainerRuntime,
) -> Result<bool> {
    if is_running(runtime, POSTGRES_SPEC.name).await? {
        if !global.is_silent() {
            aprintln!("{} {}", p_y("⚠️"), "PostgreSQL container already running");
        }
        return Ok(false);
    }

    if !global.is_silent() {
        aprintln!(
            "{} Starting {} container...",
            p_b("🐳"),
            POSTGRES_SPEC.image
        );
    }

    start_container(runtime, &POSTGRES_SPEC).await?;

    if !global.is_silent() {
        aprintln!(
            "{} {}",
            p_b("⏳"),
            format!("Waiting for PostgreSQL health (max {}s)...", timeout_secs)
        );
    }

    if let Err(err) =
        wait_for_health(runtime, &POSTGRES_SPEC, Duration::from_secs(timeout_secs)).await
    {
        stop_container(runtime, POSTGRES_SPEC.name).await?;
        return Err(err.into());
    }

    tracing::info!(container = POSTGRES_SPEC.name, "PostgreSQL is ready");
    if !global.is_silent() {
        aprintln!("{} {}", p_g("✅"), "PostgreSQL is ready");
    }

    Ok(true)
}

/// Stop the PostgreSQL container.
async fn stop_postgres_container(global: &crate::Global, runtime: ContainerRuntime) -> Result<()> {
    if !global.is_silent() {
        aprintln!("{} {}", p_b("🐳"), "Stopping PostgreSQL container...");
    }

    stop_container(runtime, POSTGRES_SPEC.name).await?;

    if !global.is_silent() {
        aprintln!("{} {}", p_g("✅"), "PostgreSQL container stopped");
    }

    Ok(())
}
