//! See <https://github.com/matklad/cargo-xtask/>
//!
//! This binary defines various auxiliary build commands, which are not
//! expressible with just `cargo`.
//!
//! The binary is integrated into the `cargo` command line by using an
//! alias in `.cargo/config.toml`.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod containers;
mod db;
mod integration;
mod prelude;
mod synth;

/// Development tasks for the LogbookLM repository
#[derive(Debug, Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for LogbookLM", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn default_filter(&self) -> &'static str {
        if self.verbose {
            "xtask=debug,logbook_db=debug,logbook_infra=debug"
        } else {
            "xtask=info,logbook_db=info"
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Synthesize the infrastructure template
    Synth(synth::SynthCommand),

    /// Compose the schema, apply migrations and seed data
    Db(db::DbCommand),

    /// Run integration tests against PostgreSQL
    Integration(integration::IntegrationCommand),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.global.default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Synth(synth_cmd) => {
            synth::run(synth_cmd, cli.global)?;
        }
        Commands::Db(db_cmd) => {
            db::run(db_cmd, cli.global).await?;
        }
        Commands::Integration(integration_cmd) => {
            integration::run(integration_cmd, cli.global).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_db_migrate_flags() {
        let cli = Cli::try_parse_from([
            "xtask",
            "db",
            "migrate",
            "--skip-generate",
            "--force",
            "--database-url",
            "postgres://localhost/logbook",
        ])
        .unwrap();

        let Commands::Db(db::DbCommand {
            action: db::DbAction::Migrate(cmd),
        }) = cli.command
        else {
            panic!("expected db migrate");
        };
        assert!(cmd.skip_generate);
        assert!(cmd.force);
        assert_eq!(
            cmd.database_url.as_deref(),
            Some("postgres://localhost/logbook")
        );
    }

    #[test]
    fn test_parses_synth_env() {
        let cli = Cli::try_parse_from(["xtask", "synth", "--env", "dev", "--silent"]).unwrap();

        assert!(cli.global.is_silent());
        let Commands::Synth(cmd) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(cmd.env.as_deref(), Some("dev"));
        assert_eq!(cmd.output, std::path::PathBuf::from("synth.out"));
    }
}
