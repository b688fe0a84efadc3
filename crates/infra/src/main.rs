use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logbook_infra::environments::parse_context;
use logbook_infra::{
    format_resource_summary, resolve_environment, synthesize, CoreInfrastructureStack,
    CONTEXT_KEY, ENVIRONMENT_VARIABLE,
};

/// Synthesize the LogbookLM core infrastructure template
#[derive(Parser, Debug)]
#[command(name = "logbooklm-infra")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Deployment context as KEY=VALUE (repeatable), e.g. `-c env=dev`
    #[arg(short = 'c', long = "context", value_name = "KEY=VALUE")]
    context: Vec<String>,

    /// Directory the template and manifest are written to
    #[arg(short, long, default_value = "synth.out")]
    output: PathBuf,

    /// Also write the template JSON to stdout
    #[arg(long)]
    print: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logbook_infra=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let context = parse_context(&cli.context)?;
    let env_var = std::env::var(ENVIRONMENT_VARIABLE).ok();
    let env = resolve_environment(
        context.get(CONTEXT_KEY).map(String::as_str),
        env_var.as_deref(),
    )?;

    tracing::info!(
        environment = env.name,
        account = env.account,
        region = env.region,
        "Resolved environment"
    );

    let stack = CoreInfrastructureStack::for_environment(env)
        .with_context(|| format!("Failed to declare stack for environment '{}'", env.name))?;

    for line in format_resource_summary(&stack.template) {
        tracing::debug!("{line}");
    }

    let output = synthesize(&stack, &cli.output)
        .with_context(|| format!("Failed to write template to {}", cli.output.display()))?;

    if cli.print {
        println!("{}", stack.template.to_json_pretty()?);
    }

    tracing::info!(
        manifest = %output.manifest_path.display(),
        "Synthesized {} ({} resources)",
        output.manifest.stack_name,
        output.manifest.resource_count
    );

    Ok(())
}
