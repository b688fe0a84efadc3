//! Synthesize the infrastructure template from the workspace.

use std::path::PathBuf;

use anyhow::{Context, Result};
use logbook_infra::{
    format_resource_summary, resolve_environment, synthesize, CoreInfrastructureStack,
    ENVIRONMENT_VARIABLE,
};

use crate::prelude::*;

/// Synthesize the core infrastructure template.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Synthesize the core infrastructure template.

Resolves the deployment environment, prints the resource plan and writes
<StackName>.template.json plus manifest.json to the output directory.

Environment variables:
  CDK_ENV    - Environment name when --env is not given (default: dev)")]
pub struct SynthCommand {
    /// Environment to synthesize for.
    #[arg(long)]
    pub env: Option<String>,

    /// Output directory, relative to the workspace root.
    #[arg(long, default_value = "synth.out")]
    pub output: PathBuf,
}

pub fn run(command: SynthCommand, global: crate::Global) -> Result<()> {
    let env_var = std::env::var(ENVIRONMENT_VARIABLE).ok();
    let env = resolve_environment(command.env.as_deref(), env_var.as_deref())?;

    let stack = CoreInfrastructureStack::for_environment(env)
        .with_context(|| format!("Failed to declare stack for environment '{}'", env.name))?;

    if !global.is_silent() {
        aprintln!(
            "{} {} ({} / {})",
            p_b("Environment:"),
            env.name,
            env.account,
            env.region
        );
        aprintln!();
        aprintln!("{}", p_c("Resources:"));
        for line in format_resource_summary(&stack.template) {
            aprintln!("  {}", p_g(&line));
        }
        aprintln!();
    }

    let out_dir = workspace_root().join(&command.output);
    let output = synthesize(&stack, &out_dir)
        .with_context(|| format!("Failed to write template to {}", out_dir.display()))?;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Template:"), output.template_path.display());
        aprintln!(
            "{} {} ({} resources)",
            p_g("Synthesized:"),
            output.manifest.stack_name,
            output.manifest.resource_count
        );
    }

    Ok(())
}
