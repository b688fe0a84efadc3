//! Infrastructure definition for LogbookLM.
//!
//! Resolves a deployment environment, declares the core stack as a typed
//! template, and synthesizes it to a CloudFormation-compatible JSON file.
//! Deploying the template is left to the provider's tooling.

pub mod environments;
pub mod error;
pub mod resources;
pub mod stack;
pub mod synth;
pub mod template;

pub use environments::{
    resolve_environment, AuroraCapacity, EnvironmentSettings, CONTEXT_KEY, ENVIRONMENT_VARIABLE,
};
pub use error::{ConfigError, SynthError};
pub use stack::CoreInfrastructureStack;
pub use synth::{format_resource_summary, synthesize, Manifest, SynthOutput};
pub use template::{LogicalId, Template};
