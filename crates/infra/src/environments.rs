//! Deployment environment registry and resolution.
//!
//! Resolution is a pure function of its inputs: the CLI reads the `env`
//! context value and the `CDK_ENV` variable and passes both in.

use std::collections::BTreeMap;

use crate::error::{ConfigError, SynthError};

/// Environment variable that overrides the default environment name.
pub const ENVIRONMENT_VARIABLE: &str = "CDK_ENV";

/// Context key that selects the environment (`-c env=<name>`).
pub const CONTEXT_KEY: &str = "env";

/// Environment used when neither context nor variable names one.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Aurora Serverless v2 capacity bounds, in ACUs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuroraCapacity {
    pub min_capacity: f64,
    pub max_capacity: f64,
}

/// Settings for one deployment target.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSettings {
    pub name: &'static str,
    pub account: &'static str,
    pub region: &'static str,
    pub aurora_capacity: AuroraCapacity,
}

/// Every known deployment environment.
pub const ENVIRONMENTS: &[EnvironmentSettings] = &[EnvironmentSettings {
    name: "dev",
    account: "111111111111",
    region: "us-east-1",
    aurora_capacity: AuroraCapacity {
        min_capacity: 0.5,
        max_capacity: 4.0,
    },
}];

/// Looks up an environment by name.
pub fn find_environment(name: &str) -> Option<&'static EnvironmentSettings> {
    ENVIRONMENTS.iter().find(|env| env.name == name)
}

/// Resolves the target environment.
///
/// Order: explicit context value, then the environment variable, then
/// [`DEFAULT_ENVIRONMENT`]. Unknown names fail with the list of available ones.
pub fn resolve_environment(
    context: Option<&str>,
    env_var: Option<&str>,
) -> Result<&'static EnvironmentSettings, ConfigError> {
    resolve_from(ENVIRONMENTS, context, env_var)
}

fn resolve_from<'a>(
    registry: &'a [EnvironmentSettings],
    context: Option<&str>,
    env_var: Option<&str>,
) -> Result<&'a EnvironmentSettings, ConfigError> {
    let name = context.or(env_var).unwrap_or(DEFAULT_ENVIRONMENT);

    registry
        .iter()
        .find(|env| env.name == name)
        .ok_or_else(|| {
            let names: Vec<&str> = registry.iter().map(|env| env.name).collect();
            ConfigError::UnknownEnvironment {
                name: name.to_string(),
                available: if names.is_empty() {
                    "none".to_string()
                } else {
                    names.join(", ")
                },
            }
        })
}

/// Parses repeated `KEY=VALUE` context arguments. Later values win.
pub fn parse_context<I, S>(args: I) -> Result<BTreeMap<String, String>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut context = BTreeMap::new();
    for arg in args {
        let arg = arg.as_ref();
        match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                context.insert(key.trim().to_string(), value.to_string());
            }
            _ => return Err(ConfigError::InvalidContext(arg.to_string())),
        }
    }
    Ok(context)
}

impl EnvironmentSettings {
    /// Default stack name for this environment.
    pub fn stack_name(&self) -> String {
        format!("LogbookLM-{}", self.name)
    }

    /// Checks the account and region shape before any resource is declared.
    pub fn validate(&self) -> Result<(), SynthError> {
        let invalid = |reason: String| SynthError::InvalidEnvironment {
            name: self.name.to_string(),
            reason,
        };

        if self.account.len() != 12 || !self.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(format!(
                "account '{}' must be 12 digits",
                self.account
            )));
        }
        if !is_region(self.region) {
            return Err(invalid(format!(
                "region '{}' is not a valid region name",
                self.region
            )));
        }
        Ok(())
    }
}

/// Region names look like `us-east-1` or `ap-southeast-2`.
fn is_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    let (last, words) = parts.split_last().unwrap_or((&"", &[]));
    !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
        && words
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
}
