//! Writing synthesized templates to disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, SynthError};
use crate::stack::CoreInfrastructureStack;
use crate::template::Template;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Describes what a synthesis run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub stack_name: String,
    pub environment: String,
    pub account: String,
    pub region: String,
    pub template_file: String,
    pub resource_count: usize,
}

/// Files written by [`synthesize`].
#[derive(Debug, Clone)]
pub struct SynthOutput {
    pub template_path: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

/// File name of the template for a stack.
pub fn template_file_name(stack_name: &str) -> String {
    format!("{stack_name}.template.json")
}

/// Builds the manifest for a stack without writing anything.
pub fn build_manifest(stack: &CoreInfrastructureStack) -> Manifest {
    Manifest {
        stack_name: stack.stack_name.clone(),
        environment: stack.environment.name.to_string(),
        account: stack.environment.account.to_string(),
        region: stack.environment.region.to_string(),
        template_file: template_file_name(&stack.stack_name),
        resource_count: stack.template.resources.len(),
    }
}

/// Writes `<out_dir>/<StackName>.template.json` and `<out_dir>/manifest.json`.
pub fn synthesize(stack: &CoreInfrastructureStack, out_dir: &Path) -> Result<SynthOutput> {
    let template_json = stack.template.to_json_pretty()?;
    let manifest = build_manifest(stack);
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|source| SynthError::Serialize {
            resource: MANIFEST_FILE.to_string(),
            source,
        })?;

    fs::create_dir_all(out_dir)?;

    let template_path = out_dir.join(&manifest.template_file);
    fs::write(&template_path, template_json)?;

    let manifest_path = out_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, manifest_json)?;

    tracing::info!(
        stack = %manifest.stack_name,
        path = %template_path.display(),
        resources = manifest.resource_count,
        "Wrote template"
    );

    Ok(SynthOutput {
        template_path,
        manifest_path,
        manifest,
    })
}

/// Pure function: one `+ <Type> <LogicalId>` line per resource, sorted by type.
pub fn format_resource_summary(template: &Template) -> Vec<String> {
    let mut rows: Vec<(&str, &str)> = template
        .resources
        .iter()
        .map(|(id, r)| (r.resource_type.as_str(), id.as_str()))
        .collect();
    rows.sort();

    let width = rows.iter().map(|(t, _)| t.len()).max().unwrap_or(0);
    rows.into_iter()
        .map(|(resource_type, id)| format!("+ {resource_type:<width$} {id}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environments::resolve_environment;

    fn dev_stack() -> CoreInfrastructureStack {
        CoreInfrastructureStack::for_environment(resolve_environment(None, None).unwrap()).unwrap()
    }

    #[test]
    fn test_synthesize_writes_template_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("synth.out");

        let output = synthesize(&dev_stack(), &out_dir).unwrap();

        assert_eq!(output.template_path, out_dir.join("LogbookLM-dev.template.json"));
        let template: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output.template_path).unwrap()).unwrap();
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output.manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["stackName"], "LogbookLM-dev");
        assert_eq!(manifest["region"], "us-east-1");
        assert_eq!(manifest["templateFile"], "LogbookLM-dev.template.json");
    }

    #[test]
    fn test_resource_summary_lists_every_resource() {
        let stack = dev_stack();
        let lines = format_resource_summary(&stack.template);

        assert_eq!(lines.len(), stack.template.resources.len());
        assert!(lines.iter().all(|l| l.starts_with("+ ")));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("+ AWS::S3::Bucket") && l.ends_with(" DocumentsBucket")));
    }
}
