//! CloudFormation-compatible template model.
//!
//! Resources are typed property structs implementing [`ResourceProperties`].
//! [`TemplateBuilder`] validates each one as it is declared, injects stack
//! tags, and checks every cross-resource reference when the template is built.

mod intrinsics;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SynthError};

pub use intrinsics::{
    account_root_arn, collect_references, get_azs, join, managed_policy_arn, pseudo, select,
    service_principal, LogicalId,
};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A synthesized template, ready to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Logical ids of every resource with the given type, in key order.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Resource)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, r)| (id.as_str(), r))
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| SynthError::Serialize {
            resource: "template".to_string(),
            source,
        })
    }
}

/// One entry under `Resources`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<LogicalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
}

/// One entry under `Outputs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What happens to a resource when it leaves the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// A `{Key, Value}` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Typed properties for one resource type.
pub trait ResourceProperties: Serialize {
    /// Provider type name, e.g. `AWS::S3::Bucket`.
    const RESOURCE_TYPE: &'static str;

    /// Whether the type accepts a `Tags` list of `{Key, Value}`.
    const TAGGABLE: bool = true;

    /// Rejects malformed properties. Runs when the resource is declared.
    fn validate(&self, _logical_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Per-resource template attributes.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    pub depends_on: Vec<LogicalId>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depends_on(mut self, id: &LogicalId) -> Self {
        self.depends_on.push(id.clone());
        self
    }

    /// Sets both `DeletionPolicy` and `UpdateReplacePolicy`.
    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }
}

/// Accumulates resources and outputs, then validates the whole template.
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    description: Option<String>,
    tags: Vec<Tag>,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag applied to every taggable resource declared afterwards.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn add<P: ResourceProperties>(&mut self, id: &str, properties: P) -> Result<LogicalId> {
        self.add_with(id, properties, ResourceOptions::default())
    }

    pub fn add_with<P: ResourceProperties>(
        &mut self,
        id: &str,
        properties: P,
        options: ResourceOptions,
    ) -> Result<LogicalId> {
        let logical_id = LogicalId::parse(id)?;
        if self.resources.contains_key(id) {
            return Err(SynthError::DuplicateLogicalId(id.to_string()));
        }

        properties.validate(id)?;

        let mut value =
            serde_json::to_value(&properties).map_err(|source| SynthError::Serialize {
                resource: id.to_string(),
                source,
            })?;

        if P::TAGGABLE && !self.tags.is_empty() {
            apply_tags(&mut value, &self.tags);
        }

        self.resources.insert(
            id.to_string(),
            Resource {
                resource_type: P::RESOURCE_TYPE.to_string(),
                properties: value,
                depends_on: options.depends_on,
                deletion_policy: options.removal_policy,
                update_replace_policy: options.removal_policy,
            },
        );

        Ok(logical_id)
    }

    pub fn output(&mut self, name: &str, value: Value, description: &str) -> Result<()> {
        LogicalId::parse(name)?;
        if self.outputs.contains_key(name) {
            return Err(SynthError::DuplicateLogicalId(name.to_string()));
        }
        self.outputs.insert(
            name.to_string(),
            Output {
                value,
                description: Some(description.to_string()),
            },
        );
        Ok(())
    }

    /// Checks every `Ref`, `Fn::GetAtt` and `DependsOn` target and returns the template.
    pub fn build(self) -> Result<Template> {
        let known: BTreeSet<&str> = self.resources.keys().map(String::as_str).collect();

        for (id, resource) in &self.resources {
            let mut targets: Vec<String> = Vec::new();
            collect_references(&resource.properties, &mut targets);
            targets.extend(resource.depends_on.iter().map(|d| d.as_str().to_string()));
            check_targets(id, &targets, &known)?;
        }

        for (name, output) in &self.outputs {
            let mut targets = Vec::new();
            collect_references(&output.value, &mut targets);
            check_targets(name, &targets, &known)?;
        }

        Ok(Template {
            format_version: TEMPLATE_FORMAT_VERSION,
            description: self.description,
            resources: self.resources,
            outputs: self.outputs,
        })
    }
}

fn check_targets(owner: &str, targets: &[String], known: &BTreeSet<&str>) -> Result<()> {
    match targets.iter().find(|t| !known.contains(t.as_str())) {
        Some(target) => Err(SynthError::DanglingReference {
            resource: owner.to_string(),
            target: target.clone(),
        }),
        None => Ok(()),
    }
}

/// Appends stack tags after any tags the resource declared itself.
fn apply_tags(properties: &mut Value, tags: &[Tag]) {
    let Value::Object(map) = properties else {
        return;
    };

    let entry = map
        .entry("Tags")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(existing) = entry {
        for tag in tags {
            let already = existing
                .iter()
                .any(|t| t.get("Key").and_then(Value::as_str) == Some(tag.key.as_str()));
            if !already {
                existing.push(serde_json::json!({ "Key": tag.key, "Value": tag.value }));
            }
        }
    }
}
