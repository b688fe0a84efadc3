//! IAM roles, inline policies and policy documents.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SynthError};
use crate::template::{service_principal, ResourceProperties};

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Value>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl PolicyStatement {
    pub fn allow<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            principal: None,
            action: actions.into_iter().map(Into::into).collect(),
            resource: None,
            condition: None,
        }
    }

    pub fn deny<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: Effect::Deny,
            ..Self::allow(actions)
        }
    }

    pub fn on(mut self, resource: Value) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_principal(mut self, principal: Value) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statement,
        }
    }

    /// Trust policy letting a single service assume a role.
    pub fn assumable_by(service: &str) -> Self {
        Self::new(vec![
            PolicyStatement::allow(["sts:AssumeRole"]).with_principal(service_principal(service))
        ])
    }

    pub(crate) fn check(&self, logical_id: &str, property: &'static str) -> Result<()> {
        if self.statement.is_empty() {
            return Err(SynthError::invalid(
                logical_id,
                property,
                "policy document has no statements",
            ));
        }
        if self.statement.iter().any(|s| s.action.is_empty()) {
            return Err(SynthError::invalid(
                logical_id,
                property,
                "policy statement has no actions",
            ));
        }
        Ok(())
    }
}

/// `AWS::IAM::Role`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Value>,
}

impl Role {
    pub fn assumed_by(service: &str) -> Self {
        Self {
            assume_role_policy_document: PolicyDocument::assumable_by(service),
            role_name: None,
            description: None,
            managed_policy_arns: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.role_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_managed_policy(mut self, arn: Value) -> Self {
        self.managed_policy_arns.push(arn);
        self
    }

    /// Services named as principals in the trust policy.
    pub fn trusted_services(&self) -> Vec<&str> {
        self.assume_role_policy_document
            .statement
            .iter()
            .filter_map(|s| s.principal.as_ref())
            .filter_map(|p| p.get("Service").and_then(Value::as_str))
            .collect()
    }
}

impl ResourceProperties for Role {
    const RESOURCE_TYPE: &'static str = "AWS::IAM::Role";

    fn validate(&self, logical_id: &str) -> Result<()> {
        self.assume_role_policy_document
            .check(logical_id, "AssumeRolePolicyDocument")?;
        if let Some(name) = &self.role_name {
            if name.is_empty() || name.len() > 64 {
                return Err(SynthError::invalid(
                    logical_id,
                    "RoleName",
                    "must be 1 to 64 characters",
                ));
            }
        }
        Ok(())
    }
}

/// `AWS::IAM::Policy`, an inline policy attached to roles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
    pub roles: Vec<Value>,
}

impl Policy {
    pub fn for_role(policy_name: impl Into<String>, role: Value, statements: Vec<PolicyStatement>) -> Self {
        Self {
            policy_name: policy_name.into(),
            policy_document: PolicyDocument::new(statements),
            roles: vec![role],
        }
    }
}

impl ResourceProperties for Policy {
    const RESOURCE_TYPE: &'static str = "AWS::IAM::Policy";
    const TAGGABLE: bool = false;

    fn validate(&self, logical_id: &str) -> Result<()> {
        self.policy_document.check(logical_id, "PolicyDocument")?;
        if self.roles.is_empty() {
            return Err(SynthError::invalid(logical_id, "Roles", "policy is attached to no role"));
        }
        Ok(())
    }
}
