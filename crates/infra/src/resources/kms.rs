//! Customer-managed KMS keys.

use serde::Serialize;
use serde_json::Value;

use super::iam::{PolicyDocument, PolicyStatement};
use crate::error::{Result, SynthError};
use crate::template::{account_root_arn, ResourceProperties};

/// `AWS::KMS::Key`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Key {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enable_key_rotation: bool,
    pub key_policy: PolicyDocument,
}

impl Key {
    /// A rotating key administered by the account root.
    pub fn rotating() -> Self {
        Self {
            description: None,
            enable_key_rotation: true,
            key_policy: PolicyDocument::new(vec![PolicyStatement::allow(["kms:*"])
                .with_principal(serde_json::json!({ "AWS": account_root_arn() }))
                .on(Value::String("*".to_string()))]),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ResourceProperties for Key {
    const RESOURCE_TYPE: &'static str = "AWS::KMS::Key";

    fn validate(&self, logical_id: &str) -> Result<()> {
        self.key_policy.check(logical_id, "KeyPolicy")
    }
}

/// `AWS::KMS::Alias`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Alias {
    pub alias_name: String,
    pub target_key_id: Value,
}

impl Alias {
    pub fn new(alias_name: impl Into<String>, target_key_id: Value) -> Self {
        Self {
            alias_name: alias_name.into(),
            target_key_id,
        }
    }
}

impl ResourceProperties for Alias {
    const RESOURCE_TYPE: &'static str = "AWS::KMS::Alias";
    const TAGGABLE: bool = false;

    fn validate(&self, logical_id: &str) -> Result<()> {
        let Some(name) = self.alias_name.strip_prefix("alias/") else {
            return Err(SynthError::invalid(
                logical_id,
                "AliasName",
                "must start with 'alias/'",
            ));
        };
        if name.is_empty() || name.starts_with("aws/") {
            return Err(SynthError::invalid(
                logical_id,
                "AliasName",
                "must name a customer alias outside 'alias/aws/'",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rotating_key_policy() {
        let json = serde_json::to_value(Key::rotating()).unwrap();
        assert_eq!(json["EnableKeyRotation"], true);
        assert_eq!(json["KeyPolicy"]["Statement"][0]["Action"], json!(["kms:*"]));
        assert_eq!(json["KeyPolicy"]["Statement"][0]["Resource"], "*");
    }

    #[test]
    fn test_alias_prefix_required() {
        let key = json!({ "Ref": "Key" });
        assert!(Alias::new("alias/logbooklm/dev/primary", key.clone())
            .validate("Alias")
            .is_ok());
        assert!(Alias::new("logbooklm/dev/primary", key.clone())
            .validate("Alias")
            .is_err());
        assert!(Alias::new("alias/aws/s3", key).validate("Alias").is_err());
    }
}
