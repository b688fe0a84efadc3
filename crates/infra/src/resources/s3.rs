//! S3 buckets, bucket policies and the auto-delete custom resource.

use serde::Serialize;
use serde_json::{json, Value};

use super::grants::bucket_and_objects;
use super::iam::{PolicyDocument, PolicyStatement};
use crate::error::{Result, SynthError};
use crate::template::{LogicalId, ResourceProperties};

/// Resource type served by the auto-delete provider function.
pub const AUTO_DELETE_OBJECTS_TYPE: &str = "Custom::S3AutoDeleteObjects";

/// `AWS::S3::Bucket`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    pub bucket_encryption: BucketEncryption,
    pub public_access_block_configuration: PublicAccessBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning_configuration: Option<Versioning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_configuration: Option<LifecycleConfiguration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketEncryption {
    pub server_side_encryption_configuration: Vec<EncryptionRule>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionRule {
    pub server_side_encryption_by_default: EncryptionByDefault,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncryptionByDefault {
    #[serde(rename = "SSEAlgorithm")]
    pub sse_algorithm: &'static str,
    #[serde(rename = "KMSMasterKeyID", skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub const BLOCK_ALL: Self = Self {
        block_public_acls: true,
        block_public_policy: true,
        ignore_public_acls: true,
        restrict_public_buckets: true,
    };
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Versioning {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    pub rules: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRule {
    pub id: String,
    pub status: &'static str,
    pub noncurrent_version_expiration: NoncurrentVersionExpiration,
}

impl LifecycleRule {
    pub fn expire_noncurrent(id: impl Into<String>, days: u32) -> Self {
        Self {
            id: id.into(),
            status: "Enabled",
            noncurrent_version_expiration: NoncurrentVersionExpiration {
                noncurrent_days: days,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionExpiration {
    pub noncurrent_days: u32,
}

impl Bucket {
    /// Versioned, KMS-encrypted with `key`, public access blocked.
    pub fn encrypted(key: &LogicalId) -> Self {
        Self {
            bucket_encryption: BucketEncryption {
                server_side_encryption_configuration: vec![EncryptionRule {
                    server_side_encryption_by_default: EncryptionByDefault {
                        sse_algorithm: "aws:kms",
                        kms_master_key_id: Some(key.arn()),
                    },
                }],
            },
            public_access_block_configuration: PublicAccessBlock::BLOCK_ALL,
            versioning_configuration: Some(Versioning { status: "Enabled" }),
            lifecycle_configuration: None,
        }
    }

    pub fn with_lifecycle_rule(mut self, rule: LifecycleRule) -> Self {
        self.lifecycle_configuration
            .get_or_insert_with(|| LifecycleConfiguration { rules: Vec::new() })
            .rules
            .push(rule);
        self
    }
}

impl ResourceProperties for Bucket {
    const RESOURCE_TYPE: &'static str = "AWS::S3::Bucket";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if self.bucket_encryption.server_side_encryption_configuration.is_empty() {
            return Err(SynthError::invalid(
                logical_id,
                "BucketEncryption",
                "at least one encryption rule is required",
            ));
        }
        for rule in self.lifecycle_configuration.iter().flat_map(|c| &c.rules) {
            if rule.id.is_empty() || rule.id.len() > 255 {
                return Err(SynthError::invalid(
                    logical_id,
                    "LifecycleConfiguration",
                    "rule id must be 1 to 255 characters",
                ));
            }
            if rule.noncurrent_version_expiration.noncurrent_days == 0 {
                return Err(SynthError::invalid(
                    logical_id,
                    "LifecycleConfiguration",
                    format!("rule '{}' must expire after at least one day", rule.id),
                ));
            }
        }
        Ok(())
    }
}

/// `AWS::S3::BucketPolicy`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    pub bucket: Value,
    pub policy_document: PolicyDocument,
}

impl BucketPolicy {
    /// Denies non-TLS access and lets the auto-delete provider empty the bucket.
    pub fn tls_only_with_auto_delete(bucket: &LogicalId, provider_role: &LogicalId) -> Self {
        let deny_insecure = PolicyStatement::deny(["s3:*"])
            .with_principal(json!({ "AWS": "*" }))
            .with_condition(json!({ "Bool": { "aws:SecureTransport": "false" } }))
            .on(bucket_and_objects(bucket));

        let allow_provider = PolicyStatement::allow([
            "s3:PutBucketPolicy",
            "s3:GetBucket*",
            "s3:List*",
            "s3:DeleteObject*",
        ])
        .with_principal(json!({ "AWS": provider_role.arn() }))
        .on(bucket_and_objects(bucket));

        Self {
            bucket: bucket.reference(),
            policy_document: PolicyDocument::new(vec![deny_insecure, allow_provider]),
        }
    }
}

impl ResourceProperties for BucketPolicy {
    const RESOURCE_TYPE: &'static str = "AWS::S3::BucketPolicy";
    const TAGGABLE: bool = false;

    fn validate(&self, logical_id: &str) -> Result<()> {
        self.policy_document.check(logical_id, "PolicyDocument")
    }
}

/// Custom resource that empties a bucket before it is deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoDeleteObjects {
    pub service_token: Value,
    pub bucket_name: Value,
}

impl AutoDeleteObjects {
    pub fn new(provider: &LogicalId, bucket: &LogicalId) -> Self {
        Self {
            service_token: provider.arn(),
            bucket_name: bucket.reference(),
        }
    }
}

impl ResourceProperties for AutoDeleteObjects {
    const RESOURCE_TYPE: &'static str = AUTO_DELETE_OBJECTS_TYPE;
    const TAGGABLE: bool = false;
}
