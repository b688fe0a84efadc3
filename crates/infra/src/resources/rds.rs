//! Aurora PostgreSQL serverless v2 cluster and its master secret.

use serde::Serialize;
use serde_json::{json, Value};

use crate::environments::AuroraCapacity;
use crate::error::{Result, SynthError};
use crate::template::{join, LogicalId, ResourceProperties};

pub const AURORA_POSTGRES_ENGINE: &str = "aurora-postgresql";
pub const SERVERLESS_INSTANCE_CLASS: &str = "db.serverless";

/// Largest serverless v2 capacity, in ACUs.
pub const MAX_CAPACITY: f64 = 256.0;
/// Smallest serverless v2 capacity, in ACUs.
pub const MIN_CAPACITY: f64 = 0.5;

/// `AWS::SecretsManager::Secret` holding generated master credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Secret {
    pub description: String,
    pub generate_secret_string: GenerateSecretString,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenerateSecretString {
    pub secret_string_template: String,
    pub generate_string_key: &'static str,
    pub exclude_characters: &'static str,
    pub password_length: u32,
}

impl Secret {
    pub fn master_credentials(description: impl Into<String>, username: &str) -> Self {
        Self {
            description: description.into(),
            generate_secret_string: GenerateSecretString {
                secret_string_template: json!({ "username": username }).to_string(),
                generate_string_key: "password",
                exclude_characters: " %+~`#$&*()|[]{}:;<>?!'/@\"\\",
                password_length: 30,
            },
        }
    }
}

impl ResourceProperties for Secret {
    const RESOURCE_TYPE: &'static str = "AWS::SecretsManager::Secret";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if !(8..=4096).contains(&self.generate_secret_string.password_length) {
            return Err(SynthError::invalid(
                logical_id,
                "GenerateSecretString",
                "password length must be 8 to 4096",
            ));
        }
        Ok(())
    }
}

/// `AWS::SecretsManager::SecretTargetAttachment`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretTargetAttachment {
    pub secret_id: Value,
    pub target_id: Value,
    pub target_type: &'static str,
}

impl SecretTargetAttachment {
    pub fn cluster(secret: &LogicalId, cluster: &LogicalId) -> Self {
        Self {
            secret_id: secret.reference(),
            target_id: cluster.reference(),
            target_type: "AWS::RDS::DBCluster",
        }
    }
}

impl ResourceProperties for SecretTargetAttachment {
    const RESOURCE_TYPE: &'static str = "AWS::SecretsManager::SecretTargetAttachment";
    const TAGGABLE: bool = false;
}

/// `AWS::RDS::DBSubnetGroup`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DbSubnetGroup {
    #[serde(rename = "DBSubnetGroupDescription")]
    pub description: String,
    pub subnet_ids: Vec<Value>,
}

impl ResourceProperties for DbSubnetGroup {
    const RESOURCE_TYPE: &'static str = "AWS::RDS::DBSubnetGroup";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if self.subnet_ids.len() < 2 {
            return Err(SynthError::invalid(
                logical_id,
                "SubnetIds",
                "a subnet group needs subnets in at least two availability zones",
            ));
        }
        Ok(())
    }
}

/// `AWS::RDS::DBCluster`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DbCluster {
    #[serde(rename = "DBClusterIdentifier")]
    pub cluster_identifier: String,
    pub engine: &'static str,
    pub engine_version: String,
    pub database_name: String,
    pub master_username: Value,
    pub master_user_password: Value,
    #[serde(rename = "DBSubnetGroupName")]
    pub subnet_group_name: Value,
    pub vpc_security_group_ids: Vec<Value>,
    pub storage_encrypted: bool,
    pub kms_key_id: Value,
    pub backup_retention_period: u32,
    pub copy_tags_to_snapshot: bool,
    pub serverless_v2_scaling_configuration: ScalingConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalingConfiguration {
    pub min_capacity: f64,
    pub max_capacity: f64,
}

impl From<AuroraCapacity> for ScalingConfiguration {
    fn from(capacity: AuroraCapacity) -> Self {
        Self {
            min_capacity: capacity.min_capacity,
            max_capacity: capacity.max_capacity,
        }
    }
}

/// Dynamic reference to one field of a secret's JSON value.
pub fn secret_field(secret: &LogicalId, field: &str) -> Value {
    join(
        "",
        vec![
            json!("{{resolve:secretsmanager:"),
            secret.reference(),
            json!(format!(":SecretString:{field}::}}}}")),
        ],
    )
}

impl ResourceProperties for DbCluster {
    const RESOURCE_TYPE: &'static str = "AWS::RDS::DBCluster";

    fn validate(&self, logical_id: &str) -> Result<()> {
        validate_capacity(logical_id, &self.serverless_v2_scaling_configuration)?;
        if !(1..=35).contains(&self.backup_retention_period) {
            return Err(SynthError::invalid(
                logical_id,
                "BackupRetentionPeriod",
                format!("{} days is outside 1..=35", self.backup_retention_period),
            ));
        }
        let name_ok = self
            .database_name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && self.database_name.len() <= 63
            && self
                .database_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !name_ok {
            return Err(SynthError::invalid(
                logical_id,
                "DatabaseName",
                format!("'{}' is not a valid database name", self.database_name),
            ));
        }
        Ok(())
    }
}

/// Checks 0.5 <= min <= max <= 256 in steps of 0.5.
pub fn validate_capacity(logical_id: &str, scaling: &ScalingConfiguration) -> Result<()> {
    let ScalingConfiguration {
        min_capacity: min,
        max_capacity: max,
    } = *scaling;

    let reason = if !is_half_step(min) || !is_half_step(max) {
        Some(format!("capacity {min}..{max} must use steps of 0.5 ACU"))
    } else if min < MIN_CAPACITY {
        Some(format!("minimum capacity {min} is below {MIN_CAPACITY}"))
    } else if max > MAX_CAPACITY {
        Some(format!("maximum capacity {max} is above {MAX_CAPACITY}"))
    } else if min > max {
        Some(format!("minimum capacity {min} exceeds maximum {max}"))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SynthError::invalid(
            logical_id,
            "ServerlessV2ScalingConfiguration",
            reason,
        )),
        None => Ok(()),
    }
}

fn is_half_step(value: f64) -> bool {
    value.is_finite() && (value * 2.0).fract() == 0.0
}

/// `AWS::RDS::DBInstance`, a member of a cluster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DbInstance {
    #[serde(rename = "DBClusterIdentifier")]
    pub cluster_identifier: Value,
    #[serde(rename = "DBInstanceClass")]
    pub instance_class: &'static str,
    pub engine: &'static str,
    pub enable_performance_insights: bool,
    pub performance_insights_kms_key_id: Value,
    pub allow_major_version_upgrade: bool,
    pub publicly_accessible: bool,
}

impl DbInstance {
    pub fn serverless_writer(cluster: &LogicalId, key: &LogicalId) -> Self {
        Self {
            cluster_identifier: cluster.reference(),
            instance_class: SERVERLESS_INSTANCE_CLASS,
            engine: AURORA_POSTGRES_ENGINE,
            enable_performance_insights: true,
            performance_insights_kms_key_id: key.arn(),
            allow_major_version_upgrade: false,
            publicly_accessible: false,
        }
    }
}

impl ResourceProperties for DbInstance {
    const RESOURCE_TYPE: &'static str = "AWS::RDS::DBInstance";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaling(min: f64, max: f64) -> ScalingConfiguration {
        ScalingConfiguration {
            min_capacity: min,
            max_capacity: max,
        }
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(validate_capacity("Cluster", &scaling(0.5, 4.0)).is_ok());
        assert!(validate_capacity("Cluster", &scaling(1.0, 256.0)).is_ok());
        assert!(validate_capacity("Cluster", &scaling(0.0, 4.0)).is_err());
        assert!(validate_capacity("Cluster", &scaling(4.0, 2.0)).is_err());
        assert!(validate_capacity("Cluster", &scaling(0.5, 256.5)).is_err());
        assert!(validate_capacity("Cluster", &scaling(0.75, 4.0)).is_err());
        assert!(validate_capacity("Cluster", &scaling(f64::NAN, 4.0)).is_err());
    }

    #[test]
    fn test_secret_field_reference() {
        let secret = crate::template::LogicalId::parse("AuroraSecret").unwrap();
        assert_eq!(
            secret_field(&secret, "password"),
            json!({
                "Fn::Join": ["", [
                    "{{resolve:secretsmanager:",
                    { "Ref": "AuroraSecret" },
                    ":SecretString:password::}}"
                ]]
            })
        );
    }

    #[test]
    fn test_master_secret_template() {
        let secret = Secret::master_credentials("Aurora master", "postgres");
        assert_eq!(
            secret.generate_secret_string.secret_string_template,
            r#"{"username":"postgres"}"#
        );
    }
}
