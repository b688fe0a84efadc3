//! Lambda functions. The only one declared here serves bucket auto-delete.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SynthError};
use crate::template::{LogicalId, ResourceProperties};

/// Empties a bucket, all versions included, when its custom resource is deleted.
pub const AUTO_DELETE_OBJECTS_HANDLER: &str = r#"import boto3
import cfnresponse

s3 = boto3.client("s3")


def handler(event, context):
    try:
        if event["RequestType"] == "Delete":
            bucket = event["ResourceProperties"]["BucketName"]
            paginator = s3.get_paginator("list_object_versions")
            for page in paginator.paginate(Bucket=bucket):
                objects = [
                    {"Key": v["Key"], "VersionId": v["VersionId"]}
                    for v in page.get("Versions", []) + page.get("DeleteMarkers", [])
                ]
                if objects:
                    s3.delete_objects(Bucket=bucket, Delete={"Objects": objects})
        cfnresponse.send(event, context, cfnresponse.SUCCESS, {})
    except Exception as err:
        print(err)
        cfnresponse.send(event, context, cfnresponse.FAILED, {})
"#;

/// `AWS::Lambda::Function`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Function {
    pub description: String,
    pub handler: &'static str,
    pub runtime: &'static str,
    pub role: Value,
    pub timeout: u32,
    pub memory_size: u32,
    pub code: InlineCode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlineCode {
    pub zip_file: String,
}

impl Function {
    pub fn auto_delete_objects_provider(role: &LogicalId) -> Self {
        Self {
            description: "Empties S3 buckets before they are deleted.".to_string(),
            handler: "index.handler",
            runtime: "python3.12",
            role: role.arn(),
            timeout: 900,
            memory_size: 128,
            code: InlineCode {
                zip_file: AUTO_DELETE_OBJECTS_HANDLER.to_string(),
            },
        }
    }
}

impl ResourceProperties for Function {
    const RESOURCE_TYPE: &'static str = "AWS::Lambda::Function";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if !(1..=900).contains(&self.timeout) {
            return Err(SynthError::invalid(
                logical_id,
                "Timeout",
                format!("{} seconds is outside 1..=900", self.timeout),
            ));
        }
        if !(128..=10_240).contains(&self.memory_size) {
            return Err(SynthError::invalid(
                logical_id,
                "MemorySize",
                format!("{} MB is outside 128..=10240", self.memory_size),
            ));
        }
        // Inline code is limited to 4 KB.
        if self.code.zip_file.len() > 4096 {
            return Err(SynthError::invalid(logical_id, "Code", "inline code exceeds 4096 bytes"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_fits_inline_limits() {
        let role = LogicalId::parse("ProviderRole").unwrap();
        let function = Function::auto_delete_objects_provider(&role);
        assert!(function.validate("Provider").is_ok());
        assert!(function.code.zip_file.contains("list_object_versions"));
    }

    #[test]
    fn test_timeout_bounds() {
        let role = LogicalId::parse("ProviderRole").unwrap();
        let mut function = Function::auto_delete_objects_provider(&role);
        function.timeout = 901;
        assert!(function.validate("Provider").is_err());
    }
}
