//! Permission sets granted to roles.
//!
//! Each function returns the statements for one grant; the stack gathers
//! them into a single inline policy per role.

use serde_json::{json, Value};

use super::iam::PolicyStatement;
use crate::template::{join, LogicalId};

pub const BUCKET_READ_ACTIONS: &[&str] = &["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

pub const BUCKET_WRITE_ACTIONS: &[&str] = &[
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

pub const KEY_ENCRYPT_DECRYPT_ACTIONS: &[&str] = &[
    "kms:Decrypt",
    "kms:DescribeKey",
    "kms:Encrypt",
    "kms:ReEncrypt*",
    "kms:GenerateDataKey*",
];

pub const QUEUE_SEND_ACTIONS: &[&str] = &[
    "sqs:SendMessage",
    "sqs:GetQueueAttributes",
    "sqs:GetQueueUrl",
];

/// Actions Step Functions needs to deliver execution logs to CloudWatch.
pub const LOG_DELIVERY_ACTIONS: &[&str] = &[
    "logs:CreateLogDelivery",
    "logs:GetLogDelivery",
    "logs:UpdateLogDelivery",
    "logs:DeleteLogDelivery",
    "logs:ListLogDeliveries",
    "logs:PutResourcePolicy",
    "logs:DescribeResourcePolicies",
    "logs:DescribeLogGroups",
];

/// The bucket ARN and every object under it.
pub fn bucket_and_objects(bucket: &LogicalId) -> Value {
    json!([bucket.arn(), join("", vec![bucket.arn(), json!("/*")])])
}

pub fn bucket_read_write(bucket: &LogicalId) -> PolicyStatement {
    PolicyStatement::allow(BUCKET_READ_ACTIONS.iter().chain(BUCKET_WRITE_ACTIONS).copied())
        .on(bucket_and_objects(bucket))
}

pub fn key_encrypt_decrypt(key: &LogicalId) -> PolicyStatement {
    PolicyStatement::allow(KEY_ENCRYPT_DECRYPT_ACTIONS.iter().copied()).on(key.arn())
}

pub fn queue_send_messages(queue: &LogicalId) -> PolicyStatement {
    PolicyStatement::allow(QUEUE_SEND_ACTIONS.iter().copied()).on(queue.arn())
}

/// `Ref` of a state machine resolves to its ARN.
pub fn state_machine_start_execution(state_machine: &LogicalId) -> PolicyStatement {
    PolicyStatement::allow(["states:StartExecution"]).on(state_machine.reference())
}

pub fn log_delivery() -> PolicyStatement {
    PolicyStatement::allow(LOG_DELIVERY_ACTIONS.iter().copied()).on(json!("*"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ResourceProperties, TemplateBuilder};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Stub {}

    impl ResourceProperties for Stub {
        const RESOURCE_TYPE: &'static str = "Test::Stub";
    }

    #[test]
    fn test_bucket_read_write_covers_objects() {
        let mut builder = TemplateBuilder::new();
        let bucket = builder.add("DocumentsBucket", Stub {}).unwrap();

        let statement = bucket_read_write(&bucket);
        assert!(statement.action.contains(&"s3:PutObject".to_string()));
        assert!(statement.action.contains(&"s3:GetObject*".to_string()));

        let resources = statement.resource.unwrap();
        assert_eq!(resources[0], json!({ "Fn::GetAtt": ["DocumentsBucket", "Arn"] }));
        assert_eq!(
            resources[1],
            json!({ "Fn::Join": ["", [{ "Fn::GetAtt": ["DocumentsBucket", "Arn"] }, "/*"]] })
        );
    }

    #[test]
    fn test_start_execution_uses_ref() {
        let mut builder = TemplateBuilder::new();
        let sm = builder.add("IngestionWorkflow", Stub {}).unwrap();

        let statement = state_machine_start_execution(&sm);
        assert_eq!(statement.action, vec!["states:StartExecution"]);
        assert_eq!(statement.resource, Some(json!({ "Ref": "IngestionWorkflow" })));
    }
}
