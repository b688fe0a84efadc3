//! SQS queues with KMS encryption and dead-letter redrive.

use std::ops::RangeInclusive;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SynthError};
use crate::template::{LogicalId, ResourceProperties};

pub const VISIBILITY_TIMEOUT_SECONDS: RangeInclusive<u32> = 0..=43_200;
pub const RETENTION_SECONDS: RangeInclusive<u32> = 60..=1_209_600;
pub const MAX_RECEIVE_COUNT: RangeInclusive<u32> = 1..=1_000;

/// `AWS::SQS::Queue`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Queue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_master_key_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_retention_period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redrive_policy: Option<RedrivePolicy>,
}

/// Redrive keys are camelCase in the provider schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedrivePolicy {
    pub dead_letter_target_arn: Value,
    pub max_receive_count: u32,
}

impl Queue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            queue_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn encrypted_with(mut self, key: &LogicalId) -> Self {
        self.kms_master_key_id = Some(key.arn());
        self
    }

    pub fn with_retention(mut self, seconds: u32) -> Self {
        self.message_retention_period = Some(seconds);
        self
    }

    pub fn with_visibility_timeout(mut self, seconds: u32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    pub fn with_dead_letter_queue(mut self, dlq: &LogicalId, max_receive_count: u32) -> Self {
        self.redrive_policy = Some(RedrivePolicy {
            dead_letter_target_arn: dlq.arn(),
            max_receive_count,
        });
        self
    }
}

impl ResourceProperties for Queue {
    const RESOURCE_TYPE: &'static str = "AWS::SQS::Queue";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if let Some(timeout) = self.visibility_timeout {
            check_range(logical_id, "VisibilityTimeout", timeout, VISIBILITY_TIMEOUT_SECONDS)?;
        }
        if let Some(retention) = self.message_retention_period {
            check_range(logical_id, "MessageRetentionPeriod", retention, RETENTION_SECONDS)?;
        }
        if let Some(redrive) = &self.redrive_policy {
            check_range(
                logical_id,
                "RedrivePolicy",
                redrive.max_receive_count,
                MAX_RECEIVE_COUNT,
            )?;
        }
        if let Some(name) = &self.queue_name {
            let valid = !name.is_empty()
                && name.len() <= 80
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(SynthError::invalid(
                    logical_id,
                    "QueueName",
                    format!("'{name}' must be 1 to 80 letters, digits, hyphens or underscores"),
                ));
            }
        }
        Ok(())
    }
}

fn check_range(
    logical_id: &str,
    property: &'static str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SynthError::invalid(
            logical_id,
            property,
            format!("{value} is outside {}..={}", range.start(), range.end()),
        ))
    }
}
