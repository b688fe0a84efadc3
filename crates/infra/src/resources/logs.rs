use serde::Serialize;

use crate::error::{Result, SynthError};
use crate::template::ResourceProperties;

/// Retention periods CloudWatch Logs accepts, in days.
pub const ALLOWED_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

/// `AWS::Logs::LogGroup`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroup {
    pub log_group_name: String,
    pub retention_in_days: u32,
}

impl LogGroup {
    pub fn new(name: impl Into<String>, retention_in_days: u32) -> Self {
        Self {
            log_group_name: name.into(),
            retention_in_days,
        }
    }
}

impl ResourceProperties for LogGroup {
    const RESOURCE_TYPE: &'static str = "AWS::Logs::LogGroup";

    fn validate(&self, logical_id: &str) -> Result<()> {
        if !ALLOWED_RETENTION_DAYS.contains(&self.retention_in_days) {
            return Err(SynthError::invalid(
                logical_id,
                "RetentionInDays",
                format!("{} is not an allowed retention period", self.retention_in_days),
            ));
        }
        if self.log_group_name.is_empty() || self.log_group_name.len() > 512 {
            return Err(SynthError::invalid(
                logical_id,
                "LogGroupName",
                "must be 1 to 512 characters",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_must_be_allowed_value() {
        assert!(LogGroup::new("/aws/vendedlogs/states/x", 30).validate("Logs").is_ok());
        assert!(LogGroup::new("/aws/vendedlogs/states/x", 31).validate("Logs").is_err());
    }
}
