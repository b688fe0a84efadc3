//! Step Functions state machines and their definitions.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SynthError};
use crate::template::{LogicalId, ResourceProperties};

/// A state in an Amazon States Language definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type")]
pub enum State {
    Pass {
        #[serde(rename = "Comment", skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
        #[serde(rename = "Next", skip_serializing_if = "Option::is_none")]
        next: Option<String>,
        #[serde(rename = "End", skip_serializing_if = "Option::is_none")]
        end: Option<bool>,
    },
    Succeed {
        #[serde(rename = "Comment", skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
}

impl State {
    /// A terminal `Pass` state.
    pub fn pass(comment: impl Into<String>) -> Self {
        State::Pass {
            comment: Some(comment.into()),
            next: None,
            end: Some(true),
        }
    }

    fn next(&self) -> Option<&str> {
        match self {
            State::Pass { next, .. } => next.as_deref(),
            State::Succeed { .. } => None,
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            State::Pass { end, next, .. } => end.unwrap_or(false) && next.is_none(),
            State::Succeed { .. } => true,
        }
    }
}

/// A workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Definition {
    pub start_at: String,
    pub states: BTreeMap<String, State>,
}

impl Definition {
    pub fn starting_with(name: impl Into<String>, state: State) -> Self {
        let name = name.into();
        Self {
            start_at: name.clone(),
            states: BTreeMap::from([(name, state)]),
        }
    }

    /// Ensures `StartAt` and every `Next` name an existing state, and that
    /// every state without `Next` is terminal.
    pub fn check(&self, logical_id: &str) -> Result<()> {
        let invalid = |reason: String| SynthError::invalid(logical_id, "DefinitionString", reason);

        if !self.states.contains_key(&self.start_at) {
            return Err(invalid(format!("StartAt '{}' is not a state", self.start_at)));
        }
        for (name, state) in &self.states {
            match state.next() {
                Some(next) if !self.states.contains_key(next) => {
                    return Err(invalid(format!("state '{name}' moves to unknown state '{next}'")));
                }
                Some(_) => {}
                None if !state.is_terminal() => {
                    return Err(invalid(format!("state '{name}' has neither Next nor End")));
                }
                None => {}
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| SynthError::Serialize {
            resource: "state machine definition".to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateMachineType {
    Standard,
    Express,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    All,
    Error,
    Fatal,
    Off,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingConfiguration {
    pub destinations: Vec<LogDestination>,
    pub include_execution_data: bool,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogDestination {
    pub cloud_watch_logs_log_group: CloudWatchLogsLogGroup,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudWatchLogsLogGroup {
    pub log_group_arn: Value,
}

impl LoggingConfiguration {
    pub fn to_log_group(log_group: &LogicalId, level: LogLevel) -> Self {
        Self {
            destinations: vec![LogDestination {
                cloud_watch_logs_log_group: CloudWatchLogsLogGroup {
                    log_group_arn: log_group.arn(),
                },
            }],
            include_execution_data: false,
            level,
        }
    }
}

/// `AWS::StepFunctions::StateMachine`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachine {
    pub state_machine_name: String,
    pub state_machine_type: StateMachineType,
    pub role_arn: Value,
    pub definition_string: String,
    pub logging_configuration: LoggingConfiguration,
    #[serde(skip)]
    definition: Definition,
}

impl StateMachine {
    pub fn new(
        name: impl Into<String>,
        machine_type: StateMachineType,
        role: &LogicalId,
        definition: Definition,
        logging: LoggingConfiguration,
    ) -> Result<Self> {
        Ok(Self {
            state_machine_name: name.into(),
            state_machine_type: machine_type,
            role_arn: role.arn(),
            definition_string: definition.to_json()?,
            logging_configuration: logging,
            definition,
        })
    }
}

impl ResourceProperties for StateMachine {
    const RESOURCE_TYPE: &'static str = "AWS::StepFunctions::StateMachine";

    fn validate(&self, logical_id: &str) -> Result<()> {
        self.definition.check(logical_id)?;
        let name = &self.state_machine_name;
        if name.is_empty() || name.len() > 80 {
            return Err(SynthError::invalid(
                logical_id,
                "StateMachineName",
                "must be 1 to 80 characters",
            ));
        }
        Ok(())
    }
}
