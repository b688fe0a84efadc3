//! Intrinsic function helpers and logical id handles.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Result, SynthError};

/// Handle to a resource declared in a template.
///
/// Only [`crate::template::TemplateBuilder`] hands these out, so holding one
/// means the resource exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Validates a logical id: non-empty, ASCII letters and digits only.
    pub(crate) fn parse(id: &str) -> Result<Self> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SynthError::InvalidLogicalId(id.to_string()));
        }
        Ok(LogicalId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{"Ref": "<id>"}`
    pub fn reference(&self) -> Value {
        json!({ "Ref": self.0 })
    }

    /// `{"Fn::GetAtt": ["<id>", "<attribute>"]}`
    pub fn attr(&self, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [self.0, attribute] })
    }

    pub fn arn(&self) -> Value {
        self.attr("Arn")
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pseudo parameters resolved by the provider at deploy time.
pub mod pseudo {
    use serde_json::{json, Value};

    pub fn account_id() -> Value {
        json!({ "Ref": "AWS::AccountId" })
    }

    pub fn partition() -> Value {
        json!({ "Ref": "AWS::Partition" })
    }

    pub fn region() -> Value {
        json!({ "Ref": "AWS::Region" })
    }

    pub fn url_suffix() -> Value {
        json!({ "Ref": "AWS::URLSuffix" })
    }
}

/// `{"Fn::Join": ["<delimiter>", [parts...]]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// `{"Fn::Select": [index, list]}`
pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

/// `{"Fn::GetAZs": ""}`, the availability zones of the stack's region.
pub fn get_azs() -> Value {
    json!({ "Fn::GetAZs": "" })
}

/// ARN of a provider-managed IAM policy, e.g. `service-role/AWSLambdaBasicExecutionRole`.
pub fn managed_policy_arn(name: &str) -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            pseudo::partition(),
            json!(format!(":iam::aws:policy/{name}")),
        ],
    )
}

/// ARN of the account root principal.
pub fn account_root_arn() -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            pseudo::partition(),
            json!(":iam::"),
            pseudo::account_id(),
            json!(":root"),
        ],
    )
}

/// Service principal document fragment, e.g. `{"Service": "lambda.amazonaws.com"}`.
pub fn service_principal(service: &str) -> Value {
    json!({ "Service": service })
}

/// Collects every resource a value points at through `Ref` or `Fn::GetAtt`.
///
/// Pseudo parameters (`AWS::*`) are skipped.
pub fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    out.push(target.clone());
                }
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = args.first() {
                    out.push(target.clone());
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_id_rejects_non_alphanumeric() {
        assert!(LogicalId::parse("DocumentsBucket").is_ok());
        assert!(matches!(
            LogicalId::parse("documents-bucket"),
            Err(SynthError::InvalidLogicalId(_))
        ));
        assert!(LogicalId::parse("").is_err());
    }

    #[test]
    fn test_ref_and_get_att_shapes() {
        let id = LogicalId::parse("PrimaryDataKey").unwrap();
        assert_eq!(id.reference(), json!({ "Ref": "PrimaryDataKey" }));
        assert_eq!(
            id.arn(),
            json!({ "Fn::GetAtt": ["PrimaryDataKey", "Arn"] })
        );
    }

    #[test]
    fn test_collect_references_skips_pseudo_parameters() {
        let value = json!({
            "Resource": [
                { "Fn::GetAtt": ["DocumentsBucket", "Arn"] },
                join("", vec![pseudo::partition(), json!({ "Ref": "IngestionQueue" })]),
            ]
        });

        let mut refs = Vec::new();
        collect_references(&value, &mut refs);
        assert_eq!(refs, vec!["DocumentsBucket", "IngestionQueue"]);
    }
}
