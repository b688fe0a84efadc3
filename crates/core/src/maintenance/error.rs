use thiserror::Error;

/// A database label that does not match any variant of the target enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {type_name} value: {value}")]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
}

/// Errors raised when a record breaks a data model invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },
    #[error("Invalid slug '{0}': use lowercase letters, digits and hyphens")]
    InvalidSlug(String),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Manufacture year {0} is out of range")]
    InvalidYear(i32),
    #[error("{entity} belongs to organization {child_org} but its parent belongs to {parent_org}")]
    OrganizationMismatch {
        entity: &'static str,
        parent_org: uuid::Uuid,
        child_org: uuid::Uuid,
    },
    #[error("{field} cannot be negative")]
    NegativeHours { field: &'static str },
    #[error("{field} allows at most one decimal place, got {value}")]
    HoursPrecision {
        field: &'static str,
        value: rust_decimal::Decimal,
    },
    #[error("{field} exceeds the largest storable value, got {value}")]
    HoursOutOfRange {
        field: &'static str,
        value: rust_decimal::Decimal,
    },
    #[error("Embedding declares {declared} dimensions but the vector has {actual}")]
    EmbeddingDimensions { declared: i32, actual: usize },
    #[error("Embedding vector contains a non-finite value")]
    EmbeddingNotFinite,
}
