//! Typed resource properties, one module per provider service.

pub mod ec2;
pub mod grants;
pub mod iam;
pub mod kms;
pub mod lambda;
pub mod logs;
pub mod rds;
pub mod s3;
pub mod sfn;
pub mod sqs;
