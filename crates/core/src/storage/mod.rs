mod error;
mod traits;

pub use error::{RepositoryError, Result};
pub use traits::{
    AuditLogRepository, ComplianceRepository, EmbeddingRepository, FleetRepository,
    MaintenanceRepository, OrganizationRepository, UserRepository,
};
