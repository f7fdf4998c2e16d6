use miette::Diagnostic;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::authz::types::{PartyId, ResourceId};

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(ancestry::configuration),
        help("Register every concrete resource kind and privilege on the Registry before use; the abstract `resource` kind cannot be queried directly")
    )]
    Configuration(String),

    #[error("Cycle detected in permission parents: {path}")]
    #[diagnostic(
        code(ancestry::cycle),
        help("A resource must not be its own permission ancestor; check the parent links along the reported path")
    )]
    CycleDetected { path: String },

    #[error("Consistency violation: {0}")]
    #[diagnostic(code(ancestry::consistency))]
    ConsistencyViolation(String),

    #[error("Resource {0} not found")]
    #[diagnostic(code(ancestry::resource_not_found))]
    ResourceNotFound(ResourceId),

    #[error("Party {0} not found")]
    #[diagnostic(code(ancestry::party_not_found))]
    PartyNotFound(PartyId),

    #[error("Database error: {0}")]
    #[diagnostic(code(ancestry::db))]
    Db(#[from] DbErr),
}

impl AuthzError {
    /// Classify a failed write: unique-constraint hits on closure edges or
    /// grants mean the maintainer produced a duplicate row.
    pub(crate) fn from_write(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AuthzError::ConsistencyViolation(detail)
            }
            _ => AuthzError::Db(err),
        }
    }
}
