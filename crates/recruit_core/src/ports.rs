//! crates/recruit_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete spreadsheet backend and identity provider.

use async_trait::async_trait;

use crate::domain::{ConfigData, GoogleUser, SchoolData, StudentProfile};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP transport,
/// backend error payloads) while keeping the distinctions the callers must surface:
/// a missing range/record is not the same failure as a permission problem.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The addressed range, sheet or record does not exist remotely.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The backend rejected the caller's credentials for this resource.
    #[error("Access denied: {0}")]
    PermissionDenied(String),
    /// The access token is missing, expired or revoked.
    #[error("Unauthorized")]
    Unauthorized,
    /// Anything else: transport failures, malformed payloads.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Everything a session loads from the backend in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetSnapshot {
    pub students: Vec<StudentProfile>,
    pub schools: Vec<SchoolData>,
    pub clubs: Vec<String>,
    pub recruiters: Vec<String>,
    pub config: ConfigData,
}

/// The remote tabular store holding the five named ranges. Row positions
/// are never cached by callers: update and delete resolve the target row
/// by scanning the identifier column on every call, because positions
/// shift after deletions.
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// Reads all ranges. A missing Config range yields default vocabularies
    /// rather than an error.
    async fn fetch_all(&self, access_token: &str) -> PortResult<SheetSnapshot>;

    /// Appends one student row.
    async fn append_student(&self, access_token: &str, student: &StudentProfile)
        -> PortResult<()>;

    /// Overwrites the full row whose identifier column matches
    /// `student.id`. Fails with [`PortError::NotFound`] when no row
    /// matches.
    async fn update_student(&self, access_token: &str, student: &StudentProfile)
        -> PortResult<()>;

    /// Removes the row whose identifier column matches `student_id`.
    /// A no-op (not an error) when no row matches.
    async fn delete_student(&self, access_token: &str, student_id: &str) -> PortResult<()>;

    /// Overwrites the Schools/Clubs/Recruiters ranges with the given
    /// collections wholesale. No incremental diffing.
    async fn sync_master_data(
        &self,
        access_token: &str,
        schools: &[SchoolData],
        clubs: &[String],
        recruiters: &[String],
    ) -> PortResult<()>;

    /// Overwrites the Config range (vocabularies plus target) wholesale.
    async fn sync_config(&self, access_token: &str, config: &ConfigData) -> PortResult<()>;
}

/// The OAuth identity endpoint: exchanges a bearer token for the caller's
/// profile, including the hosted-domain claim checked at login.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn user_info(&self, access_token: &str) -> PortResult<GoogleUser>;
}
