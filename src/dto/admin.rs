//! DTO definitions used by the admin REST API and documentation layer.

use serde::Serialize;
use utoipa::ToSchema;

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

/// Outcome of an orphaned-player sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of player records deleted.
    pub removed: usize,
}
