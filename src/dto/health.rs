use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of WebSocket connections currently registered on the live channel.
    pub live_connections: usize,
}

impl HealthResponse {
    /// Storage reachable; lobby operations can proceed.
    pub fn ok(live_connections: usize) -> Self {
        Self {
            status: "ok".to_string(),
            live_connections,
        }
    }

    /// No storage backend installed; every membership operation fails fast.
    pub fn degraded(live_connections: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            live_connections,
        }
    }
}
