use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report degraded mode and live connection count while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.session_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    let live_connections = state.live().connection_count();
    if state.is_degraded() {
        HealthResponse::degraded(live_connections)
    } else {
        HealthResponse::ok(live_connections)
    }
}
