use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod boards;
pub mod docs;
pub mod health;
pub mod players;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(websocket::router())
        .merge(boards::router())
        .merge(players::router())
        .merge(admin::router(state.clone()))
        .merge(docs::router())
        .with_state(state)
}
