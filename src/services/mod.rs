/// Admin operations: eviction and orphan sweep.
pub mod admin_service;
/// Board creation and roster lookups.
pub mod board_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Lobby coordinator driving each connection's join/leave flow.
pub mod lobby_service;
/// Board membership rules applied against the session store.
pub mod membership;
/// Player lookups and score updates.
pub mod player_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
