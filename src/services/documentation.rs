use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trivia Board Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::boards::get_board,
        crate::routes::players::get_player,
        crate::routes::players::update_score,
        crate::routes::admin::create_board,
        crate::routes::admin::evict_player,
        crate::routes::admin::sweep_players,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::LobbyInboundMessage,
            crate::dto::ws::LobbyOutboundMessage,
            crate::dto::ws::ErrorReason,
            crate::dto::board::CreateBoardRequest,
            crate::dto::board::BoardSummary,
            crate::dto::player::PlayerSummary,
            crate::dto::player::ScoreUpdateRequest,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::SweepResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobby", description = "WebSocket lobby for joining and leaving boards"),
        (name = "public", description = "Board rosters and player records"),
        (name = "admin", description = "Board creation and player removal (requires X-Admin-Token)"),
    )
)]
pub struct ApiDoc;
