use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{ActionResponse, SweepResponse},
        board::{BoardSummary, CreateBoardRequest},
    },
    error::AppError,
    services::{admin_service, board_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints for opening boards and removing players.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/boards", post(create_board))
        .route(
            "/admin/boards/{board_id}/players/{player_id}",
            delete(evict_player),
        )
        .route("/admin/players/sweep", post(sweep_players))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Open a new board under a freshly drawn pin.
#[utoipa::path(
    post,
    path = "/admin/boards",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    request_body = CreateBoardRequest,
    responses(
        (status = 201, description = "Board created", body = BoardSummary),
        (status = 400, description = "Invalid board name"),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_board(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateBoardRequest>>,
) -> Result<(StatusCode, Json<BoardSummary>), AppError> {
    let summary = board_service::create_board(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Remove an inactive player from its board and notify the board room.
#[utoipa::path(
    delete,
    path = "/admin/boards/{board_id}/players/{player_id}",
    tag = "admin",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        ("board_id" = Uuid, Path, description = "Board the player belongs to"),
        ("player_id" = Uuid, Path, description = "Player to remove")
    ),
    responses(
        (status = 200, description = "Player removed", body = ActionResponse),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 404, description = "Board not found or player not a member"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn evict_player(
    State(state): State<SharedState>,
    Path((board_id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        admin_service::evict_player(&state, board_id, player_id).await?,
    ))
}

/// Delete player records that are no longer listed by any board.
#[utoipa::path(
    post,
    path = "/admin/players/sweep",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse),
        (status = 401, description = "Missing or invalid admin token"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn sweep_players(
    State(state): State<SharedState>,
) -> Result<Json<SweepResponse>, AppError> {
    Ok(Json(admin_service::sweep_players(&state).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    match state.config().admin_token() {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "no admin token configured; admin routes are disabled".into(),
        )),
    }
}
