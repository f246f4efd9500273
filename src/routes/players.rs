use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::player::{PlayerSummary, ScoreUpdateRequest},
    error::AppError,
    services::player_service,
    state::SharedState,
};

/// Player lookups and score updates.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/players/{id}", get(get_player))
        .route("/players/{id}/score", put(update_score))
}

/// Retrieve a player by identifier.
#[utoipa::path(
    get,
    path = "/players/{id}",
    tag = "public",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player", body = PlayerSummary),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn get_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerSummary>, AppError> {
    Ok(Json(player_service::get_player(&state, id).await?))
}

/// Overwrite a player's score.
#[utoipa::path(
    put,
    path = "/players/{id}/score",
    tag = "public",
    params(("id" = Uuid, Path, description = "Player identifier")),
    request_body = ScoreUpdateRequest,
    responses(
        (status = 200, description = "Score updated", body = PlayerSummary),
        (status = 400, description = "Score out of range"),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn update_score(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ScoreUpdateRequest>>,
) -> Result<Json<PlayerSummary>, AppError> {
    Ok(Json(player_service::update_score(&state, id, payload).await?))
}
