use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{dto::board::BoardSummary, error::AppError, services::board_service, state::SharedState};

/// Public board lookups.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/boards/{pin}", get(get_board))
}

/// Return the board behind `pin` with its roster in join order.
#[utoipa::path(
    get,
    path = "/boards/{pin}",
    tag = "public",
    params(("pin" = String, Path, description = "Numeric board pin")),
    responses(
        (status = 200, description = "Board and roster", body = BoardSummary),
        (status = 404, description = "No board uses this pin"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn get_board(
    State(state): State<SharedState>,
    Path(pin): Path<String>,
) -> Result<Json<BoardSummary>, AppError> {
    Ok(Json(board_service::get_board_by_pin(&state, &pin).await?))
}
