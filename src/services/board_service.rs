//! Board creation and public roster lookups.

use rand::{Rng, rng};
use tracing::{debug, info};

use crate::{
    dao::{models::BoardEntity, storage::StorageError},
    dto::{
        board::{BoardSummary, CreateBoardRequest},
        validation::validate_pin,
    },
    error::ServiceError,
    state::SharedState,
};

/// Fresh pins drawn before giving up on a crowded pin space.
const MAX_PIN_ATTEMPTS: usize = 10;

/// Open a new board under a random pin of the configured length.
pub async fn create_board(
    state: &SharedState,
    request: CreateBoardRequest,
) -> Result<BoardSummary, ServiceError> {
    let store = state.require_session_store().await?;
    let pin_length = state.config().pin_length();
    let name = request.name.trim();

    for attempt in 1..=MAX_PIN_ATTEMPTS {
        let board = BoardEntity::new(generate_pin(pin_length), name);
        match store.create_board(board.clone()).await {
            Ok(()) => {
                info!(board_id = %board.id, pin = %board.pin, "board created");
                return Ok(BoardSummary::from((board, Vec::new())));
            }
            Err(StorageError::Conflict { .. }) => {
                debug!(attempt, pin = %board.pin, "pin already in use; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(format!(
        "no free pin found after {MAX_PIN_ATTEMPTS} attempts"
    )))
}

/// Board identified by `pin` with its members in join order.
pub async fn get_board_by_pin(state: &SharedState, pin: &str) -> Result<BoardSummary, ServiceError> {
    validate_pin(pin).map_err(|_| ServiceError::InvalidPin(pin.to_string()))?;
    let store = state.require_session_store().await?;
    let board = store
        .find_board_by_pin(pin.to_string())
        .await?
        .ok_or_else(|| ServiceError::InvalidPin(pin.to_string()))?;
    let players = store.find_players(board.members.clone()).await?;
    Ok(BoardSummary::from((board, players)))
}

fn generate_pin(length: usize) -> String {
    let mut rng = rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
