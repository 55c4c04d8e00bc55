use std::time::Instant;

use log::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::game::clock::TimeControl;
use crate::game::state::EndReason;
use crate::models::{
    ActionRequest, ActionResponse, AppState, CreateGameRequest, CreateGameResponse,
    PollQuery, PollResponse, ServerGame,
};

pub fn handle_create(
    state: &AppState,
    req: CreateGameRequest,
    now: Instant,
) -> Result<CreateGameResponse, ApiError> {
    if req.white_user_id.is_empty() || req.black_user_id.is_empty() {
        return Err(ApiError::BadRequest("both players are required".into()));
    }
    if req.white_user_id == req.black_user_id {
        return Err(ApiError::BadRequest("players must differ".into()));
    }
    let time_control = req
        .time_control
        .as_deref()
        .map_or(state.config.default_time_control, TimeControl::parse_or_default);

    let game_id = Uuid::new_v4().to_string();
    info!(
        "creating game {game_id}: {} vs {} at {time_control}",
        req.white_user_id, req.black_user_id
    );
    let game = ServerGame::new(
        game_id.clone(),
        req.white_user_id,
        req.black_user_id,
        time_control,
        now,
    );
    state.games().insert(game_id.clone(), game);
    Ok(CreateGameResponse { game_id })
}

pub fn handle_poll(
    state: &AppState,
    query: &PollQuery,
    now: Instant,
) -> Result<PollResponse, ApiError> {
    let mut games = state.games();
    let game = games
        .get_mut(&query.game_id)
        .ok_or(ApiError::GameNotFound)?;
    if game.color_of(&query.user_id).is_none() {
        return Err(ApiError::NotAPlayer);
    }
    Ok(game.poll_view(&query.user_id, now))
}

/// Apply one player action to its game.
pub fn handle_action(
    state: &AppState,
    req: ActionRequest,
    now: Instant,
) -> Result<ActionResponse, ApiError> {
    if req.game_id().is_empty() || req.user_id().is_empty() {
        return Err(ApiError::BadRequest("game_id and user_id are required".into()));
    }
    let mut games = state.games();
    let game = games.get_mut(req.game_id()).ok_or(ApiError::GameNotFound)?;
    let color = game.color_of(req.user_id()).ok_or(ApiError::NotAPlayer)?;

    match req {
        ActionRequest::Move(sub) => game.play(color, &sub, now).inspect_err(|e| {
            warn!("game {}: rejected {} from {color}: {e}", sub.game_id, sub.mv);
        }),
        ActionRequest::Signal(sig) => {
            game.relay_signal(color, sig.signal_type, sig.signal_data);
            Ok(ActionResponse::with_status("signal_sent"))
        }
        ActionRequest::Timeout(t) => Ok(game.concede(t.loser_color, EndReason::Timeout)),
        ActionRequest::Resign(_) => Ok(game.concede(color, EndReason::Resign)),
        ActionRequest::Draw(_) => Ok(game.agree_draw()),
        ActionRequest::OfferRematch(p) => game.offer_rematch(&p.user_id),
        ActionRequest::DeclineRematch(p) => game.decline_rematch(&p.user_id),
        ActionRequest::AcceptRematch(p) => {
            let next = game.accept_rematch(&p.user_id, Uuid::new_v4().to_string(), now)?;
            let response = ActionResponse {
                new_game_id: Some(next.id.clone()),
                player_color: Some(color.opposite()),
                ..ActionResponse::with_status("rematch_accepted")
            };
            games.insert(next.id.clone(), next);
            Ok(response)
        }
    }
}

