use std::collections::HashMap;
use std::time::Instant;

use log::{info, warn};

use crate::engine::{format_move_list, Color, Move};
use crate::error::ApiError;
use crate::game::clock::TimeControl;
use crate::game::state::{replay_moves, EndReason};

use super::messages::{
    ActionResponse, MoveSubmission, PollResponse, RematchStatus, ServerStatus, SignalEnvelope,
    SignalType,
};

/// One game as the server records it. The move list is append-only.
#[derive(Debug, Clone)]
pub struct ServerGame {
    pub id: String,
    pub white_user_id: String,
    pub black_user_id: String,
    pub time_control: TimeControl,
    pub moves: Vec<Move>,
    /// Clocks as of `last_move_at`.
    pub white_ms: u64,
    pub black_ms: u64,
    pub status: ServerStatus,
    pub winner: Option<Color>,
    pub end_reason: Option<EndReason>,
    pub last_move_at: Instant,
    pub rematch_offered_by: Option<String>,
    pub rematch_status: Option<RematchStatus>,
    pub rematch_game_id: Option<String>,
    /// Undelivered signals keyed by addressee.
    signals: HashMap<String, Vec<SignalEnvelope>>,
}

impl ServerGame {
    pub fn new(
        id: String,
        white_user_id: String,
        black_user_id: String,
        time_control: TimeControl,
        now: Instant,
    ) -> Self {
        Self {
            id,
            white_user_id,
            black_user_id,
            time_control,
            moves: Vec::new(),
            white_ms: time_control.initial_ms(),
            black_ms: time_control.initial_ms(),
            status: ServerStatus::Playing,
            winner: None,
            end_reason: None,
            last_move_at: now,
            rematch_offered_by: None,
            rematch_status: None,
            rematch_game_id: None,
            signals: HashMap::new(),
        }
    }

    pub fn color_of(&self, user_id: &str) -> Option<Color> {
        if user_id == self.white_user_id {
            Some(Color::White)
        } else if user_id == self.black_user_id {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn user_of(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_user_id,
            Color::Black => &self.black_user_id,
        }
    }

    /// Side to move, from the parity of the move list.
    pub fn current_player(&self) -> Color {
        if self.moves.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == ServerStatus::Finished
    }

    pub fn seconds_since_move(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.last_move_at).as_secs()
    }

    fn stored_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    /// Remaining time with the running side's thinking time taken off.
    pub fn clock_ms(&self, color: Color, now: Instant) -> u64 {
        let stored = self.stored_ms(color);
        if self.is_finished() || color != self.current_player() {
            return stored;
        }
        let elapsed = now.saturating_duration_since(self.last_move_at).as_millis() as u64;
        stored.saturating_sub(elapsed)
    }

    fn winner_id(&self) -> Option<String> {
        self.winner.map(|c| self.user_of(c).to_string())
    }

    /// Poll answer for `user_id`. Signals queued for that user are handed
    /// over and forgotten.
    pub fn poll_view(&mut self, user_id: &str, now: Instant) -> PollResponse {
        let signals = self.signals.remove(user_id).unwrap_or_default();
        PollResponse {
            game_id: self.id.clone(),
            white_user_id: self.white_user_id.clone(),
            black_user_id: self.black_user_id.clone(),
            time_control: self.time_control,
            status: self.status,
            current_player: self.current_player(),
            white_time: self.clock_ms(Color::White, now) / 1000,
            black_time: self.clock_ms(Color::Black, now) / 1000,
            move_history: format_move_list(&self.moves),
            move_number: self.moves.len() as u32,
            winner: self.winner_id(),
            end_reason: self.end_reason,
            seconds_since_move: self.seconds_since_move(now),
            rematch_offered_by: self.rematch_offered_by.clone(),
            rematch_status: self.rematch_status,
            rematch_game_id: self.rematch_game_id.clone(),
            signals,
        }
    }

    /// Queue a signal from `from` for the other player.
    pub fn relay_signal(&mut self, from: Color, kind: SignalType, data: String) {
        let envelope = SignalEnvelope {
            from: self.user_of(from).to_string(),
            kind,
            data,
        };
        let to = self.user_of(from.opposite()).to_string();
        self.signals.entry(to).or_default().push(envelope);
    }

    fn finish(&mut self, winner: Option<Color>, reason: EndReason) {
        self.status = ServerStatus::Finished;
        self.winner = winner;
        self.end_reason = Some(reason);
        info!(
            "game {} finished: {:?}, winner {:?}",
            self.id, reason, winner
        );
    }

    fn outcome(&self) -> ActionResponse {
        ActionResponse {
            winner: self.winner_id(),
            end_reason: self.end_reason,
            ..ActionResponse::with_status("finished")
        }
    }

    /// Append `sub.mv` for `color` after checking turn, sequence number and
    /// legality. The outcome is derived from the replayed position; what
    /// the client claims about it is only logged.
    pub fn play(
        &mut self,
        color: Color,
        sub: &MoveSubmission,
        now: Instant,
    ) -> Result<ActionResponse, ApiError> {
        if self.is_finished() {
            return Err(ApiError::BadRequest("game is not active".into()));
        }
        if color != self.current_player() {
            return Err(ApiError::BadRequest("not your turn".into()));
        }
        let expected = self.moves.len() as u32 + 1;
        if sub.move_number != expected {
            return Err(ApiError::StaleMove {
                expected,
                got: sub.move_number,
            });
        }

        let mut moves = self.moves.clone();
        moves.push(sub.mv);
        let replay = replay_moves(&moves)?;
        if replay.status != sub.game_status {
            warn!(
                "game {}: client reported {:?} after {}, position says {:?}",
                self.id, sub.game_status, sub.mv, replay.status
            );
        }

        let left = self.clock_ms(color, now) + self.time_control.increment_ms();
        match color {
            Color::White => self.white_ms = left,
            Color::Black => self.black_ms = left,
        }
        self.moves = moves;
        self.last_move_at = now;
        if let Some(end) = replay.end {
            self.finish(end.winner, end.reason);
        }

        Ok(ActionResponse {
            current_player: Some(self.current_player()),
            white_time: Some(self.white_ms / 1000),
            black_time: Some(self.black_ms / 1000),
            move_count: Some(self.moves.len()),
            ..ActionResponse::with_status(match self.status {
                ServerStatus::Playing => "playing",
                ServerStatus::Finished => "finished",
            })
        })
    }

    /// End the game with `loser` losing for `reason`. A game that is already
    /// over keeps its result.
    pub fn concede(&mut self, loser: Color, reason: EndReason) -> ActionResponse {
        if !self.is_finished() {
            self.finish(Some(loser.opposite()), reason);
        }
        self.outcome()
    }

    pub fn agree_draw(&mut self) -> ActionResponse {
        if !self.is_finished() {
            self.finish(None, EndReason::Draw);
        }
        self.outcome()
    }

    pub fn offer_rematch(&mut self, user_id: &str) -> Result<ActionResponse, ApiError> {
        if !self.is_finished() {
            return Err(ApiError::BadRequest("game is still in progress".into()));
        }
        match self.rematch_status {
            Some(RematchStatus::Accepted) => {
                return Err(ApiError::BadRequest("rematch already accepted".into()))
            }
            Some(RematchStatus::Pending)
                if self.rematch_offered_by.as_deref() == Some(user_id) =>
            {
                return Err(ApiError::BadRequest("rematch already offered".into()))
            }
            _ => {}
        }
        self.rematch_offered_by = Some(user_id.to_string());
        self.rematch_status = Some(RematchStatus::Pending);
        Ok(ActionResponse::with_status("rematch_offered"))
    }

    fn has_offer_for(&self, user_id: &str) -> bool {
        self.rematch_status == Some(RematchStatus::Pending)
            && self
                .rematch_offered_by
                .as_deref()
                .is_some_and(|by| by != user_id)
    }

    /// Accept the other player's offer. The new game has the colours
    /// swapped and the same time control.
    pub fn accept_rematch(
        &mut self,
        user_id: &str,
        new_id: String,
        now: Instant,
    ) -> Result<ServerGame, ApiError> {
        if !self.has_offer_for(user_id) {
            return Err(ApiError::BadRequest("no rematch to accept".into()));
        }
        let next = ServerGame::new(
            new_id,
            self.black_user_id.clone(),
            self.white_user_id.clone(),
            self.time_control,
            now,
        );
        self.rematch_status = Some(RematchStatus::Accepted);
        self.rematch_game_id = Some(next.id.clone());
        info!("game {} rematched as {}", self.id, next.id);
        Ok(next)
    }

    pub fn decline_rematch(&mut self, user_id: &str) -> Result<ActionResponse, ApiError> {
        if !self.has_offer_for(user_id) {
            return Err(ApiError::BadRequest("no rematch to decline".into()));
        }
        self.rematch_status = Some(RematchStatus::Declined);
        Ok(ActionResponse::with_status("rematch_declined"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::game::state::GameStatus;

    fn game(now: Instant) -> ServerGame {
        ServerGame::new(
            "g1".into(),
            "alice".into(),
            "bob".into(),
            TimeControl::new(1, 2),
            now,
        )
    }

    fn submit(mv: &str, move_number: u32, game_status: GameStatus) -> MoveSubmission {
        MoveSubmission {
            game_id: "g1".into(),
            user_id: String::new(),
            mv: mv.parse().unwrap(),
            game_status,
            winner_id: None,
            move_number,
        }
    }

    fn play_all(g: &mut ServerGame, moves: &[&str], now: Instant) {
        for (i, mv) in moves.iter().enumerate() {
            let color = g.current_player();
            let sub = submit(mv, i as u32 + 1, GameStatus::Playing);
            g.play(color, &sub, now).unwrap();
        }
    }

    #[test]
    fn test_move_charges_elapsed_time_and_adds_increment() {
        let start = Instant::now();
        let mut g = game(start);
        let resp = g
            .play(
                Color::White,
                &submit("e2-e4", 1, GameStatus::Playing),
                start + Duration::from_secs(10),
            )
            .unwrap();
        assert_eq!(resp.status, "playing");
        assert_eq!(resp.move_count, Some(1));
        assert_eq!(resp.current_player, Some(Color::Black));
        assert_eq!(g.white_ms, 60_000 - 10_000 + 2_000);
        assert_eq!(resp.white_time, Some(52));
        assert_eq!(g.black_ms, 60_000);
    }

    #[test]
    fn test_poll_reports_running_clock_net_of_elapsed() {
        let start = Instant::now();
        let mut g = game(start);
        let view = g.poll_view("alice", start + Duration::from_secs(15));
        assert_eq!(view.white_time, 45);
        assert_eq!(view.black_time, 60);
        assert_eq!(view.seconds_since_move, 15);
        assert_eq!(view.move_number, 0);
    }

    #[test]
    fn test_turn_and_sequence_are_enforced() {
        let now = Instant::now();
        let mut g = game(now);
        let err = g
            .play(Color::Black, &submit("e7-e5", 1, GameStatus::Playing), now)
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        let err = g
            .play(Color::White, &submit("e2-e4", 3, GameStatus::Playing), now)
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::StaleMove {
                expected: 1,
                got: 3
            }
        ));
        let err = g
            .play(Color::White, &submit("e2-e5", 1, GameStatus::Playing), now)
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(g.moves.is_empty());
    }

    #[test]
    fn test_mate_finishes_game_with_mover_as_winner() {
        let now = Instant::now();
        let mut g = game(now);
        play_all(&mut g, &["f2-f3", "e7-e5", "g2-g4"], now);
        let resp = g
            .play(Color::Black, &submit("d8-h4", 4, GameStatus::Checkmate), now)
            .unwrap();
        assert_eq!(resp.status, "finished");
        assert_eq!(g.winner, Some(Color::Black));
        assert_eq!(g.end_reason, Some(EndReason::Checkmate));
        let view = g.poll_view("alice", now);
        assert_eq!(view.winner.as_deref(), Some("bob"));
        assert!(g
            .play(Color::White, &submit("a2-a3", 5, GameStatus::Playing), now)
            .is_err());
    }

    #[test]
    fn test_resign_after_finish_keeps_first_result() {
        let now = Instant::now();
        let mut g = game(now);
        let resp = g.concede(Color::White, EndReason::Timeout);
        assert_eq!(resp.winner.as_deref(), Some("bob"));
        let again = g.concede(Color::Black, EndReason::Resign);
        assert_eq!(again.winner.as_deref(), Some("bob"));
        assert_eq!(again.end_reason, Some(EndReason::Timeout));
    }

    #[test]
    fn test_signals_are_delivered_once_to_the_other_player() {
        let now = Instant::now();
        let mut g = game(now);
        g.relay_signal(Color::White, SignalType::Offer, "sdp".into());
        assert!(g.poll_view("alice", now).signals.is_empty());
        let signals = g.poll_view("bob", now).signals;
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].from, "alice");
        assert!(g.poll_view("bob", now).signals.is_empty());
    }

    #[test]
    fn test_rematch_swaps_colours() {
        let now = Instant::now();
        let mut g = game(now);
        assert!(g.offer_rematch("alice").is_err());
        g.agree_draw();
        g.offer_rematch("alice").unwrap();
        assert!(g.offer_rematch("alice").is_err());
        assert!(g.accept_rematch("alice", "g2".into(), now).is_err());
        let next = g.accept_rematch("bob", "g2".into(), now).unwrap();
        assert_eq!(next.white_user_id, "bob");
        assert_eq!(next.black_user_id, "alice");
        assert_eq!(next.time_control, g.time_control);
        assert_eq!(g.rematch_status, Some(RematchStatus::Accepted));
        assert_eq!(g.rematch_game_id.as_deref(), Some("g2"));
    }
}
