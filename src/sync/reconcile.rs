//! Merging authoritative remote states into the local game.
//!
//! One [`Reconciler`] per online game holds the optimistic-concurrency
//! bookkeeping: the single pending move, how many server moves are
//! already reflected locally, and whether the end has been processed.

use log::{debug, info, warn};

use crate::engine::Move;
use crate::error::{GameError, GameResult};
use crate::game::state::{replay_moves, GameEnd, GameState};

use super::transport::AuthoritativeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Fewer moves than already reflected: an out-of-order response.
    Stale,
    /// The server has not caught up with our pending move yet.
    PendingEcho,
    /// A finished game never reopens.
    AlreadyFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    Ignored(IgnoreReason),
    /// Same list as local; only clocks were refreshed.
    ClocksOnly,
    /// Local position rebuilt from the remote list.
    Adopted { added: usize },
    /// The remote state declared the game over.
    Finished(GameEnd),
    /// The remote list could not be replayed; nothing changed.
    Rejected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciler {
    pending: Option<Move>,
    server_move_count: usize,
    end_processed: bool,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn pending(&self) -> Option<Move> {
        self.pending
    }

    #[must_use]
    pub const fn server_move_count(&self) -> usize {
        self.server_move_count
    }

    #[must_use]
    pub const fn end_processed(&self) -> bool {
        self.end_processed
    }

    /// Refuse a second move while one is unacknowledged.
    pub fn ensure_can_submit(&self) -> GameResult<()> {
        match self.pending {
            Some(_) => Err(GameError::MovePending),
            None => Ok(()),
        }
    }

    /// Mark `mv` as in flight. `move_number` is the ply it created,
    /// which the server checks against its own list.
    pub fn begin_submit(&mut self, mv: Move, local_len: usize) -> GameResult<u32> {
        self.ensure_can_submit()?;
        self.pending = Some(mv);
        Ok(u32::try_from(local_len).unwrap_or(u32::MAX))
    }

    /// The server recorded the move.
    pub fn acknowledge(&mut self, move_count: usize) {
        self.pending = None;
        self.server_move_count = self.server_move_count.max(move_count);
    }

    /// Submission failed: forget the pending move and the server count so
    /// the next poll's list repairs local state unconditionally.
    pub fn reject(&mut self) {
        if let Some(mv) = self.pending.take() {
            warn!("move {mv} was not accepted, waiting for the next poll");
        }
        self.server_move_count = 0;
    }

    /// Merge `remote` into `game`.
    pub fn apply(&mut self, game: &mut GameState, remote: &AuthoritativeState) -> Merge {
        if self.end_processed || (game.is_over() && !remote.finished) {
            return Merge::Ignored(IgnoreReason::AlreadyFinished);
        }
        let remote_len = remote.moves.len();
        let local_len = game.move_history.len();

        if remote_len < self.server_move_count {
            debug!(
                "ignoring {:?} state with {remote_len} moves, already at {}",
                remote.origin, self.server_move_count
            );
            return Merge::Ignored(IgnoreReason::Stale);
        }
        if self.pending.is_some() && remote_len < local_len && !remote.finished {
            return Merge::Ignored(IgnoreReason::PendingEcho);
        }

        let same_list = remote.moves == game.move_history;
        let added = remote_len.saturating_sub(local_len);
        if !same_list {
            match replay_moves(&remote.moves) {
                Ok(replay) => game.adopt(remote.moves.clone(), replay),
                Err(e) => {
                    warn!("rejecting {:?} state: {e}", remote.origin);
                    return Merge::Rejected(e.to_string());
                }
            }
        }

        game.clock.white_ms = remote.white_ms;
        game.clock.black_ms = remote.black_ms;
        self.server_move_count = remote_len;
        if self.pending.is_some_and(|mv| remote.moves.last() == Some(&mv)) {
            self.pending = None;
        }

        if let Some(end) = remote.declared_end() {
            self.end_processed = true;
            self.pending = None;
            if let Some(winner) = end.winner {
                game.position.to_move = winner.opposite();
            }
            game.finish(end);
            info!("remote declared game over: {:?}", game.end);
            return Merge::Finished(game.end.unwrap_or(end));
        }

        if same_list {
            Merge::ClocksOnly
        } else {
            Merge::Adopted { added }
        }
    }
}
