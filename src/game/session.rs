//! One game seen from the local player's seat.
//!
//! [`GameSession`] ties the game state, the turn machine, timers and the
//! reconciler together. It never touches the network itself: every call
//! returns a [`Reaction`] listing what the caller has to send, schedule or
//! show.

use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;

use crate::engine::{choose_move, Color, Difficulty, Move};
use crate::error::{GameError, GameResult, SnapshotError, SyncResult};
use crate::sync::protocol::{DrawAction, MoveFrame, PeerMessage};
use crate::sync::reconcile::{Merge, Reconciler};
use crate::sync::transport::{
    AuthoritativeState, Delivery, Outgoing, OutgoingMove, TransportKind,
};

use super::clock::{InactivityTick, InactivityTimer, TimeControl};
use super::machine::{enter, transition, Effect, Input, Opponent, Phase, Seat, Step};
use super::snapshot::{Preferences, Snapshot, SnapshotStore};
use super::state::{GameEnd, GameState, MoveRecord};

/// What the caller must do after a session call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub outgoing: Vec<Outgoing>,
    /// Call [`GameSession::play_computer_move`] after this delay.
    pub computer_move_in: Option<Duration>,
    pub moved: Option<MoveRecord>,
    pub board_changed: bool,
    pub ended: Option<GameEnd>,
    pub inactivity_warning: bool,
    pub draw_offered: bool,
    pub draw_declined: bool,
}

pub struct GameSession {
    game: GameState,
    seat: Seat,
    phase: Phase,
    inactivity: InactivityTimer,
    reconciler: Reconciler,
    store: Option<SnapshotStore>,
    preferences: Preferences,
    draw_offered_by_me: bool,
    draw_offered_to_me: bool,
}

impl GameSession {
    /// A fresh game against the computer.
    pub fn offline(
        time_control: TimeControl,
        local: Color,
        difficulty: Difficulty,
        store: Option<SnapshotStore>,
    ) -> (Self, Reaction) {
        let seat = Seat {
            local,
            opponent: Opponent::Computer { difficulty },
        };
        Self::start(GameState::new(time_control), seat, store, Preferences::default())
    }

    pub fn online(time_control: TimeControl, local: Color) -> (Self, Reaction) {
        let seat = Seat {
            local,
            opponent: Opponent::Remote,
        };
        Self::start(GameState::new(time_control), seat, None, Preferences::default())
    }

    /// Pick up a saved offline game. Finished or missing snapshots give `None`.
    pub fn resume(store: SnapshotStore) -> Result<Option<(Self, Reaction)>, SnapshotError> {
        let Some(snapshot) = store.load()? else {
            return Ok(None);
        };
        if snapshot.game.is_over() {
            store.discard()?;
            return Ok(None);
        }
        let seat = Seat {
            local: snapshot.local,
            opponent: Opponent::Computer {
                difficulty: snapshot.difficulty,
            },
        };
        Ok(Some(Self::start(
            snapshot.game,
            seat,
            Some(store),
            snapshot.preferences,
        )))
    }

    fn start(
        game: GameState,
        seat: Seat,
        store: Option<SnapshotStore>,
        preferences: Preferences,
    ) -> (Self, Reaction) {
        let step = enter(&seat, game.current_player(), game.end.as_ref());
        let mut session = Self {
            game,
            seat,
            phase: step.phase,
            inactivity: InactivityTimer::default(),
            reconciler: Reconciler::new(),
            store,
            preferences,
            draw_offered_by_me: false,
            draw_offered_to_me: false,
        };
        let mut reaction = Reaction::default();
        session.run(step, &mut reaction);
        (session, reaction)
    }

    #[must_use]
    pub const fn game(&self) -> &GameState {
        &self.game
    }

    #[must_use]
    pub const fn seat(&self) -> &Seat {
        &self.seat
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn inactivity(&self) -> &InactivityTimer {
        &self.inactivity
    }

    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub const fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    #[must_use]
    pub const fn draw_offer_pending(&self) -> bool {
        self.draw_offered_to_me
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
        self.persist();
    }

    pub fn try_local_move(&mut self, mv: Move) -> GameResult<Reaction> {
        match self.phase {
            Phase::WaitingLocal => {}
            Phase::Finished => return Err(GameError::GameOver),
            Phase::WaitingRemote | Phase::AiThinking => return Err(GameError::NotYourTurn),
        }
        if self.seat.is_online() {
            self.reconciler.ensure_can_submit()?;
        }
        let record = self.game.make_move(mv)?;
        self.draw_offered_to_me = false;
        let mut reaction = self.advance(Input::LocalMoved {
            mv,
            next: self.game.current_player(),
            end: self.game.end,
        });
        reaction.moved = Some(record);
        Ok(reaction)
    }

    /// Play the scheduled computer move. A no-op once the phase has moved on.
    pub fn play_computer_move<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Reaction {
        let Opponent::Computer { difficulty } = self.seat.opponent else {
            return Reaction::default();
        };
        if self.phase != Phase::AiThinking {
            debug!("dropping scheduled computer move in {:?}", self.phase);
            return Reaction::default();
        }
        let Some(mv) = choose_move(&self.game.position, difficulty, rng) else {
            return Reaction::default();
        };
        match self.game.make_move(mv) {
            Ok(record) => {
                let mut reaction = self.advance(Input::ComputerMoved {
                    next: self.game.current_player(),
                    end: self.game.end,
                });
                reaction.moved = Some(record);
                reaction
            }
            Err(e) => {
                warn!("computer chose unplayable {mv}: {e}");
                Reaction::default()
            }
        }
    }

    /// Merge a state vouched for by the server or the peer.
    pub fn apply_remote(&mut self, remote: &AuthoritativeState) -> Reaction {
        let mut reaction = match self.reconciler.apply(&mut self.game, remote) {
            Merge::Adopted { added } => {
                debug!("adopted {:?} state, {added} new moves", remote.origin);
                self.draw_offered_by_me = false;
                self.draw_offered_to_me = false;
                let mut reaction = self.advance(Input::Synced {
                    next: self.game.current_player(),
                    end: self.game.end,
                });
                reaction.board_changed = true;
                reaction
            }
            Merge::Finished(end) => {
                let mut reaction = self.advance(Input::Ended {
                    end,
                    local_origin: false,
                });
                reaction.board_changed = true;
                reaction
            }
            Merge::ClocksOnly => Reaction::default(),
            Merge::Ignored(_) | Merge::Rejected(_) => return Reaction::default(),
        };
        if remote.origin == TransportKind::Server && !self.game.is_over() {
            if let Some(secs) = remote.seconds_since_move {
                self.inactivity.sync_with_server(secs);
            }
        }
        reaction.board_changed |= remote.origin == TransportKind::Server;
        reaction
    }

    pub fn on_peer_message(&mut self, msg: PeerMessage) -> Reaction {
        let opponent = self.seat.local.opposite();
        match msg {
            PeerMessage::Move(frame) => self.on_peer_move(frame),
            PeerMessage::TimeSync(clocks) => {
                if !self.game.is_over() {
                    self.game.clock.white_ms = clocks.white_ms;
                    self.game.clock.black_ms = clocks.black_ms;
                }
                Reaction::default()
            }
            PeerMessage::Resign => match self.game.resign(opponent) {
                Ok(end) => self.remote_end(end),
                Err(_) => Reaction::default(),
            },
            PeerMessage::Timeout { loser } => match self.game.time_out(loser) {
                Some(end) => self.remote_end(end),
                None => Reaction::default(),
            },
            PeerMessage::Draw(DrawAction::Offer) => {
                if self.game.is_over() {
                    return Reaction::default();
                }
                self.draw_offered_to_me = true;
                Reaction {
                    draw_offered: true,
                    ..Reaction::default()
                }
            }
            PeerMessage::Draw(DrawAction::Accept) => {
                if !self.draw_offered_by_me {
                    warn!("peer accepted a draw that was never offered");
                    return Reaction::default();
                }
                self.draw_offered_by_me = false;
                match self.game.agree_draw() {
                    Ok(end) => self.remote_end(end),
                    Err(_) => Reaction::default(),
                }
            }
            PeerMessage::Draw(DrawAction::Decline) => {
                self.draw_offered_by_me = false;
                Reaction {
                    draw_declined: true,
                    ..Reaction::default()
                }
            }
            PeerMessage::Ping(_) | PeerMessage::Pong(_) => Reaction::default(),
        }
    }

    /// A move frame becomes a full state so the reconciler decides on it.
    fn on_peer_move(&mut self, frame: MoveFrame) -> Reaction {
        let expected = self.game.move_history.len() + 1;
        if usize::try_from(frame.move_number).ok() != Some(expected) {
            debug!(
                "ignoring peer move {} numbered {}, expected {expected}",
                frame.mv, frame.move_number
            );
            return Reaction::default();
        }
        let mut moves = self.game.move_history.clone();
        moves.push(frame.mv);
        self.apply_remote(&AuthoritativeState {
            origin: TransportKind::Peer,
            moves,
            white_ms: frame.white_ms,
            black_ms: frame.black_ms,
            finished: false,
            winner: None,
            end_reason: None,
            seconds_since_move: None,
        })
    }

    fn remote_end(&mut self, end: GameEnd) -> Reaction {
        let mut reaction = self.advance(Input::Ended {
            end,
            local_origin: false,
        });
        reaction.board_changed = true;
        reaction
    }

    /// Run the clock of the side to move.
    pub fn tick_clock(&mut self, elapsed: Duration) -> Reaction {
        if self.phase == Phase::Finished {
            return Reaction::default();
        }
        let side = self.game.current_player();
        let shown = self.game.clock.remaining_ms(side) / 1000;
        if !self.game.clock.tick(side, elapsed) {
            if self.game.clock.remaining_ms(side) / 1000 != shown {
                self.persist();
            }
            return Reaction::default();
        }
        info!("{side} flagged");
        match self.game.time_out(side) {
            Some(end) => self.local_end(end),
            None => Reaction::default(),
        }
    }

    /// One second of the inactivity countdown.
    pub fn tick_inactivity(&mut self) -> Reaction {
        if self.phase == Phase::Finished {
            return Reaction::default();
        }
        let side = self.game.current_player();
        match self.inactivity.tick() {
            InactivityTick::Running => Reaction::default(),
            InactivityTick::Warning => Reaction {
                inactivity_warning: side == self.seat.local,
                ..Reaction::default()
            },
            InactivityTick::Expired => {
                info!("{side} timed out for inactivity");
                match self.game.time_out(side) {
                    Some(end) => self.local_end(end),
                    None => Reaction::default(),
                }
            }
        }
    }

    pub fn resign(&mut self) -> GameResult<Reaction> {
        let end = self.game.resign(self.seat.local)?;
        Ok(self.local_end(end))
    }

    /// Offer a draw. The computer always declines.
    pub fn offer_draw(&mut self) -> GameResult<Reaction> {
        let left = self.game.offer_draw(self.seat.local)?;
        debug!("draw offered, {left} offers left");
        Ok(match self.seat.opponent {
            Opponent::Remote => {
                self.draw_offered_by_me = true;
                Reaction {
                    outgoing: vec![Outgoing::Draw(DrawAction::Offer)],
                    ..Reaction::default()
                }
            }
            Opponent::Computer { .. } => Reaction {
                draw_declined: true,
                ..Reaction::default()
            },
        })
    }

    pub fn accept_draw(&mut self) -> GameResult<Reaction> {
        if !self.draw_offered_to_me {
            return Err(GameError::NoDrawOffer);
        }
        self.draw_offered_to_me = false;
        let end = self.game.agree_draw()?;
        Ok(self.local_end(end))
    }

    pub fn decline_draw(&mut self) -> GameResult<Reaction> {
        if !self.draw_offered_to_me {
            return Err(GameError::NoDrawOffer);
        }
        self.draw_offered_to_me = false;
        Ok(Reaction {
            outgoing: vec![Outgoing::Draw(DrawAction::Decline)],
            ..Reaction::default()
        })
    }

    /// Feed back how sending `sent` went.
    pub fn on_delivery(&mut self, sent: &Outgoing, result: &SyncResult<Delivery>) {
        match (sent, result) {
            (Outgoing::Move(_), Ok(Delivery::MoveAccepted { move_count })) => {
                self.reconciler.acknowledge(*move_count);
            }
            (Outgoing::Move(out), Ok(_)) => {
                self.reconciler
                    .acknowledge(usize::try_from(out.move_number).unwrap_or(usize::MAX));
            }
            (Outgoing::Move(out), Err(e)) => {
                warn!("move {} rejected: {e}", out.mv);
                self.reconciler.reject();
            }
            (Outgoing::Draw(DrawAction::Offer), Err(e)) => {
                warn!("draw offer not delivered: {e}");
                self.draw_offered_by_me = false;
            }
            (_, Err(e)) => warn!("{sent:?} not delivered: {e}"),
            (_, Ok(_)) => {}
        }
    }

    fn local_end(&mut self, end: GameEnd) -> Reaction {
        let mut reaction = self.advance(Input::Ended {
            end,
            local_origin: true,
        });
        reaction.board_changed = true;
        reaction
    }

    fn advance(&mut self, input: Input) -> Reaction {
        let step = transition(&self.seat, self.phase, input);
        let mut reaction = Reaction {
            board_changed: matches!(
                input,
                Input::LocalMoved { .. } | Input::ComputerMoved { .. }
            ),
            ..Reaction::default()
        };
        self.run(step, &mut reaction);
        reaction
    }

    fn run(&mut self, step: Step, reaction: &mut Reaction) {
        let was = self.phase;
        self.phase = step.phase;
        if was != Phase::Finished && step.phase == Phase::Finished {
            reaction.ended = self.game.end;
        }
        for effect in step.effects {
            match effect {
                Effect::ScheduleComputerMove(delay) => reaction.computer_move_in = Some(delay),
                Effect::Submit(mv) => {
                    match self.reconciler.begin_submit(mv, self.game.move_history.len()) {
                        Ok(move_number) => reaction.outgoing.push(Outgoing::Move(OutgoingMove {
                            mv,
                            move_number,
                            status: self.game.status,
                            winner: self.game.end.and_then(|end| end.winner),
                            white_ms: self.game.clock.white_ms,
                            black_ms: self.game.clock.black_ms,
                        })),
                        Err(e) => warn!("not submitting {mv}: {e}"),
                    }
                }
                Effect::ReportEnd(end) => reaction.outgoing.push(Outgoing::End(end)),
                Effect::ResetInactivity => self.inactivity.reset(),
                Effect::Persist => self.persist(),
                Effect::DiscardSnapshot => self.discard(),
            }
        }
    }

    fn persist(&self) {
        let (Some(store), Opponent::Computer { difficulty }) = (&self.store, self.seat.opponent)
        else {
            return;
        };
        if self.game.is_over() {
            return;
        }
        let snapshot = Snapshot {
            game: self.game.clone(),
            local: self.seat.local,
            difficulty,
            preferences: self.preferences,
        };
        if let Err(e) = store.save(&snapshot) {
            warn!("could not save snapshot: {e}");
        }
    }

    fn discard(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.discard() {
                warn!("could not remove snapshot: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::game::state::{EndReason, GameStatus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn scratch_store() -> SnapshotStore {
        let dir = std::env::temp_dir().join(format!("ligachess-session-{}", uuid::Uuid::new_v4()));
        SnapshotStore::new(dir.join("offline.json"))
    }

    fn sent_move(reaction: &Reaction) -> OutgoingMove {
        match reaction.outgoing.as_slice() {
            [Outgoing::Move(out)] => *out,
            other => panic!("expected one move, got {other:?}"),
        }
    }

    #[test]
    fn test_computer_answers_local_move() {
        let (mut session, start) =
            GameSession::offline(TimeControl::RAPID, Color::White, Difficulty::Hard, None);
        assert_eq!(start.computer_move_in, None);
        assert_eq!(session.phase(), Phase::WaitingLocal);

        let reaction = session.try_local_move(mv("e2-e4")).unwrap();
        assert_eq!(session.phase(), Phase::AiThinking);
        assert_eq!(reaction.computer_move_in, Some(Difficulty::Hard.think_delay()));
        assert!(reaction.outgoing.is_empty());
        assert!(matches!(
            session.try_local_move(mv("d2-d4")),
            Err(GameError::NotYourTurn)
        ));

        let mut rng = StdRng::seed_from_u64(11);
        let reply = session.play_computer_move(&mut rng);
        assert!(reply.moved.is_some());
        assert_eq!(session.game().move_history.len(), 2);
        assert_eq!(session.phase(), Phase::WaitingLocal);
    }

    #[test]
    fn test_computer_opens_when_local_plays_black() {
        let (mut session, start) =
            GameSession::offline(TimeControl::BLITZ, Color::Black, Difficulty::Easy, None);
        assert_eq!(session.phase(), Phase::AiThinking);
        assert_eq!(start.computer_move_in, Some(Difficulty::Easy.think_delay()));
        session.play_computer_move(&mut StdRng::seed_from_u64(3));
        assert_eq!(session.game().current_player(), Color::Black);
    }

    #[test]
    fn test_scheduled_move_after_resignation_is_a_no_op() {
        let (mut session, _) =
            GameSession::offline(TimeControl::RAPID, Color::White, Difficulty::Easy, None);
        session.try_local_move(mv("e2-e4")).unwrap();
        let reaction = session.resign().unwrap();
        assert_eq!(reaction.ended.map(|e| e.reason), Some(EndReason::Resign));
        let late = session.play_computer_move(&mut StdRng::seed_from_u64(1));
        assert_eq!(late, Reaction::default());
        assert_eq!(session.game().move_history.len(), 1);
    }

    #[test]
    fn test_snapshot_follows_offline_game() {
        let store = scratch_store();
        let (mut session, _) = GameSession::offline(
            TimeControl::RAPID,
            Color::White,
            Difficulty::Medium,
            Some(store.clone()),
        );
        session.try_local_move(mv("g1-f3")).unwrap();

        let (resumed, reaction) = GameSession::resume(store.clone()).unwrap().unwrap();
        assert_eq!(resumed.game().move_history, vec![mv("g1-f3")]);
        assert_eq!(resumed.phase(), Phase::AiThinking);
        assert!(reaction.computer_move_in.is_some());

        session.resign().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(GameSession::resume(store).unwrap().is_none());
    }

    #[test]
    fn test_resumed_game_keeps_time_spent_thinking() {
        let store = scratch_store();
        let (mut session, _) = GameSession::offline(
            TimeControl::RAPID,
            Color::White,
            Difficulty::Easy,
            Some(store.clone()),
        );
        session.tick_clock(Duration::from_millis(400));
        session.tick_clock(Duration::from_millis(1_100));
        session.tick_clock(Duration::from_millis(300));

        let (resumed, _) = GameSession::resume(store.clone()).unwrap().unwrap();
        assert_eq!(resumed.game().clock.white_ms, 600_000 - 1_500);
        assert_eq!(resumed.game().clock.black_ms, 600_000);
        assert!(resumed.game().move_history.is_empty());
        store.discard().unwrap();
    }

    #[test]
    fn test_online_move_is_submitted_then_rolled_back() {
        let (mut session, _) = GameSession::online(TimeControl::RAPID, Color::White);
        let reaction = session.try_local_move(mv("e2-e4")).unwrap();
        let out = sent_move(&reaction);
        assert_eq!(out.move_number, 1);
        assert_eq!(out.status, GameStatus::Playing);
        assert_eq!(session.phase(), Phase::WaitingRemote);

        session.on_delivery(
            &Outgoing::Move(out),
            &Err(SyncError::Rejected {
                status: 409,
                body: "stale".into(),
            }),
        );
        assert_eq!(session.reconciler().pending(), None);

        let repaired = session.apply_remote(&AuthoritativeState {
            origin: TransportKind::Server,
            moves: Vec::new(),
            white_ms: 600_000,
            black_ms: 600_000,
            finished: false,
            winner: None,
            end_reason: None,
            seconds_since_move: Some(5),
        });
        assert!(repaired.board_changed);
        assert!(session.game().move_history.is_empty());
        assert_eq!(session.phase(), Phase::WaitingLocal);
        assert_eq!(session.inactivity().remaining_secs(), 55);
    }

    #[test]
    fn test_second_move_waits_for_acknowledgement() {
        let (mut white, _) = GameSession::online(TimeControl::RAPID, Color::White);
        let first = sent_move(&white.try_local_move(mv("e2-e4")).unwrap());
        white.on_peer_message(PeerMessage::Move(MoveFrame {
            mv: mv("e7-e5"),
            white_ms: 600_000,
            black_ms: 600_000,
            game_status: GameStatus::Playing,
            move_number: 2,
        }));
        assert_eq!(white.phase(), Phase::WaitingLocal);
        assert_eq!(white.reconciler().pending(), Some(first.mv));
        assert!(matches!(
            white.try_local_move(mv("g1-f3")),
            Err(GameError::MovePending)
        ));

        white.on_delivery(&Outgoing::Move(first), &Ok(Delivery::MoveAccepted { move_count: 1 }));
        let second = sent_move(&white.try_local_move(mv("g1-f3")).unwrap());
        assert_eq!(second.move_number, 3);
    }

    #[test]
    fn test_peer_move_with_wrong_number_is_ignored() {
        let (mut black, _) = GameSession::online(TimeControl::RAPID, Color::Black);
        assert_eq!(black.phase(), Phase::WaitingRemote);
        let frame = MoveFrame {
            mv: mv("e2-e4"),
            white_ms: 599_000,
            black_ms: 600_000,
            game_status: GameStatus::Playing,
            move_number: 3,
        };
        assert_eq!(black.on_peer_message(PeerMessage::Move(frame)), Reaction::default());

        let applied = black.on_peer_message(PeerMessage::Move(MoveFrame {
            move_number: 1,
            ..frame
        }));
        assert!(applied.board_changed);
        assert_eq!(black.phase(), Phase::WaitingLocal);
        assert_eq!(black.game().clock.white_ms, 599_000);
    }

    #[test]
    fn test_flag_fall_ends_and_reports_online() {
        let (mut session, _) = GameSession::online(TimeControl::BLITZ, Color::White);
        let reaction = session.tick_clock(Duration::from_secs(180));
        let end = reaction.ended.unwrap();
        assert_eq!(end.reason, EndReason::Timeout);
        assert_eq!(end.winner, Some(Color::Black));
        assert_eq!(reaction.outgoing, vec![Outgoing::End(end)]);
        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(session.tick_clock(Duration::from_secs(1)), Reaction::default());
    }

    #[test]
    fn test_inactivity_warns_then_ends() {
        let (mut session, _) =
            GameSession::offline(TimeControl::CLASSIC, Color::White, Difficulty::Easy, None);
        let mut warnings = 0;
        let mut ended = None;
        for _ in 0..60 {
            let reaction = session.tick_inactivity();
            warnings += usize::from(reaction.inactivity_warning);
            ended = ended.or(reaction.ended);
        }
        assert_eq!(warnings, 1);
        let end = ended.unwrap();
        assert_eq!(end.winner, Some(Color::Black));
        assert_eq!(session.game().status, GameStatus::Checkmate);
    }

    #[test]
    fn test_draw_offer_accepted_over_peer() {
        let (mut black, _) = GameSession::online(TimeControl::RAPID, Color::Black);
        assert!(matches!(black.accept_draw(), Err(GameError::NoDrawOffer)));
        let offered = black.on_peer_message(PeerMessage::Draw(DrawAction::Offer));
        assert!(offered.draw_offered);
        let accepted = black.accept_draw().unwrap();
        let end = accepted.ended.unwrap();
        assert_eq!(end.status, GameStatus::Draw);
        assert_eq!(accepted.outgoing, vec![Outgoing::End(end)]);
    }

    #[test]
    fn test_draw_offers_are_limited() {
        let (mut white, _) = GameSession::online(TimeControl::RAPID, Color::White);
        for _ in 0..2 {
            let reaction = white.offer_draw().unwrap();
            assert_eq!(reaction.outgoing, vec![Outgoing::Draw(DrawAction::Offer)]);
            let declined = white.on_peer_message(PeerMessage::Draw(DrawAction::Decline));
            assert!(declined.draw_declined);
        }
        assert!(matches!(white.offer_draw(), Err(GameError::DrawOfferLimit)));
    }

    #[test]
    fn test_peer_resignation_finishes_without_report() {
        let (mut white, _) = GameSession::online(TimeControl::RAPID, Color::White);
        let reaction = white.on_peer_message(PeerMessage::Resign);
        let end = reaction.ended.unwrap();
        assert_eq!(end.winner, Some(Color::White));
        assert!(reaction.outgoing.is_empty());
        assert!(matches!(
            white.try_local_move(mv("e2-e4")),
            Err(GameError::GameOver)
        ));
    }
}
