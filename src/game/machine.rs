//! Turn-level state machine.
//!
//! [`transition`] is pure: it maps the current phase and an input to the
//! next phase plus the side effects the session must carry out. Nothing
//! happens implicitly when a field changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{Color, Difficulty, Move};

use super::state::GameEnd;

/// Who sits across the board from the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Opponent {
    Computer { difficulty: Difficulty },
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub local: Color,
    pub opponent: Opponent,
}

impl Seat {
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self.opponent, Opponent::Remote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WaitingLocal,
    WaitingRemote,
    AiThinking,
    Finished,
}

/// Something that happened to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// The local player's move was applied.
    LocalMoved {
        mv: Move,
        next: Color,
        end: Option<GameEnd>,
    },
    /// The computer's move was applied.
    ComputerMoved { next: Color, end: Option<GameEnd> },
    /// An authoritative remote state was adopted.
    Synced { next: Color, end: Option<GameEnd> },
    /// Resignation, agreed draw, flag-fall or inactivity.
    Ended { end: GameEnd, local_origin: bool },
}

/// Work the session must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Play a computer move after the delay, unless the phase has moved on.
    ScheduleComputerMove(Duration),
    /// Hand the local move to the network layer.
    Submit(Move),
    /// Tell the other side how the game ended.
    ReportEnd(GameEnd),
    /// Restart the inactivity countdown for the side now to move.
    ResetInactivity,
    /// Write the offline snapshot.
    Persist,
    /// Remove the offline snapshot.
    DiscardSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub effects: Vec<Effect>,
}

/// Phase implied by whose turn it is.
#[must_use]
pub fn phase_for(seat: &Seat, to_move: Color, end: Option<&GameEnd>) -> Phase {
    if end.is_some() {
        return Phase::Finished;
    }
    if to_move == seat.local {
        return Phase::WaitingLocal;
    }
    match seat.opponent {
        Opponent::Computer { .. } => Phase::AiThinking,
        Opponent::Remote => Phase::WaitingRemote,
    }
}

/// Effects for entering `phase` from a non-terminal position.
fn arrive(seat: &Seat, phase: Phase, effects: &mut Vec<Effect>) {
    match (phase, seat.opponent) {
        (Phase::Finished, Opponent::Computer { .. }) => effects.push(Effect::DiscardSnapshot),
        (Phase::Finished, Opponent::Remote) => {}
        (Phase::AiThinking, Opponent::Computer { difficulty }) => {
            effects.push(Effect::ResetInactivity);
            effects.push(Effect::ScheduleComputerMove(difficulty.think_delay()));
            effects.push(Effect::Persist);
        }
        (_, Opponent::Computer { .. }) => {
            effects.push(Effect::ResetInactivity);
            effects.push(Effect::Persist);
        }
        (_, Opponent::Remote) => effects.push(Effect::ResetInactivity),
    }
}

/// Initial step for a game that starts, or resumes, with `to_move` on move.
#[must_use]
pub fn enter(seat: &Seat, to_move: Color, end: Option<&GameEnd>) -> Step {
    let phase = phase_for(seat, to_move, end);
    let mut effects = Vec::new();
    arrive(seat, phase, &mut effects);
    Step { phase, effects }
}

/// Advance the machine. `Finished` absorbs every input.
#[must_use]
pub fn transition(seat: &Seat, phase: Phase, input: Input) -> Step {
    let mut effects = Vec::new();
    if phase == Phase::Finished {
        return Step { phase, effects };
    }

    let next_phase = match input {
        Input::LocalMoved { mv, next, end } => {
            if seat.is_online() {
                effects.push(Effect::Submit(mv));
            }
            phase_for(seat, next, end.as_ref())
        }
        Input::ComputerMoved { next, end } | Input::Synced { next, end } => {
            phase_for(seat, next, end.as_ref())
        }
        Input::Ended { end, local_origin } => {
            if local_origin && seat.is_online() {
                effects.push(Effect::ReportEnd(end));
            }
            Phase::Finished
        }
    };

    let turn_changed = next_phase != phase;
    if turn_changed || next_phase == Phase::Finished {
        arrive(seat, next_phase, &mut effects);
    }
    Step {
        phase: next_phase,
        effects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{EndReason, GameStatus};

    fn bot() -> Seat {
        Seat {
            local: Color::White,
            opponent: Opponent::Computer {
                difficulty: Difficulty::Hard,
            },
        }
    }

    fn online(local: Color) -> Seat {
        Seat {
            local,
            opponent: Opponent::Remote,
        }
    }

    fn e4() -> Move {
        "e2-e4".parse().unwrap()
    }

    #[test]
    fn test_local_move_against_computer_schedules_reply() {
        let step = transition(
            &bot(),
            Phase::WaitingLocal,
            Input::LocalMoved {
                mv: e4(),
                next: Color::Black,
                end: None,
            },
        );
        assert_eq!(step.phase, Phase::AiThinking);
        assert!(step
            .effects
            .contains(&Effect::ScheduleComputerMove(Difficulty::Hard.think_delay())));
        assert!(step.effects.contains(&Effect::Persist));
        assert!(!step.effects.iter().any(|e| matches!(e, Effect::Submit(_))));
    }

    #[test]
    fn test_online_move_is_submitted_and_waits() {
        let step = transition(
            &online(Color::White),
            Phase::WaitingLocal,
            Input::LocalMoved {
                mv: e4(),
                next: Color::Black,
                end: None,
            },
        );
        assert_eq!(step.phase, Phase::WaitingRemote);
        assert_eq!(step.effects[0], Effect::Submit(e4()));
        assert!(step.effects.contains(&Effect::ResetInactivity));
    }

    #[test]
    fn test_mating_move_finishes_and_discards_snapshot() {
        let end = GameEnd::loss(Color::Black, EndReason::Checkmate);
        let step = transition(
            &bot(),
            Phase::WaitingLocal,
            Input::LocalMoved {
                mv: e4(),
                next: Color::Black,
                end: Some(end),
            },
        );
        assert_eq!(step.phase, Phase::Finished);
        assert_eq!(step.effects, vec![Effect::DiscardSnapshot]);
    }

    #[test]
    fn test_finished_absorbs_everything() {
        let step = transition(
            &online(Color::Black),
            Phase::Finished,
            Input::Synced {
                next: Color::Black,
                end: None,
            },
        );
        assert_eq!(step.phase, Phase::Finished);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn test_remote_echo_of_same_turn_has_no_effects() {
        let step = transition(
            &online(Color::Black),
            Phase::WaitingRemote,
            Input::Synced {
                next: Color::White,
                end: None,
            },
        );
        assert_eq!(step.phase, Phase::WaitingRemote);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn test_local_resignation_is_reported_online() {
        let end = GameEnd::loss(Color::White, EndReason::Resign);
        let step = transition(
            &online(Color::White),
            Phase::WaitingRemote,
            Input::Ended {
                end,
                local_origin: true,
            },
        );
        assert_eq!(step.phase, Phase::Finished);
        assert_eq!(step.effects, vec![Effect::ReportEnd(end)]);

        let remote = transition(
            &online(Color::White),
            Phase::WaitingLocal,
            Input::Ended {
                end: GameEnd::draw(GameStatus::Draw, EndReason::Draw),
                local_origin: false,
            },
        );
        assert!(remote.effects.is_empty());
    }

    #[test]
    fn test_enter_with_computer_to_move_schedules_it() {
        let seat = Seat {
            local: Color::Black,
            ..bot()
        };
        let step = enter(&seat, Color::White, None);
        assert_eq!(step.phase, Phase::AiThinking);
        assert_eq!(step.effects[1], Effect::ScheduleComputerMove(Difficulty::Hard.think_delay()));
        assert_eq!(enter(&online(Color::White), Color::White, None).phase, Phase::WaitingLocal);
    }
}
