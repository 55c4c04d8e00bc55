//! Rematch offers as seen through polling.

use std::time::Duration;

use log::info;
use tokio::time::Instant;

use crate::models::messages::RematchStatus;

use super::transport::RematchView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RematchEvent {
    /// The opponent offered; answer before the window closes.
    Offered,
    Accepted { game_id: String },
    Declined,
    /// The incoming offer was not answered in time and counts as declined.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Offered,
    Incoming { deadline: Instant },
    Settled,
}

#[derive(Debug, Clone)]
pub struct RematchTracker {
    user_id: String,
    window: Duration,
    stage: Stage,
}

impl RematchTracker {
    pub fn new(user_id: impl Into<String>, window: Duration) -> Self {
        Self {
            user_id: user_id.into(),
            window,
            stage: Stage::Idle,
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.stage == Stage::Settled
    }

    /// Time left to answer an incoming offer.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.stage {
            Stage::Incoming { deadline } => Some(deadline.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// The local player sent an offer.
    pub fn mark_offered(&mut self) {
        if self.stage == Stage::Idle {
            self.stage = Stage::Offered;
        }
    }

    /// The local player answered the incoming offer.
    pub fn respond(&mut self) {
        self.stage = Stage::Settled;
    }

    pub fn observe(&mut self, view: &RematchView, now: Instant) -> Option<RematchEvent> {
        if self.is_settled() {
            return None;
        }
        match view.status {
            Some(RematchStatus::Accepted) => {
                let game_id = view.game_id.clone()?;
                self.stage = Stage::Settled;
                info!("rematch accepted, next game {game_id}");
                Some(RematchEvent::Accepted { game_id })
            }
            Some(RematchStatus::Declined) => {
                self.stage = Stage::Settled;
                Some(RematchEvent::Declined)
            }
            Some(RematchStatus::Pending) | None => {
                let from_opponent = view
                    .offered_by
                    .as_deref()
                    .is_some_and(|id| id != self.user_id);
                if from_opponent && self.stage == Stage::Idle {
                    self.stage = Stage::Incoming {
                        deadline: now + self.window,
                    };
                    return Some(RematchEvent::Offered);
                }
                None
            }
        }
    }

    /// `Expired` once when an unanswered offer runs out.
    pub fn tick(&mut self, now: Instant) -> Option<RematchEvent> {
        match self.stage {
            Stage::Incoming { deadline } if now >= deadline => {
                self.stage = Stage::Settled;
                Some(RematchEvent::Expired)
            }
            _ => None,
        }
    }
}
