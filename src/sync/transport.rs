//! One interface over the peer channel and the server relay.
//!
//! Both adapters push what they learn into a shared [`Inbox`]; the session
//! drains it and feeds every state through one reconciler.

use async_trait::async_trait;
use futures::channel::mpsc;
use log::{debug, warn};

use crate::engine::{Color, Move};
use crate::error::{SyncError, SyncResult};
use crate::game::state::{EndReason, GameEnd, GameStatus};
use crate::models::messages::{RematchStatus, SignalEnvelope};

use super::monitor::ConnectionEvent;
use super::peer::Quality;
use super::protocol::{DrawAction, PeerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Peer,
    Server,
}

/// A full game state some remote party vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritativeState {
    pub origin: TransportKind,
    pub moves: Vec<Move>,
    pub white_ms: u64,
    pub black_ms: u64,
    pub finished: bool,
    pub winner: Option<Color>,
    pub end_reason: Option<EndReason>,
    pub seconds_since_move: Option<u64>,
}

impl AuthoritativeState {
    /// The terminal outcome this state declares, if finished.
    #[must_use]
    pub fn declared_end(&self) -> Option<GameEnd> {
        if !self.finished {
            return None;
        }
        let reason = self.end_reason.unwrap_or(if self.winner.is_some() {
            EndReason::Checkmate
        } else {
            EndReason::Draw
        });
        let status = match reason {
            EndReason::Stalemate => GameStatus::Stalemate,
            EndReason::Draw => GameStatus::Draw,
            EndReason::Checkmate | EndReason::Resign | EndReason::Timeout => {
                if self.winner.is_some() {
                    GameStatus::Checkmate
                } else {
                    GameStatus::Draw
                }
            }
        };
        Some(GameEnd {
            status,
            reason,
            winner: self.winner,
        })
    }
}

/// Rematch fields of a poll, seen from the polling player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RematchView {
    pub offered_by: Option<String>,
    pub status: Option<RematchStatus>,
    pub game_id: Option<String>,
}

/// Everything a transport can report to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    State(AuthoritativeState),
    /// A non-move peer message: resign, draw, timeout or clock sync.
    Peer(PeerMessage),
    Rematch(RematchView),
    Signals(Vec<SignalEnvelope>),
    Connection(ConnectionEvent),
    Quality(Quality),
}

pub type Inbox = mpsc::UnboundedSender<Inbound>;
pub type InboxReceiver = mpsc::UnboundedReceiver<Inbound>;

#[must_use]
pub fn inbox() -> (Inbox, InboxReceiver) {
    mpsc::unbounded()
}

/// Push into the inbox; a closed inbox means the session is gone.
pub fn deliver(inbox: &Inbox, item: Inbound) -> bool {
    match inbox.unbounded_send(item) {
        Ok(()) => true,
        Err(_) => {
            debug!("session inbox closed, dropping update");
            false
        }
    }
}

/// A local move ready for the network, with the clocks after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingMove {
    pub mv: Move,
    pub move_number: u32,
    pub status: GameStatus,
    pub winner: Option<Color>,
    pub white_ms: u64,
    pub black_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outgoing {
    Move(OutgoingMove),
    /// Resignation, agreed draw or timeout detected locally.
    End(GameEnd),
    Draw(DrawAction),
    OfferRematch,
    AcceptRematch,
    DeclineRematch,
}

/// What a transport did with an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The server recorded the move; its list now has `move_count` moves.
    MoveAccepted { move_count: usize },
    /// The server created the rematch game.
    RematchCreated { game_id: String, color: Color },
    Ignored,
}

#[async_trait]
pub trait GameTransport: Send {
    fn kind(&self) -> TransportKind;

    /// Whether sending is worth attempting right now.
    fn is_available(&self) -> bool;

    async fn send(&mut self, msg: &Outgoing) -> SyncResult<Delivery>;
}

/// Server always records; the peer channel also carries the message when
/// its quality is good enough to beat the next poll.
pub struct DualTransport<'a> {
    peer: Option<&'a mut (dyn GameTransport + 'static)>,
    server: &'a mut (dyn GameTransport + 'static),
}

impl<'a> DualTransport<'a> {
    pub fn new(
        server: &'a mut (dyn GameTransport + 'static),
        peer: Option<&'a mut (dyn GameTransport + 'static)>,
    ) -> Self {
        Self { peer, server }
    }

    fn peer_ready(&self) -> bool {
        self.peer.as_deref().is_some_and(|p| p.is_available())
    }

    /// Send through whichever transports apply and return the server's
    /// answer. Peer failures are logged and never surface.
    pub async fn dispatch(&mut self, msg: &Outgoing) -> SyncResult<Delivery> {
        let peer_ready = self.peer_ready();
        if peer_ready {
            if let Some(peer) = self.peer.as_deref_mut() {
                if let Err(e) = peer.send(msg).await {
                    warn!("peer send failed, relying on server: {e}");
                }
            }
        }
        match msg {
            Outgoing::Draw(DrawAction::Offer | DrawAction::Decline) if peer_ready => {
                Ok(Delivery::Sent)
            }
            Outgoing::Draw(DrawAction::Offer | DrawAction::Decline) => {
                Err(SyncError::ChannelClosed)
            }
            _ => self.server.send(msg).await,
        }
    }
}
