//! Client side of the game server: polling, action posts and the signal
//! relay.

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::engine::{parse_move_list, Color};
use crate::error::{SyncError, SyncResult};
use crate::game::state::EndReason;
use crate::models::messages::{
    ActionRequest, ActionResponse, CreateGameRequest, CreateGameResponse, MoveSubmission,
    PlayerRef, PollResponse, ServerStatus, SignalRequest, SignalType, TimeoutReport,
};

use super::monitor::{ConnectionMonitor, PollSchedule};
use super::peer::SignalSink;
use super::protocol::DrawAction;
use super::transport::{
    deliver, AuthoritativeState, Delivery, GameTransport, Inbound, Inbox, Outgoing,
    RematchView, TransportKind,
};

/// HTTP handle bound to one player in one game.
#[derive(Debug, Clone)]
pub struct ServerClient {
    http: reqwest::Client,
    base: String,
    game_id: String,
    user_id: String,
}

impl ServerClient {
    pub fn new(
        config: &SyncConfig,
        game_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: config.api_base.trim_end_matches('/').to_string(),
            game_id: game_id.into(),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn player(&self) -> PlayerRef {
        PlayerRef {
            game_id: self.game_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> SyncResult<T> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn create_game(
        config: &SyncConfig,
        request: &CreateGameRequest,
    ) -> SyncResult<CreateGameResponse> {
        let url = format!("{}/api/games", config.api_base.trim_end_matches('/'));
        let resp = reqwest::Client::new().post(url).json(request).send().await?;
        Self::read(resp).await
    }

    pub async fn poll(&self) -> SyncResult<PollResponse> {
        let resp = self
            .http
            .get(format!("{}/api/online-move", self.base))
            .query(&[("game_id", &self.game_id), ("user_id", &self.user_id)])
            .send()
            .await?;
        Self::read(resp).await
    }

    pub async fn post(&self, action: &ActionRequest) -> SyncResult<ActionResponse> {
        let resp = self
            .http
            .post(format!("{}/api/online-move", self.base))
            .json(action)
            .send()
            .await?;
        Self::read(resp).await
    }
}

#[async_trait]
impl SignalSink for ServerClient {
    async fn send_signal(&self, kind: SignalType, data: String) -> SyncResult<()> {
        self.post(&ActionRequest::Signal(SignalRequest {
            game_id: self.game_id.clone(),
            user_id: self.user_id.clone(),
            signal_type: kind,
            signal_data: data,
        }))
        .await?;
        Ok(())
    }
}

/// Translate a poll into inbox updates.
pub fn poll_updates(resp: &PollResponse) -> Vec<Inbound> {
    let mut updates = Vec::new();
    if !resp.signals.is_empty() {
        updates.push(Inbound::Signals(resp.signals.clone()));
    }

    match parse_move_list(&resp.move_history) {
        Ok(moves) => {
            let winner = resp.winner.as_deref().and_then(|id| {
                if id == resp.white_user_id {
                    Some(Color::White)
                } else if id == resp.black_user_id {
                    Some(Color::Black)
                } else {
                    None
                }
            });
            updates.push(Inbound::State(AuthoritativeState {
                origin: TransportKind::Server,
                moves,
                white_ms: resp.white_time.saturating_mul(1000),
                black_ms: resp.black_time.saturating_mul(1000),
                finished: resp.status == ServerStatus::Finished,
                winner,
                end_reason: resp.end_reason,
                seconds_since_move: Some(resp.seconds_since_move),
            }));
        }
        Err(e) => warn!("server sent an unreadable move list: {e}"),
    }

    if resp.rematch_offered_by.is_some() || resp.rematch_status.is_some() {
        updates.push(Inbound::Rematch(RematchView {
            offered_by: resp.rematch_offered_by.clone(),
            status: resp.rematch_status,
            game_id: resp.rematch_game_id.clone(),
        }));
    }
    updates
}

/// Poll until the session inbox closes. The pace follows `peer_connected`.
pub fn spawn_poller(
    client: ServerClient,
    config: &SyncConfig,
    mut peer_connected: Option<watch::Receiver<bool>>,
    inbox: Inbox,
) -> JoinHandle<()> {
    let schedule = PollSchedule::from_config(config);
    let mut monitor = ConnectionMonitor::new(config.failure_threshold);
    tokio::spawn(async move {
        info!("polling game {} as {}", client.game_id(), client.user_id());
        loop {
            match client.poll().await {
                Ok(resp) => {
                    if let Some(event) = monitor.record_success() {
                        deliver(&inbox, Inbound::Connection(event));
                    }
                    for update in poll_updates(&resp) {
                        deliver(&inbox, update);
                    }
                }
                Err(e) => {
                    debug!("poll failed: {e}");
                    if let Some(event) = monitor.record_failure() {
                        deliver(&inbox, Inbound::Connection(event));
                    }
                }
            }
            if inbox.is_closed() {
                debug!("session gone, poller stopping");
                return;
            }

            let connected = peer_connected.as_ref().is_some_and(|rx| *rx.borrow());
            let wait = schedule.interval(connected);
            let sender_gone = match peer_connected.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        () = tokio::time::sleep(wait) => false,
                        changed = rx.changed() => changed.is_err(),
                    }
                }
                None => {
                    tokio::time::sleep(wait).await;
                    false
                }
            };
            if sender_gone {
                peer_connected = None;
            }
        }
    })
}

/// Outgoing messages as server actions. `None` means nothing to record.
fn to_request(client: &ServerClient, local: Color, msg: &Outgoing) -> Option<ActionRequest> {
    let player = client.player();
    match *msg {
        Outgoing::Move(out) => Some(ActionRequest::Move(MoveSubmission {
            game_id: player.game_id,
            user_id: player.user_id.clone(),
            mv: out.mv,
            game_status: out.status,
            winner_id: (out.winner == Some(local)).then_some(player.user_id),
            move_number: out.move_number,
        })),
        Outgoing::End(end) => match end.reason {
            EndReason::Resign => Some(ActionRequest::Resign(player)),
            EndReason::Draw => Some(ActionRequest::Draw(player)),
            EndReason::Timeout => end.winner.map(|winner| {
                ActionRequest::Timeout(TimeoutReport {
                    game_id: player.game_id,
                    user_id: player.user_id,
                    loser_color: winner.opposite(),
                })
            }),
            // Derived by the server from the move list.
            EndReason::Checkmate | EndReason::Stalemate => None,
        },
        Outgoing::Draw(DrawAction::Accept) => Some(ActionRequest::Draw(player)),
        Outgoing::Draw(DrawAction::Offer | DrawAction::Decline) => None,
        Outgoing::OfferRematch => Some(ActionRequest::OfferRematch(player)),
        Outgoing::AcceptRematch => Some(ActionRequest::AcceptRematch(player)),
        Outgoing::DeclineRematch => Some(ActionRequest::DeclineRematch(player)),
    }
}

pub struct ServerTransport {
    client: ServerClient,
    local: Color,
}

impl ServerTransport {
    #[must_use]
    pub const fn new(client: ServerClient, local: Color) -> Self {
        Self { client, local }
    }

    #[must_use]
    pub const fn client(&self) -> &ServerClient {
        &self.client
    }
}

#[async_trait]
impl GameTransport for ServerTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Server
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn send(&mut self, msg: &Outgoing) -> SyncResult<Delivery> {
        let Some(request) = to_request(&self.client, self.local, msg) else {
            return Ok(Delivery::Ignored);
        };
        let resp = self.client.post(&request).await?;
        Ok(match (msg, resp.move_count, resp.new_game_id, resp.player_color) {
            (Outgoing::Move(_), Some(move_count), _, _) => Delivery::MoveAccepted { move_count },
            (Outgoing::AcceptRematch, _, Some(game_id), Some(color)) => {
                Delivery::RematchCreated { game_id, color }
            }
            _ => Delivery::Sent,
        })
    }
}
