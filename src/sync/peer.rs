//! Peer-to-peer transport over one ordered data channel.
//!
//! The actual WebRTC stack sits behind [`PeerConnection`]; this module owns
//! role assignment, signaling through the server relay, the heartbeat and
//! frame dispatch. Every failure here is logged and swallowed: the server
//! path keeps the game correct without it.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::engine::Color;
use crate::error::{SyncError, SyncResult};
use crate::game::state::EndReason;
use crate::models::messages::{SignalEnvelope, SignalType};

use super::protocol::{DrawAction, MoveFrame, PeerMessage};
use super::transport::{
    deliver, Delivery, GameTransport, Inbound, Inbox, Outgoing, TransportKind,
};

/// Public STUN servers; no TURN relay is configured.
pub const ICE_SERVERS: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

/// Label of the single ordered data channel.
pub const CHANNEL_LABEL: &str = "chess";

/// What a [`PeerConnector`] must honour when building the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub ice_servers: Vec<String>,
    pub label: String,
    pub ordered: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ice_servers: ICE_SERVERS.iter().map(ToString::to_string).collect(),
            label: CHANNEL_LABEL.to_string(),
            ordered: true,
        }
    }
}

#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Creates the channel and sends the offer.
    Offerer,
    /// Waits for the offer and receives the channel.
    Answerer,
}

impl Role {
    #[must_use]
    pub const fn for_color(color: Color) -> Self {
        match color {
            Color::White => Self::Offerer,
            Color::Black => Self::Answerer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Excellent,
    Good,
    Poor,
    Disconnected,
}

impl Quality {
    #[must_use]
    pub const fn from_rtt(rtt_ms: u64) -> Self {
        if rtt_ms < 80 {
            Self::Excellent
        } else if rtt_ms < 200 {
            Self::Good
        } else {
            Self::Poor
        }
    }

    /// Good enough to carry moves ahead of the server.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Excellent | Self::Good)
    }
}

/// Liveness and latency of the open channel.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    pong_timeout_ms: u64,
    connected: bool,
    last_heard_ms: u64,
    latency_ms: Option<u64>,
    quality: Quality,
}

impl HeartbeatMonitor {
    #[must_use]
    pub fn new(pong_timeout: Duration) -> Self {
        Self {
            pong_timeout_ms: u64::try_from(pong_timeout.as_millis()).unwrap_or(u64::MAX),
            connected: false,
            last_heard_ms: 0,
            latency_ms: None,
            quality: Quality::Disconnected,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub const fn quality(&self) -> Quality {
        self.quality
    }

    #[must_use]
    pub const fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    /// Counts as good until the first pong measures the link.
    pub fn on_open(&mut self, now_ms: u64) {
        self.connected = true;
        self.last_heard_ms = now_ms;
        self.quality = Quality::Good;
    }

    pub fn on_closed(&mut self) {
        self.connected = false;
        self.latency_ms = None;
        self.quality = Quality::Disconnected;
    }

    /// Any inbound frame proves the peer is alive.
    pub fn on_heard(&mut self, now_ms: u64) {
        self.last_heard_ms = now_ms;
    }

    pub fn on_pong(&mut self, echoed_ts: u64, now_ms: u64) -> Quality {
        let rtt = now_ms.saturating_sub(echoed_ts);
        self.last_heard_ms = now_ms;
        self.latency_ms = Some(rtt);
        self.quality = Quality::from_rtt(rtt);
        self.quality
    }

    /// Called with each ping; degrades to poor after a silent stretch.
    pub fn on_ping_sent(&mut self, now_ms: u64) -> Quality {
        if self.connected && now_ms.saturating_sub(self.last_heard_ms) > self.pong_timeout_ms {
            self.quality = Quality::Poor;
        }
        self.quality
    }
}

/// Events raised by the underlying connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Message(String),
    Closed,
    Failed,
    /// A local ICE candidate to forward to the peer.
    LocalCandidate(String),
}

/// The WebRTC peer connection and its data channel.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Create the ordered channel and return the local offer SDP.
    async fn create_offer(&self) -> SyncResult<String>;
    /// Apply a remote offer and return the answer SDP.
    async fn accept_offer(&self, offer: &str) -> SyncResult<String>;
    async fn accept_answer(&self, answer: &str) -> SyncResult<()>;
    async fn add_ice_candidate(&self, candidate: &str) -> SyncResult<()>;
    async fn send_text(&self, text: String) -> SyncResult<()>;
    async fn close(&self);
}

/// Builds the WebRTC connection for one game.
pub trait PeerConnector: Send + Sync {
    fn open(
        &self,
        config: &ChannelConfig,
    ) -> SyncResult<(Arc<dyn PeerConnection>, UnboundedReceiver<ChannelEvent>)>;
}

/// Where outbound signals go; the server relay in practice.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send_signal(&self, kind: SignalType, data: String) -> SyncResult<()>;
}

pub struct PeerTransport {
    conn: Arc<dyn PeerConnection>,
    signals: Arc<dyn SignalSink>,
    role: Role,
    heartbeat: HeartbeatMonitor,
    inbox: Inbox,
    started: bool,
}

impl PeerTransport {
    pub fn new(
        conn: Arc<dyn PeerConnection>,
        signals: Arc<dyn SignalSink>,
        local: Color,
        config: &SyncConfig,
        inbox: Inbox,
    ) -> Self {
        Self {
            conn,
            signals,
            role: Role::for_color(local),
            heartbeat: HeartbeatMonitor::new(config.pong_timeout),
            inbox,
            started: false,
        }
    }

    /// Build the connection through `connector` with the STUN-only,
    /// ordered channel settings.
    pub fn open(
        connector: &dyn PeerConnector,
        signals: Arc<dyn SignalSink>,
        local: Color,
        config: &SyncConfig,
        inbox: Inbox,
    ) -> SyncResult<(Self, UnboundedReceiver<ChannelEvent>)> {
        let (conn, events) = connector.open(&ChannelConfig::default())?;
        Ok((Self::new(conn, signals, local, config, inbox), events))
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn heartbeat(&self) -> &HeartbeatMonitor {
        &self.heartbeat
    }

    /// Begin the handshake. Only the offerer sends anything; repeat calls
    /// do nothing.
    pub async fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        if self.role != Role::Offerer {
            debug!("waiting for peer offer");
            return;
        }
        let offer = match self.conn.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                warn!("could not create peer offer: {e}");
                return;
            }
        };
        if let Err(e) = self.signals.send_signal(SignalType::Offer, offer).await {
            warn!("failed to relay offer: {e}");
        }
    }

    /// Apply signals relayed from the peer, in order.
    pub async fn process_signals(&mut self, signals: &[SignalEnvelope]) {
        for signal in signals {
            if let Err(e) = self.apply_signal(signal).await {
                warn!("signal processing error ({:?}): {e}", signal.kind);
            }
        }
    }

    async fn apply_signal(&self, signal: &SignalEnvelope) -> SyncResult<()> {
        match signal.kind {
            SignalType::Offer => {
                let answer = self.conn.accept_offer(&signal.data).await?;
                self.signals.send_signal(SignalType::Answer, answer).await
            }
            SignalType::Answer => self.conn.accept_answer(&signal.data).await,
            SignalType::Ice => self.conn.add_ice_candidate(&signal.data).await,
        }
    }

    pub async fn handle_event(&mut self, event: ChannelEvent, now_ms: u64) {
        match event {
            ChannelEvent::Open => {
                info!("peer channel open");
                let before = self.heartbeat.quality();
                self.heartbeat.on_open(now_ms);
                if self.heartbeat.quality() != before {
                    deliver(&self.inbox, Inbound::Quality(self.heartbeat.quality()));
                }
                self.ping(now_ms).await;
            }
            ChannelEvent::Closed | ChannelEvent::Failed => {
                if self.heartbeat.is_connected() {
                    info!("peer channel down: {event:?}");
                }
                self.heartbeat.on_closed();
                deliver(&self.inbox, Inbound::Quality(Quality::Disconnected));
            }
            ChannelEvent::LocalCandidate(candidate) => {
                if let Err(e) = self.signals.send_signal(SignalType::Ice, candidate).await {
                    warn!("failed to relay ice candidate: {e}");
                }
            }
            ChannelEvent::Message(text) => self.handle_text(&text, now_ms).await,
        }
    }

    async fn handle_text(&mut self, text: &str, now_ms: u64) {
        let msg = match PeerMessage::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("dropping bad peer frame: {e}");
                return;
            }
        };
        match msg {
            PeerMessage::Ping(ts) => {
                if let Err(e) = self.send_frame(PeerMessage::Pong(ts)).await {
                    debug!("pong not sent: {e}");
                }
            }
            PeerMessage::Pong(ts) => {
                let before = self.heartbeat.quality();
                let quality = self.heartbeat.on_pong(ts, now_ms);
                if quality != before {
                    deliver(&self.inbox, Inbound::Quality(quality));
                }
            }
            other => {
                self.heartbeat.on_heard(now_ms);
                deliver(&self.inbox, Inbound::Peer(other));
            }
        }
    }

    /// Heartbeat tick: send a ping if the channel is open.
    pub async fn ping(&mut self, now_ms: u64) {
        if !self.heartbeat.is_connected() {
            return;
        }
        let before = self.heartbeat.quality();
        if let Err(e) = self.send_frame(PeerMessage::Ping(now_ms)).await {
            debug!("ping not sent: {e}");
        }
        let quality = self.heartbeat.on_ping_sent(now_ms);
        if quality != before {
            deliver(&self.inbox, Inbound::Quality(quality));
        }
    }

    async fn send_frame(&self, msg: PeerMessage) -> SyncResult<()> {
        if !self.heartbeat.is_connected() {
            return Err(SyncError::ChannelClosed);
        }
        let text = msg.encode(now_millis())?;
        self.conn.send_text(text).await
    }

    pub async fn close(&mut self) {
        self.heartbeat.on_closed();
        self.conn.close().await;
    }
}

#[async_trait]
impl GameTransport for PeerTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Peer
    }

    fn is_available(&self) -> bool {
        self.heartbeat.is_connected() && self.heartbeat.quality().is_usable()
    }

    async fn send(&mut self, msg: &Outgoing) -> SyncResult<Delivery> {
        let frame = match *msg {
            Outgoing::Move(out) => PeerMessage::Move(MoveFrame {
                mv: out.mv,
                white_ms: out.white_ms,
                black_ms: out.black_ms,
                game_status: out.status,
                move_number: out.move_number,
            }),
            Outgoing::End(end) => match (end.reason, end.winner) {
                (EndReason::Resign, _) => PeerMessage::Resign,
                (EndReason::Timeout, Some(winner)) => PeerMessage::Timeout {
                    loser: winner.opposite(),
                },
                (EndReason::Draw, _) => PeerMessage::Draw(DrawAction::Accept),
                _ => return Ok(Delivery::Ignored),
            },
            Outgoing::Draw(action) => PeerMessage::Draw(action),
            Outgoing::OfferRematch | Outgoing::AcceptRematch | Outgoing::DeclineRematch => {
                return Ok(Delivery::Ignored)
            }
        };
        self.send_frame(frame).await?;
        Ok(Delivery::Sent)
    }
}
