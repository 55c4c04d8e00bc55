//! Async event loop around a [`GameSession`].
//!
//! One task owns the session and everything that can change it: UI
//! commands, clock and inactivity ticks, the scheduled computer move,
//! transport updates and the peer heartbeat. The UI only sees
//! [`SessionEvent`]s.

use std::future::pending;
use std::sync::Arc;

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use log::{debug, info, warn};
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::engine::{Color, Move};
use crate::error::SyncResult;
use crate::game::state::{GameEnd, MoveRecord};
use crate::sync::http::{spawn_poller, ServerClient, ServerTransport};
use crate::sync::monitor::ConnectionEvent;
use crate::sync::peer::{now_millis, ChannelEvent, PeerConnector, PeerTransport, Quality};
use crate::sync::rematch::{RematchEvent, RematchTracker};
use crate::sync::transport::{
    inbox, Delivery, DualTransport, GameTransport, Inbound, InboxReceiver, Outgoing,
};

use super::session::{GameSession, Reaction};
use super::snapshot::Preferences;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Move),
    Resign,
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
    OfferRematch,
    AcceptRematch,
    DeclineRematch,
    SetPreferences(Preferences),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BoardChanged { moved: Option<MoveRecord> },
    MoveRefused(String),
    InactivityWarning,
    GameOver(GameEnd),
    ConnectionLost,
    ConnectionRestored,
    PeerQuality(Quality),
    DrawOffered,
    DrawDeclined,
    RematchOffered,
    RematchAccepted { game_id: String, color: Color },
    RematchDeclined,
    RematchExpired,
}

/// Network side of an online session.
pub struct OnlineLink {
    pub server: Box<dyn GameTransport>,
    pub peer: Option<PeerTransport>,
    pub peer_events: Option<UnboundedReceiver<ChannelEvent>>,
    pub inbox: InboxReceiver,
    pub rematch: RematchTracker,
    /// True while the peer channel carries moves; the poller slows down.
    pub peer_connected: watch::Sender<bool>,
    pub poller: Option<JoinHandle<()>>,
}

/// Wire up the server poller and, when given a connector, the peer channel.
pub fn connect(
    client: ServerClient,
    local: Color,
    config: &SyncConfig,
    connector: Option<&dyn PeerConnector>,
) -> OnlineLink {
    let (tx, rx) = inbox();
    let (peer_connected, connected_rx) = watch::channel(false);
    let rematch = RematchTracker::new(client.user_id(), config.rematch_window);
    let opened = connector.and_then(|connector| {
        let signals = Arc::new(client.clone());
        PeerTransport::open(connector, signals, local, config, tx.clone())
            .inspect_err(|e| warn!("peer connection unavailable, polling only: {e}"))
            .ok()
    });
    let (peer, peer_events) = match opened {
        Some((transport, events)) => (Some(transport), Some(events)),
        None => (None, None),
    };
    let poller = spawn_poller(client.clone(), config, Some(connected_rx), tx);
    OnlineLink {
        server: Box::new(ServerTransport::new(client, local)),
        peer,
        peer_events,
        inbox: rx,
        rematch,
        peer_connected,
        poller: Some(poller),
    }
}

async fn next_or_pending<T>(rx: Option<&mut UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.next().await,
        None => pending().await,
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

struct Network {
    server: Box<dyn GameTransport>,
    peer: Option<PeerTransport>,
    rematch: RematchTracker,
    peer_connected: watch::Sender<bool>,
}

struct Driver<R> {
    session: GameSession,
    net: Option<Network>,
    events: UnboundedSender<SessionEvent>,
    rng: R,
    ai_deadline: Option<Instant>,
    last_tick: Instant,
    next_clock: Instant,
}

impl<R: Rng> Driver<R> {
    fn emit(&self, event: SessionEvent) {
        if self.events.unbounded_send(event).is_err() {
            debug!("ui gone, dropping event");
        }
    }

    /// Charge the time since the last charge to the side to move.
    async fn settle_clock(&mut self) {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        if elapsed.is_zero() || self.session.game().is_over() {
            return;
        }
        let reaction = self.session.tick_clock(elapsed);
        self.react(reaction).await;
    }

    fn schedule_clock(&mut self) {
        let game = self.session.game();
        self.next_clock = self.last_tick + game.clock.tick_interval(game.current_player());
    }

    async fn send(&mut self, msg: &Outgoing) -> Option<SyncResult<Delivery>> {
        let net = self.net.as_mut()?;
        let peer = net
            .peer
            .as_mut()
            .map(|p| p as &mut (dyn GameTransport + 'static));
        let result = DualTransport::new(net.server.as_mut(), peer)
            .dispatch(msg)
            .await;
        Some(result)
    }

    async fn react(&mut self, reaction: Reaction) {
        for out in &reaction.outgoing {
            if let Some(result) = self.send(out).await {
                self.session.on_delivery(out, &result);
            }
        }
        if let Some(delay) = reaction.computer_move_in {
            self.ai_deadline = Some(Instant::now() + delay);
        }
        if reaction.board_changed {
            self.emit(SessionEvent::BoardChanged {
                moved: reaction.moved,
            });
        }
        if reaction.inactivity_warning {
            self.emit(SessionEvent::InactivityWarning);
        }
        if reaction.draw_offered {
            self.emit(SessionEvent::DrawOffered);
        }
        if reaction.draw_declined {
            self.emit(SessionEvent::DrawDeclined);
        }
        if let Some(end) = reaction.ended {
            self.ai_deadline = None;
            self.emit(SessionEvent::GameOver(end));
        }
    }

    /// Returns false when the loop should stop.
    async fn command(&mut self, cmd: Command) -> bool {
        let result = match cmd {
            Command::Move(mv) => self.session.try_local_move(mv),
            Command::Resign => self.session.resign(),
            Command::OfferDraw => self.session.offer_draw(),
            Command::AcceptDraw => self.session.accept_draw(),
            Command::DeclineDraw => self.session.decline_draw(),
            Command::SetPreferences(prefs) => {
                self.session.set_preferences(prefs);
                return true;
            }
            Command::OfferRematch | Command::AcceptRematch | Command::DeclineRematch => {
                self.rematch_command(&cmd).await;
                return true;
            }
            Command::Quit => return false,
        };
        match result {
            Ok(reaction) => self.react(reaction).await,
            Err(e) => self.emit(SessionEvent::MoveRefused(e.to_string())),
        }
        true
    }

    async fn rematch_command(&mut self, cmd: &Command) {
        if !self.session.game().is_over() {
            self.emit(SessionEvent::MoveRefused("game still in progress".into()));
            return;
        }
        let out = match cmd {
            Command::OfferRematch => Outgoing::OfferRematch,
            Command::AcceptRematch => Outgoing::AcceptRematch,
            _ => Outgoing::DeclineRematch,
        };
        if let Some(net) = self.net.as_mut() {
            match out {
                Outgoing::OfferRematch => net.rematch.mark_offered(),
                _ => net.rematch.respond(),
            }
        }
        match self.send(&out).await {
            Some(Ok(Delivery::RematchCreated { game_id, color })) => {
                info!("rematch created: {game_id}");
                self.emit(SessionEvent::RematchAccepted { game_id, color });
            }
            Some(Ok(_)) | None => {}
            Some(Err(e)) => warn!("rematch request failed: {e}"),
        }
    }

    async fn inbound(&mut self, item: Inbound) {
        match item {
            Inbound::State(state) => {
                let reaction = self.session.apply_remote(&state);
                self.react(reaction).await;
            }
            Inbound::Peer(msg) => {
                let reaction = self.session.on_peer_message(msg);
                self.react(reaction).await;
            }
            Inbound::Rematch(view) => {
                let local = self.session.seat().local;
                let Some(net) = self.net.as_mut() else {
                    return;
                };
                match net.rematch.observe(&view, Instant::now()) {
                    Some(RematchEvent::Offered) => self.emit(SessionEvent::RematchOffered),
                    Some(RematchEvent::Accepted { game_id }) => {
                        self.emit(SessionEvent::RematchAccepted {
                            game_id,
                            color: local.opposite(),
                        });
                    }
                    Some(RematchEvent::Declined) => self.emit(SessionEvent::RematchDeclined),
                    Some(RematchEvent::Expired) | None => {}
                }
            }
            Inbound::Signals(signals) => {
                if let Some(peer) = self.net.as_mut().and_then(|n| n.peer.as_mut()) {
                    peer.process_signals(&signals).await;
                }
            }
            Inbound::Connection(ConnectionEvent::Lost) => self.emit(SessionEvent::ConnectionLost),
            Inbound::Connection(ConnectionEvent::Restored) => {
                self.emit(SessionEvent::ConnectionRestored);
            }
            Inbound::Quality(quality) => {
                self.sync_peer_flag();
                self.emit(SessionEvent::PeerQuality(quality));
            }
        }
    }

    fn sync_peer_flag(&self) {
        let Some(net) = self.net.as_ref() else {
            return;
        };
        let connected = net.peer.as_ref().is_some_and(|p| p.is_available());
        net.peer_connected.send_if_modified(|flag| {
            let changed = *flag != connected;
            *flag = connected;
            changed
        });
    }

    async fn every_second(&mut self) {
        let reaction = self.session.tick_inactivity();
        self.react(reaction).await;

        let expired = self
            .net
            .as_mut()
            .and_then(|net| net.rematch.tick(Instant::now()));
        if expired == Some(RematchEvent::Expired) {
            self.emit(SessionEvent::RematchExpired);
            if let Some(Err(e)) = self.send(&Outgoing::DeclineRematch).await {
                warn!("could not decline expired rematch: {e}");
            }
        }
    }
}

/// Drive a freshly started session until [`Command::Quit`] or the command
/// channel closes. Returns the session for inspection.
pub async fn run_session<R: Rng>(
    started: (GameSession, Reaction),
    mut commands: UnboundedReceiver<Command>,
    events: UnboundedSender<SessionEvent>,
    link: Option<OnlineLink>,
    config: &SyncConfig,
    rng: R,
) -> GameSession {
    let (session, start) = started;
    let (net, mut inbox_rx, mut peer_events, poller) = match link {
        Some(link) => (
            Some(Network {
                server: link.server,
                peer: link.peer,
                rematch: link.rematch,
                peer_connected: link.peer_connected,
            }),
            Some(link.inbox),
            link.peer_events,
            link.poller,
        ),
        None => (None, None, None, None),
    };
    let now = Instant::now();
    let mut driver = Driver {
        session,
        net,
        events,
        rng,
        ai_deadline: None,
        last_tick: now,
        next_clock: now,
    };

    let mut second = interval(Duration::from_secs(1));
    second.set_missed_tick_behavior(MissedTickBehavior::Delay);
    second.tick().await;
    let mut heartbeat = interval(config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if let Some(peer) = driver.net.as_mut().and_then(|n| n.peer.as_mut()) {
        peer.start().await;
    }
    driver.react(start).await;
    driver.last_tick = Instant::now();
    driver.schedule_clock();

    loop {
        let finished = driver.session.game().is_over();
        let has_peer = driver.net.as_ref().is_some_and(|n| n.peer.is_some());
        let ply = driver.session.game().move_history.len();
        tokio::select! {
            cmd = commands.next() => {
                driver.settle_clock().await;
                match cmd {
                    Some(cmd) => {
                        if !driver.command(cmd).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            Some(item) = next_or_pending(inbox_rx.as_mut()) => {
                driver.settle_clock().await;
                driver.inbound(item).await;
            }
            Some(event) = next_or_pending(peer_events.as_mut()) => {
                driver.settle_clock().await;
                if let Some(peer) = driver.net.as_mut().and_then(|n| n.peer.as_mut()) {
                    peer.handle_event(event, now_millis()).await;
                }
                driver.sync_peer_flag();
            }
            () = sleep_until(driver.next_clock), if !finished => driver.settle_clock().await,
            _ = second.tick() => {
                driver.settle_clock().await;
                driver.every_second().await;
            }
            () = sleep_or_pending(driver.ai_deadline) => {
                driver.settle_clock().await;
                driver.ai_deadline = None;
                let reaction = driver.session.play_computer_move(&mut driver.rng);
                driver.react(reaction).await;
            }
            _ = heartbeat.tick(), if has_peer => {
                if let Some(peer) = driver.net.as_mut().and_then(|n| n.peer.as_mut()) {
                    peer.ping(now_millis()).await;
                }
            }
        }
        if driver.session.game().move_history.len() != ply {
            second.reset();
        }
        driver.schedule_clock();
    }

    info!("session loop stopped");
    if let Some(peer) = driver.net.as_mut().and_then(|n| n.peer.as_mut()) {
        peer.close().await;
    }
    if let Some(poller) = poller {
        poller.abort();
    }
    driver.session
}
