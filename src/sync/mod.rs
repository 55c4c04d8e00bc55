//! Keeping an online game in step with the opponent.

pub mod http;
pub mod monitor;
pub mod peer;
pub mod protocol;
pub mod reconcile;
pub mod rematch;
pub mod transport;

pub use http::{poll_updates, spawn_poller, ServerClient, ServerTransport};
pub use monitor::{ConnectionEvent, ConnectionMonitor, PollSchedule};
pub use peer::{
    ChannelConfig, ChannelEvent, HeartbeatMonitor, PeerConnection, PeerConnector, PeerTransport,
    Quality, Role, SignalSink,
};
pub use protocol::{DrawAction, PeerMessage};
pub use reconcile::{Merge, Reconciler};
pub use rematch::{RematchEvent, RematchTracker};
pub use transport::{
    AuthoritativeState, Delivery, DualTransport, GameTransport, Inbound, Outgoing,
};
