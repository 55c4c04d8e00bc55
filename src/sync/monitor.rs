//! Poll health tracking and poll pacing.

use std::time::Duration;

use log::{info, warn};

use crate::config::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Lost,
    Restored,
}

/// Counts consecutive poll failures.
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    threshold: u32,
    failures: u32,
    lost: bool,
}

impl ConnectionMonitor {
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: 0,
            lost: false,
        }
    }

    #[must_use]
    pub const fn is_lost(&self) -> bool {
        self.lost
    }

    /// `Lost` exactly once, when the streak reaches the threshold.
    pub fn record_failure(&mut self) -> Option<ConnectionEvent> {
        self.failures = self.failures.saturating_add(1);
        if !self.lost && self.failures >= self.threshold {
            self.lost = true;
            warn!("connection lost after {} failed polls", self.failures);
            return Some(ConnectionEvent::Lost);
        }
        None
    }

    /// `Restored` once after a loss, otherwise nothing.
    pub fn record_success(&mut self) -> Option<ConnectionEvent> {
        self.failures = 0;
        if self.lost {
            self.lost = false;
            info!("connection restored");
            return Some(ConnectionEvent::Restored);
        }
        None
    }
}

/// Poll sparsely while the peer channel carries the game.
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub fast: Duration,
    pub slow: Duration,
}

impl PollSchedule {
    #[must_use]
    pub const fn from_config(config: &SyncConfig) -> Self {
        Self {
            fast: config.poll_fast,
            slow: config.poll_slow,
        }
    }

    #[must_use]
    pub const fn interval(&self, peer_connected: bool) -> Duration {
        if peer_connected {
            self.slow
        } else {
            self.fast
        }
    }
}
