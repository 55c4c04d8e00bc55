//! Game clocks, the per-turn inactivity countdown and time formatting.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::engine::Color;
use crate::error::GameError;

/// Below this much remaining time the clock ticks every 100 ms.
pub const FINE_TICK_THRESHOLD_MS: u64 = 10_000;
const COARSE_TICK: Duration = Duration::from_millis(1000);
const FINE_TICK: Duration = Duration::from_millis(100);

/// Initial minutes plus per-move increment in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeControl {
    pub minutes: u32,
    pub increment_secs: u32,
}

impl TimeControl {
    pub const BLITZ: Self = Self::new(3, 2);
    pub const RAPID: Self = Self::new(10, 5);
    pub const CLASSIC: Self = Self::new(15, 10);

    #[must_use]
    pub const fn new(minutes: u32, increment_secs: u32) -> Self {
        Self {
            minutes,
            increment_secs,
        }
    }

    #[must_use]
    pub const fn initial_ms(self) -> u64 {
        self.minutes as u64 * 60_000
    }

    #[must_use]
    pub const fn increment_ms(self) -> u64 {
        self.increment_secs as u64 * 1000
    }

    /// Parse, falling back to ten minutes without increment.
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|e| {
            warn!("{e}, using {}", Self::default());
            Self::default()
        })
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(10, 0)
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.minutes, self.increment_secs)
    }
}

impl FromStr for TimeControl {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GameError::InvalidTimeControl(s.to_string());
        match s.trim() {
            "blitz" => Ok(Self::BLITZ),
            "rapid" => Ok(Self::RAPID),
            "classic" => Ok(Self::CLASSIC),
            other => {
                let (minutes, increment) = other.split_once('+').unwrap_or((other, "0"));
                let minutes = minutes.trim().parse().map_err(|_| invalid())?;
                let increment = increment.trim().parse().map_err(|_| invalid())?;
                if minutes == 0 {
                    return Err(invalid());
                }
                Ok(Self::new(minutes, increment))
            }
        }
    }
}

impl TryFrom<String> for TimeControl {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeControl> for String {
    fn from(tc: TimeControl) -> Self {
        tc.to_string()
    }
}

/// Both sides' remaining time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub white_ms: u64,
    pub black_ms: u64,
    pub increment_ms: u64,
}

impl Clock {
    #[must_use]
    pub const fn new(tc: TimeControl) -> Self {
        Self {
            white_ms: tc.initial_ms(),
            black_ms: tc.initial_ms(),
            increment_ms: tc.increment_ms(),
        }
    }

    #[must_use]
    pub const fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    /// Remaining time in seconds, fractional below ten seconds.
    #[must_use]
    pub fn seconds(&self, color: Color) -> f64 {
        let ms = self.remaining_ms(color);
        if ms <= FINE_TICK_THRESHOLD_MS {
            ms as f64 / 1000.0
        } else {
            (ms / 1000) as f64
        }
    }

    fn slot(&mut self, color: Color) -> &mut u64 {
        match color {
            Color::White => &mut self.white_ms,
            Color::Black => &mut self.black_ms,
        }
    }

    /// How often the running side's clock should be ticked.
    #[must_use]
    pub const fn tick_interval(&self, color: Color) -> Duration {
        if self.remaining_ms(color) <= FINE_TICK_THRESHOLD_MS {
            FINE_TICK
        } else {
            COARSE_TICK
        }
    }

    /// Deduct `elapsed` from `color`. Returns true when the flag falls.
    pub fn tick(&mut self, color: Color, elapsed: Duration) -> bool {
        let spent = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let slot = self.slot(color);
        *slot = slot.saturating_sub(spent);
        *slot == 0
    }

    pub fn add_increment(&mut self, color: Color) {
        let inc = self.increment_ms;
        let slot = self.slot(color);
        *slot = slot.saturating_add(inc);
    }

    #[must_use]
    pub const fn is_flagged(&self, color: Color) -> bool {
        self.remaining_ms(color) == 0
    }
}

/// Seconds a side may sit on a move before losing.
pub const INACTIVITY_LIMIT_SECS: u32 = 60;
/// Remaining seconds at which the one-shot warning fires.
pub const INACTIVITY_WARNING_SECS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactivityTick {
    Running,
    Warning,
    Expired,
}

/// Per-turn countdown for whichever side is to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityTimer {
    remaining: u32,
    warned: bool,
}

impl Default for InactivityTimer {
    fn default() -> Self {
        Self {
            remaining: INACTIVITY_LIMIT_SECS,
            warned: false,
        }
    }
}

impl InactivityTimer {
    #[must_use]
    pub const fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    /// Start over for a new turn.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Count down one second.
    pub fn tick(&mut self) -> InactivityTick {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return InactivityTick::Expired;
        }
        if !self.warned && self.remaining <= INACTIVITY_WARNING_SECS {
            self.warned = true;
            return InactivityTick::Warning;
        }
        InactivityTick::Running
    }

    /// Align with the server's view of time since the last move, so a
    /// reconnecting client gets no extra time.
    pub fn sync_with_server(&mut self, seconds_since_move: u64) {
        let elapsed = u32::try_from(seconds_since_move).unwrap_or(u32::MAX);
        self.remaining = INACTIVITY_LIMIT_SECS.saturating_sub(elapsed);
        if self.remaining < INACTIVITY_WARNING_SECS {
            self.warned = true;
        }
    }

    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.remaining == 0
    }
}

/// `m:ss` above ten seconds, one decimal at or below.
#[must_use]
pub fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    if seconds <= 10.0 {
        return format!("{seconds:.1}");
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_control_names_and_custom() {
        assert_eq!("blitz".parse::<TimeControl>().unwrap(), TimeControl::new(3, 2));
        assert_eq!("rapid".parse::<TimeControl>().unwrap(), TimeControl::new(10, 5));
        assert_eq!("classic".parse::<TimeControl>().unwrap(), TimeControl::new(15, 10));
        assert_eq!("5+3".parse::<TimeControl>().unwrap(), TimeControl::new(5, 3));
        assert_eq!("7".parse::<TimeControl>().unwrap(), TimeControl::new(7, 0));
        assert!("bullet".parse::<TimeControl>().is_err());
        assert_eq!(TimeControl::parse_or_default("bullet"), TimeControl::new(10, 0));
    }

    #[test]
    fn test_time_control_serializes_compactly() {
        let json = serde_json::to_string(&TimeControl::BLITZ).unwrap();
        assert_eq!(json, "\"3+2\"");
    }

    #[test]
    fn test_clock_switches_to_fine_ticks() {
        let mut clock = Clock::new(TimeControl::new(1, 0));
        assert_eq!(clock.tick_interval(Color::White), Duration::from_secs(1));
        assert!(!clock.tick(Color::White, Duration::from_millis(50_000)));
        assert_eq!(clock.tick_interval(Color::White), Duration::from_millis(100));
        assert_eq!(clock.tick_interval(Color::Black), Duration::from_secs(1));
        clock.tick(Color::White, Duration::from_millis(500));
        assert!((clock.seconds(Color::White) - 9.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flag_falls_at_exactly_zero() {
        let mut clock = Clock::new(TimeControl::new(1, 0));
        assert!(!clock.tick(Color::Black, Duration::from_millis(59_999)));
        assert!(clock.tick(Color::Black, Duration::from_millis(1)));
        assert!(clock.is_flagged(Color::Black));
        assert!(clock.tick(Color::Black, Duration::from_millis(1000)));
    }

    #[test]
    fn test_increment_goes_to_the_mover() {
        let mut clock = Clock::new(TimeControl::BLITZ);
        clock.add_increment(Color::White);
        assert_eq!(clock.white_ms, 182_000);
        assert_eq!(clock.black_ms, 180_000);
    }

    #[test]
    fn test_inactivity_warns_once_then_expires() {
        let mut timer = InactivityTimer::default();
        let ticks: Vec<_> = (0..60).map(|_| timer.tick()).collect();
        assert_eq!(
            ticks.iter().filter(|t| **t == InactivityTick::Warning).count(),
            1
        );
        assert_eq!(ticks[39], InactivityTick::Warning);
        assert_eq!(ticks[59], InactivityTick::Expired);
        assert!(timer.is_expired());
    }

    #[test]
    fn test_inactivity_follows_server_elapsed_time() {
        let mut timer = InactivityTimer::default();
        timer.sync_with_server(45);
        assert_eq!(timer.remaining_secs(), 15);
        assert_eq!(timer.tick(), InactivityTick::Running);
        timer.sync_with_server(90);
        assert!(timer.is_expired());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(10.0), "10.0");
        assert_eq!(format_time(9.46), "9.5");
        assert_eq!(format_time(-3.0), "0.0");
    }
}
