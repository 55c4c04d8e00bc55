//! Game state, clocks and the per-game session that ties them to the
//! engine and the transports.

pub mod clock;
pub mod driver;
pub mod machine;
pub mod session;
pub mod snapshot;
pub mod state;

pub use clock::{format_time, Clock, InactivityTimer, TimeControl};
pub use driver::{connect, run_session, Command, OnlineLink, SessionEvent};
pub use machine::{Effect, Input, Opponent, Phase, Seat};
pub use session::{GameSession, Reaction};
pub use snapshot::{Preferences, Snapshot, SnapshotStore};
pub use state::{EndReason, GameEnd, GameState, GameStatus, MoveRecord};
