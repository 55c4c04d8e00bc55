//! Local persistence of offline games.
//!
//! Written after every in-progress change and removed once the game
//! ends. Online games never read it back.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::{Color, Difficulty};
use crate::error::SnapshotError;

use super::state::GameState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardTheme {
    #[default]
    Classic,
    Flat,
    Wood,
}

/// Display preferences carried alongside the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub board_theme: BoardTheme,
    pub sound_enabled: bool,
    pub show_coordinates: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            board_theme: BoardTheme::Classic,
            sound_enabled: true,
            show_coordinates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub game: GameState,
    /// Colour the human plays.
    pub local: Color,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub preferences: Preferences,
}

/// One JSON file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write via a temp file and rename so a crash never leaves half a file.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let data = serde_json::to_vec(snapshot)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &data)?;
        fs::rename(&temp_path, &self.path)?;
        debug!(
            "saved snapshot to {} ({} bytes, {} moves)",
            self.path.display(),
            data.len(),
            snapshot.game.move_history.len()
        );
        Ok(())
    }

    /// `None` when nothing has been saved.
    pub fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&data)?;
        info!(
            "restored game from {} at move {}",
            self.path.display(),
            snapshot.game.move_history.len()
        );
        Ok(Some(snapshot))
    }

    pub fn discard(&self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
