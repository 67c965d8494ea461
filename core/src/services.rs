//! Seams to the world outside the simulation core.
//!
//! RULE: the core never does file I/O, draws widgets or renders.
//! It calls these traits, and the host decides what they do.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::{
    error::SimResult,
    production::UnitTemplate,
    snapshot::SessionSnapshot,
    types::{EntityId, TilePos, WallTime},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SavegameKind {
    Autosave,
    Quicksave,
    Regular,
}

impl SavegameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autosave  => "autosave",
            Self::Quicksave => "quicksave",
            Self::Regular   => "regular",
        }
    }
}

/// Savegame naming, rotation and storage.
pub trait SavegameService {
    fn create_autosave_filename(&mut self) -> String;
    fn create_quicksave_filename(&mut self) -> String;
    /// Canonical path for a user-chosen savegame name.
    fn create_filename(&mut self, name: &str) -> String;
    /// Drop the oldest savegames of `kind` beyond the retention limit.
    fn delete_dispensable_savegames(&mut self, kind: SavegameKind) -> SimResult<()>;
    /// Quicksave paths, newest first.
    fn get_quicksaves(&self) -> SimResult<Vec<String>>;

    fn write_savegame(&mut self, path: &str, snapshot: &SessionSnapshot) -> SimResult<()>;
    fn read_savegame(&self, path: &str) -> SimResult<SessionSnapshot>;
}

/// Transient in-game messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Autosave,
    Quicksave,
    SavedGame,
}

/// Dialogs, popups and the message widget.
pub trait UiService {
    fn post_message(&mut self, kind: MessageKind);
    /// Blocking error dialog for failures the player can act on.
    fn show_error_popup(&mut self, headline: &str, description: &str, advice: &str);
    fn show_popup(&mut self, headline: &str, message: &str);
    /// Ask for a savegame name. `None` means the player aborted.
    fn prompt_savegame_name(&mut self) -> Option<String>;
    /// Close whatever transient widgets are open.
    fn close_transient(&mut self);
    fn display_speed(&mut self, ticks_per_second: u32);
}

pub trait ViewService {
    /// Animation speed relative to the base tick rate.
    fn set_time_multiplier(&mut self, multiplier: f64);
}

/// Builds mobile entities for unit-producing facilities.
pub trait EntityFactory {
    fn create(&mut self, id: &EntityId, template: &UnitTemplate, at: TilePos) -> SimResult<()>;
}

/// Source of wall-clock readings for the tick scheduler.
pub trait WallClock {
    fn now(&self) -> WallTime;
}

/// Monotonic host time, seconds since construction.
#[derive(Debug, Clone)]
pub struct SystemWallClock {
    epoch: Instant,
}

impl SystemWallClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemWallClock {
    fn default() -> Self { Self::new() }
}

impl WallClock for SystemWallClock {
    fn now(&self) -> WallTime {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Hand-driven wall clock for tests and headless replays. Clones share
/// the same reading, so the driver keeps one handle and gives the
/// session the other.
#[derive(Debug, Clone, Default)]
pub struct ManualWallClock {
    now: Rc<Cell<WallTime>>,
}

impl ManualWallClock {
    pub fn new(start: WallTime) -> Self {
        Self { now: Rc::new(Cell::new(start)) }
    }

    pub fn set(&self, now: WallTime) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> WallTime {
        self.now.get()
    }
}

/// Bundle of host services a session controller talks to.
pub struct Services {
    pub savegames: Box<dyn SavegameService>,
    pub ui:        Box<dyn UiService>,
    pub view:      Box<dyn ViewService>,
    pub entities:  Box<dyn EntityFactory>,
    pub wall:      Box<dyn WallClock>,
}
