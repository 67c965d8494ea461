//! Savegame contents: the full session state, serialized to JSON.
//!
//! A snapshot captures everything needed to resume the session from
//! the tick it was taken at. Snapshots are only taken between ticks.

use crate::{
    clock::ClockSnapshot,
    error::SimResult,
    rng::SessionRng,
    types::RunId,
    world::World,
};
use serde::{Deserialize, Serialize};

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SAVEGAME_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub version: u32,
    pub run_id:  RunId,
    pub clock:   ClockSnapshot,
    pub rng:     SessionRng,
    pub world:   World,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        let snapshot: SessionSnapshot = serde_json::from_str(json)?;
        if snapshot.version != SAVEGAME_VERSION {
            return Err(anyhow::anyhow!(
                "savegame version {} is not supported (expected {SAVEGAME_VERSION})",
                snapshot.version
            )
            .into());
        }
        Ok(snapshot)
    }
}
