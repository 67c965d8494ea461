//! Session event log.
//!
//! Every observable state change of a session is reported as a SimEvent.
//! The log is what the determinism tests compare: two sessions with the
//! same seed and the same commands must produce identical logs.

use crate::{
    inventory::ResourceAmounts,
    services::SavegameKind,
    types::{EntityId, RunId, Tick, TilePos},
};
use serde::{Deserialize, Serialize};

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Session events ─────────────────────────────
    SessionStarted {
        run_id: RunId,
        seed:   u64,
        tick:   Tick,
    },
    SpeedChanged {
        tick: Tick,
        old:  u32,
        new:  u32,
    },
    GameSaved {
        tick: Tick,
        kind: SavegameKind,
        path: String,
    },
    GameLoaded {
        tick: Tick,
        path: String,
    },

    // ── Production events ──────────────────────────
    ProductionStarted {
        tick:          Tick,
        facility_id:   String,
        production_id: String,
        consumed:      ResourceAmounts,
    },
    ProductionCompleted {
        tick:          Tick,
        facility_id:   String,
        production_id: String,
        granted:       ResourceAmounts,
        spawned:       Option<EntityId>,
    },
    UnitSpawned {
        tick:        Tick,
        entity_id:   EntityId,
        template_id: String,
        facility_id: String,
        position:    TilePos,
    },
    DeliveryFailed {
        tick:          Tick,
        facility_id:   String,
        production_id: String,
        reason:        String,
    },
    ProductionDisabled {
        tick:          Tick,
        facility_id:   String,
        production_id: String,
    },
}

impl SimEvent {
    /// Stable name of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::SessionStarted { .. }      => "session_started",
            SimEvent::SpeedChanged { .. }        => "speed_changed",
            SimEvent::GameSaved { .. }           => "game_saved",
            SimEvent::GameLoaded { .. }          => "game_loaded",
            SimEvent::ProductionStarted { .. }   => "production_started",
            SimEvent::ProductionCompleted { .. } => "production_completed",
            SimEvent::UnitSpawned { .. }         => "unit_spawned",
            SimEvent::DeliveryFailed { .. }      => "delivery_failed",
            SimEvent::ProductionDisabled { .. }  => "production_disabled",
        }
    }
}
