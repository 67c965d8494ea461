use serde::{Deserialize, Serialize};

/// All player-issued session commands.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    TogglePause,
    SetSpeed { ticks: i64 },
    SpeedUp,
    SpeedDown,

    // ── Checkpoints ───────────────────────────────
    Autosave,
    Quicksave,
    Quickload,
    Save {
        #[serde(default)]
        name: Option<String>,
    },
    Load { path: String },
}

/// What a command did, for hosts that report back to the player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Done,
    /// Speed ladder end reached or game paused; nothing changed.
    Unchanged,
    SaveFailed,
    NoQuicksaves,
    Loaded { path: String },
}
