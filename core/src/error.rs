use thiserror::Error;

use crate::production::ProductionState;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid speed: {ticks} ticks per second")]
    InvalidSpeed { ticks: i64 },

    #[error("Production '{production}' cannot {operation} while {state:?}")]
    InvalidProductionState {
        production: String,
        state:      ProductionState,
        operation:  &'static str,
    },

    #[error("Facility '{id}' not found")]
    UnknownFacility { id: String },

    #[error("Savegame '{path}' not found")]
    SavegameNotFound { path: String },

    #[error("Failed to spawn '{template}': {reason}")]
    EntitySpawn { template: String, reason: String },

    #[error("Inventory overflow for resource '{resource}'")]
    InventoryOverflow { resource: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
