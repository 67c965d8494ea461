//! Outpost: the runtime core of a single-player real-time strategy
//! session. A deterministic tick clock with speed and pause control,
//! production facilities driven by those ticks, and save/load
//! checkpoints around them.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod facility;
pub mod inventory;
pub mod production;
pub mod rng;
pub mod services;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod world;
