use std::collections::HashSet;

use crate::{
    inventory::ResourceAmounts,
    production::{ProductionSpec, UnitTemplate},
    types::TilePos,
};
use serde::{Deserialize, Serialize};

/// Reference tick rate. Speed multipliers shown to the player are
/// relative to it.
pub const BASE_TICKS_PER_SECOND: u32 = 16;

/// Speed ladder walked by speed-up / speed-down.
pub const DEFAULT_TICK_RATES: [u32; 8] = [8, 16, 32, 48, 64, 96, 128, 176];

/// Largest operating radius a facility may declare, in tiles.
pub const MAX_FACILITY_RADIUS: u32 = 4096;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacilityConfig {
    pub id:          String,
    pub name:        String,
    pub position:    TilePos,
    /// Operating radius in tiles; spawned units appear inside it.
    pub radius:      u32,
    #[serde(default)]
    pub inventory:   ResourceAmounts,
    #[serde(default)]
    pub productions: Vec<ProductionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct FacilitiesFile {
    facilities: Vec<FacilityConfig>,
}

/// Session tunables as stored in `session.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub seed:                     Option<u64>,
    pub base_ticks_per_second:    u32,
    pub initial_ticks_per_second: u32,
    pub tick_rates:               Vec<u32>,
    pub freeze_protection:        bool,
    /// Real-time seconds between autosaves. 0 disables autosaving.
    pub autosave_interval_secs:   f64,
    pub autosave_max_count:       usize,
    pub quicksave_max_count:      usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            seed:                     None,
            base_ticks_per_second:    BASE_TICKS_PER_SECOND,
            initial_ticks_per_second: BASE_TICKS_PER_SECOND,
            tick_rates:               DEFAULT_TICK_RATES.to_vec(),
            freeze_protection:        true,
            autosave_interval_secs:   600.0,
            autosave_max_count:       10,
            quicksave_max_count:      10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub settings:   SessionSettings,
    pub facilities: Vec<FacilityConfig>,
}

impl SessionConfig {
    /// Load from the data/ directory.
    /// In tests, use SessionConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/session.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let settings: SessionSettings = serde_json::from_str(&content)?;

        let facility_path = format!("{data_dir}/facilities.json");
        let facility_content = std::fs::read_to_string(&facility_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {facility_path}: {e}"))?;
        let facility_file: FacilitiesFile = serde_json::from_str(&facility_content)?;

        let config = Self {
            settings,
            facilities: facility_file.facilities,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.settings;
        anyhow::ensure!(s.base_ticks_per_second > 0, "base_ticks_per_second must be > 0");
        anyhow::ensure!(!s.tick_rates.is_empty(), "tick_rates must not be empty");
        anyhow::ensure!(
            s.tick_rates.windows(2).all(|w| w[0] < w[1]) && s.tick_rates[0] > 0,
            "tick_rates must be positive and strictly increasing"
        );
        anyhow::ensure!(
            s.autosave_interval_secs.is_finite() && s.autosave_interval_secs >= 0.0,
            "autosave_interval_secs must be >= 0"
        );

        let mut ids = HashSet::new();
        for facility in &self.facilities {
            anyhow::ensure!(ids.insert(&facility.id), "duplicate facility id '{}'", facility.id);
            anyhow::ensure!(
                facility.radius <= MAX_FACILITY_RADIUS,
                "facility '{}' radius {} exceeds {MAX_FACILITY_RADIUS}",
                facility.id,
                facility.radius
            );
            let r = i64::from(facility.radius);
            anyhow::ensure!(
                facility.position.checked_offset(-r, -r).is_some()
                    && facility.position.checked_offset(r, r).is_some(),
                "facility '{}' reaches off the map from {:?}",
                facility.id,
                facility.position
            );
            for production in &facility.productions {
                anyhow::ensure!(
                    production.duration_ticks > 0,
                    "production '{}' in '{}' has a zero duration",
                    production.id,
                    facility.id
                );
                if let Some(offset) = production.unit.as_ref().and_then(|u| u.spawn_offset) {
                    anyhow::ensure!(
                        facility
                            .position
                            .checked_offset(i64::from(offset.x), i64::from(offset.y))
                            .is_some(),
                        "production '{}' in '{}' spawns off the map",
                        production.id,
                        facility.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    /// Autosave is off so tests control every checkpoint.
    pub fn default_test() -> Self {
        let sawmill = FacilityConfig {
            id:        "sawmill".into(),
            name:      "Sawmill".into(),
            position:  TilePos::new(10, 10),
            radius:    2,
            inventory: amounts(&[("wood", 6)]),
            productions: vec![ProductionSpec {
                id:             "boards".into(),
                inputs:         amounts(&[("wood", 2)]),
                outputs:        amounts(&[("boards", 1)]),
                duration_ticks: 4,
                unit:           None,
                single_use:     false,
            }],
        };

        let shipyard = FacilityConfig {
            id:        "shipyard".into(),
            name:      "Shipyard".into(),
            position:  TilePos::new(30, 12),
            radius:    3,
            inventory: amounts(&[("boards", 4), ("tools", 2)]),
            productions: vec![ProductionSpec {
                id:             "frigate".into(),
                inputs:         amounts(&[("boards", 4), ("tools", 2)]),
                outputs:        amounts(&[("fame", 1)]),
                duration_ticks: 10,
                unit: Some(UnitTemplate {
                    template_id:  "frigate".into(),
                    spawn_offset: None,
                }),
                single_use: true,
            }],
        };

        Self {
            settings: SessionSettings {
                seed: Some(0xC0FF_EE),
                autosave_interval_secs: 0.0,
                ..SessionSettings::default()
            },
            facilities: vec![sawmill, shipyard],
        }
    }
}

fn amounts(pairs: &[(&str, u32)]) -> ResourceAmounts {
    pairs.iter().map(|(r, q)| (r.to_string(), *q)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        SessionConfig::default_test().validate().unwrap();
    }

    #[test]
    fn oversized_radius_rejected() {
        let mut config = SessionConfig::default_test();
        config.facilities[0].radius = u32::MAX;
        assert!(config.validate().is_err());

        config.facilities[0].radius = MAX_FACILITY_RADIUS;
        config.validate().unwrap();
    }

    #[test]
    fn footprint_must_stay_on_the_map() {
        let mut config = SessionConfig::default_test();
        config.facilities[0].position = TilePos::new(i32::MAX - 1, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn fixed_spawn_offset_must_stay_on_the_map() {
        let mut config = SessionConfig::default_test();
        config.facilities[1].position = TilePos::new(0, i32::MIN);
        config.facilities[1].radius = 0;
        config.facilities[1].productions[0].unit = Some(UnitTemplate {
            template_id:  "frigate".into(),
            spawn_offset: Some(TilePos::new(0, -1)),
        });
        assert!(config.validate().is_err());
    }
}
