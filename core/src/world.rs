//! The simulated world: facilities and the units they produced.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   Facilities tick in configuration order. Within a facility,
//!   production lines tick in configuration order.
//!
//! RULES:
//!   - Tick n is fully applied to every facility before tick n+1 starts.
//!   - All randomness flows through the session's SessionRng.

use crate::{
    config::FacilityConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    facility::Facility,
    rng::SessionRng,
    services::EntityFactory,
    types::{EntityId, Tick, TilePos},
};
use serde::{Deserialize, Serialize};

/// A mobile entity created by a unit-producing facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpawnedUnit {
    pub id:          EntityId,
    pub template_id: String,
    pub facility_id: String,
    pub position:    TilePos,
    pub spawned_at:  Tick,
}

/// Every unit spawned this session, in spawn order. Ids are derived from
/// a session-wide counter so they replay identically.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntityRoster {
    units:    Vec<SpawnedUnit>,
    next_seq: u64,
}

impl EntityRoster {
    /// The id the next recorded unit will get.
    pub fn peek_id(&self, template_id: &str) -> EntityId {
        format!("{template_id}-{}", self.next_seq + 1)
    }

    pub fn record(&mut self, unit: SpawnedUnit) {
        self.next_seq += 1;
        self.units.push(unit);
    }

    pub fn get(&self, id: &str) -> Option<&SpawnedUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn units(&self) -> &[SpawnedUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct World {
    facilities: Vec<Facility>,
    roster:     EntityRoster,
}

impl World {
    pub fn from_config(facilities: &[FacilityConfig]) -> SimResult<Self> {
        let facilities = facilities
            .iter()
            .map(Facility::from_config)
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self { facilities, roster: EntityRoster::default() })
    }

    pub fn facilities(&self) -> &[Facility] { &self.facilities }
    pub fn roster(&self) -> &EntityRoster   { &self.roster }

    pub fn facility(&self, id: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id() == id)
    }

    pub fn facility_mut(&mut self, id: &str) -> SimResult<&mut Facility> {
        self.facilities
            .iter_mut()
            .find(|f| f.id() == id)
            .ok_or_else(|| SimError::UnknownFacility { id: id.to_string() })
    }

    /// Advance every facility by one tick.
    pub fn tick(
        &mut self,
        tick: Tick,
        rng: &mut SessionRng,
        factory: &mut dyn EntityFactory,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        for facility in &mut self.facilities {
            events.extend(facility.tick(tick, rng, factory, &mut self.roster)?);
        }
        Ok(events)
    }
}
