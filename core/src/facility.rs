//! Production facilities.
//!
//! A facility owns its storage and its production lines. Each tick it
//! advances every line, delivers finished outputs, and starts idle lines
//! whose inputs are in stock.
//!
//! RULE: the effects of one completion are applied together or not at
//! all. Resource grants are staged on a copy of the inventory, the entity
//! is spawned, and only then is the staged inventory committed.

use crate::{
    config::FacilityConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    inventory::{Inventory, ResourceAmounts},
    production::{ProductionEffect, ProductionState, ProductionUnit, StepOutcome, UnitTemplate},
    rng::SessionRng,
    services::EntityFactory,
    types::{EntityId, Tick, TilePos},
    world::{EntityRoster, SpawnedUnit},
};
use serde::{Deserialize, Serialize};

/// Where a facility sits and how far it reaches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Footprint {
    pub position: TilePos,
    pub radius:   u32,
}

impl Footprint {
    /// Spawn point for a new unit: the template's fixed offset if it has
    /// one, otherwise a random tile within the radius other than the
    /// facility's own. Fails if the tile would lie off the map plane.
    pub fn spawn_point(&self, template: &UnitTemplate, rng: &mut SessionRng) -> SimResult<TilePos> {
        let off_map = || SimError::EntitySpawn {
            template: template.template_id.clone(),
            reason:   format!("spawn point off the map around {:?}", self.position),
        };

        if let Some(offset) = template.spawn_offset {
            return self
                .position
                .checked_offset(i64::from(offset.x), i64::from(offset.y))
                .ok_or_else(off_map);
        }
        if self.radius == 0 {
            return Ok(self.position);
        }

        // u32 radius: side < 2^33, so side * side fits in u128.
        let side = 2 * u128::from(self.radius) + 1;
        let tiles = u64::try_from(side * side).map_err(|_| off_map())?;
        let center = tiles / 2;
        // One draw over every tile of the square except the centre.
        let mut idx = rng.next_u64_below(tiles - 1);
        if idx >= center {
            idx += 1;
        }
        let side = side as u64;
        let r = i64::from(self.radius);
        let dx = (idx % side) as i64 - r;
        let dy = (idx / side) as i64 - r;
        self.position.checked_offset(dx, dy).ok_or_else(off_map)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    id:          String,
    name:        String,
    footprint:   Footprint,
    inventory:   Inventory,
    productions: Vec<ProductionUnit>,
}

impl Facility {
    pub fn from_config(config: &FacilityConfig) -> SimResult<Self> {
        let productions = config
            .productions
            .iter()
            .cloned()
            .map(ProductionUnit::new)
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self {
            id:        config.id.clone(),
            name:      config.name.clone(),
            footprint: Footprint { position: config.position, radius: config.radius },
            inventory: Inventory::from_amounts(config.inventory.clone()),
            productions,
        })
    }

    pub fn id(&self) -> &str                       { &self.id }
    pub fn name(&self) -> &str                     { &self.name }
    pub fn footprint(&self) -> Footprint           { self.footprint }
    pub fn inventory(&self) -> &Inventory          { &self.inventory }
    pub fn productions(&self) -> &[ProductionUnit] { &self.productions }

    /// Goods brought in from outside (carriers, the player, tests).
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    pub fn production(&self, id: &str) -> Option<&ProductionUnit> {
        self.productions.iter().find(|p| p.id() == id)
    }

    pub fn production_mut(&mut self, id: &str) -> Option<&mut ProductionUnit> {
        self.productions.iter_mut().find(|p| p.id() == id)
    }

    /// Advance every production line by one tick.
    pub fn tick(
        &mut self,
        tick: Tick,
        rng: &mut SessionRng,
        factory: &mut dyn EntityFactory,
        roster: &mut EntityRoster,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();

        for unit in &mut self.productions {
            if unit.advance() == StepOutcome::Ready {
                let effects = unit.completion_effects()?;
                let footprint = self.footprint;
                let facility_id = self.id.as_str();

                let delivered = apply_effects(&mut self.inventory, &effects, |template| {
                    let at = footprint.spawn_point(template, rng)?;
                    let id = roster.peek_id(&template.template_id);
                    factory.create(&id, template, at)?;
                    roster.record(SpawnedUnit {
                        id:          id.clone(),
                        template_id: template.template_id.clone(),
                        facility_id: facility_id.to_string(),
                        position:    at,
                        spawned_at:  tick,
                    });
                    Ok(id)
                });

                match delivered {
                    Ok((granted, spawned)) => {
                        unit.complete()?;
                        if let Some(entity_id) = &spawned {
                            if let Some(record) = roster.get(entity_id) {
                                events.push(SimEvent::UnitSpawned {
                                    tick,
                                    entity_id:   entity_id.clone(),
                                    template_id: record.template_id.clone(),
                                    facility_id: self.id.clone(),
                                    position:    record.position,
                                });
                            }
                        }
                        events.push(SimEvent::ProductionCompleted {
                            tick,
                            facility_id:   self.id.clone(),
                            production_id: unit.id().to_string(),
                            granted,
                            spawned,
                        });
                        log::debug!(
                            "tick={tick} {}: {} completed ({} so far)",
                            self.id,
                            unit.id(),
                            unit.completions()
                        );

                        if unit.settle()? == ProductionState::Disabled {
                            events.push(SimEvent::ProductionDisabled {
                                tick,
                                facility_id:   self.id.clone(),
                                production_id: unit.id().to_string(),
                            });
                        }
                    }
                    Err(e) => {
                        // Nothing was applied; the line stays finished and
                        // delivery is retried next tick. Reported once per
                        // distinct reason.
                        let reason = e.to_string();
                        if unit.block(&reason) {
                            log::warn!("tick={tick} {}: delivery of {} failed: {reason}", self.id, unit.id());
                            events.push(SimEvent::DeliveryFailed {
                                tick,
                                facility_id:   self.id.clone(),
                                production_id: unit.id().to_string(),
                                reason,
                            });
                        } else {
                            log::debug!("tick={tick} {}: {} still blocked", self.id, unit.id());
                        }
                    }
                }
            }

            if unit.state() == ProductionState::Idle && unit.try_start(&mut self.inventory)? {
                events.push(SimEvent::ProductionStarted {
                    tick,
                    facility_id:   self.id.clone(),
                    production_id: unit.id().to_string(),
                    consumed:      unit.consumed_inputs().clone(),
                });
            }
        }

        Ok(events)
    }
}

/// Apply the effects of one completion, in order. Returns what was
/// granted and the id of the spawned entity, if any. On error the
/// inventory is unchanged.
fn apply_effects(
    inventory: &mut Inventory,
    effects: &[ProductionEffect],
    mut spawn: impl FnMut(&UnitTemplate) -> SimResult<EntityId>,
) -> SimResult<(ResourceAmounts, Option<EntityId>)> {
    let mut staged = inventory.clone();
    let mut granted = ResourceAmounts::new();
    let mut spawned = None;

    for effect in effects {
        match effect {
            ProductionEffect::ResourceGrant { resources } => {
                staged = staged.with_granted(resources)?;
                for (res, qty) in resources {
                    *granted.entry(res.clone()).or_insert(0) += qty;
                }
            }
            ProductionEffect::EntitySpawn { template } => {
                spawned = Some(spawn(template)?);
            }
        }
    }

    *inventory = staged;
    Ok((granted, spawned))
}
