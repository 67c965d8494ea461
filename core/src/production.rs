//! Production state machine.
//!
//! A production consumes its inputs when it starts, makes progress one
//! step per tick, and hands back its outputs as an ordered list of
//! effects when it finishes. Applying those effects is the owning
//! facility's job; see `Facility::deliver`.
//!
//!   Idle ──inputs taken──▶ Producing ──progress = 1──▶ Completed
//!    ▲                     │     ▲                     │
//!    │                  pause  resume                  │
//!    │                     ▼     │                     │
//!    │                     Paused                      │
//!    └──────── repeatable ◀────────────────────────────┤
//!                                      single_use ────▶ Disabled

use crate::{
    error::{SimError, SimResult},
    inventory::{Inventory, ResourceAmounts},
    types::TilePos,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductionState {
    Idle,
    Producing,
    Completed,
    Paused,
    Disabled,
}

/// The mobile entity a unit-producing line creates on completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitTemplate {
    pub template_id: String,
    /// Fixed spawn point relative to the facility. When absent the spawn
    /// point is drawn at random inside the facility's radius.
    #[serde(default)]
    pub spawn_offset: Option<TilePos>,
}

/// Static description of a production line, as configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionSpec {
    pub id:             String,
    #[serde(default)]
    pub inputs:         ResourceAmounts,
    #[serde(default)]
    pub outputs:        ResourceAmounts,
    pub duration_ticks: u32,
    #[serde(default)]
    pub unit:           Option<UnitTemplate>,
    #[serde(default)]
    pub single_use:     bool,
}

/// One side effect of a completion. Effects of a single completion are
/// applied together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductionEffect {
    ResourceGrant { resources: ResourceAmounts },
    EntitySpawn { template: UnitTemplate },
}

/// What a single tick did to a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not producing; nothing changed.
    Inactive,
    Progressed,
    /// Progress reached 1.0 this tick or earlier; outputs are waiting.
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionUnit {
    spec:            ProductionSpec,
    state:           ProductionState,
    elapsed_ticks:   u32,
    consumed_inputs: ResourceAmounts,
    completions:     u32,
    /// Why the finished outputs could not be delivered yet, if they could not.
    #[serde(default)]
    blocked:         Option<String>,
}

impl ProductionUnit {
    pub fn new(spec: ProductionSpec) -> SimResult<Self> {
        if spec.duration_ticks == 0 {
            return Err(anyhow::anyhow!("production '{}' has a zero duration", spec.id).into());
        }
        Ok(Self {
            spec,
            state: ProductionState::Idle,
            elapsed_ticks: 0,
            consumed_inputs: ResourceAmounts::new(),
            completions: 0,
            blocked: None,
        })
    }

    pub fn id(&self) -> &str                          { &self.spec.id }
    pub fn spec(&self) -> &ProductionSpec             { &self.spec }
    pub fn state(&self) -> ProductionState            { self.state }
    pub fn completions(&self) -> u32                  { self.completions }
    pub fn consumed_inputs(&self) -> &ResourceAmounts { &self.consumed_inputs }
    pub fn blocked_reason(&self) -> Option<&str>      { self.blocked.as_deref() }

    /// Fraction of the required time already produced, 0.0..=1.0.
    pub fn progress(&self) -> f64 {
        f64::from(self.elapsed_ticks) / f64::from(self.spec.duration_ticks)
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.spec.duration_ticks - self.elapsed_ticks
    }

    pub fn is_ready(&self) -> bool {
        self.state == ProductionState::Producing && self.elapsed_ticks >= self.spec.duration_ticks
    }

    /// Idle → Producing. Takes every input from `inventory` or none of
    /// them; a shortfall is not an error, the unit just stays idle.
    pub fn try_start(&mut self, inventory: &mut Inventory) -> SimResult<bool> {
        self.expect_state(ProductionState::Idle, "start")?;
        if !inventory.take_all(&self.spec.inputs) {
            return Ok(false);
        }
        self.consumed_inputs = self.spec.inputs.clone();
        self.elapsed_ticks = 0;
        self.state = ProductionState::Producing;
        Ok(true)
    }

    /// One tick of progress. Only a producing unit moves.
    pub fn advance(&mut self) -> StepOutcome {
        if self.state != ProductionState::Producing {
            return StepOutcome::Inactive;
        }
        if self.elapsed_ticks < self.spec.duration_ticks {
            self.elapsed_ticks += 1;
        }
        if self.is_ready() {
            StepOutcome::Ready
        } else {
            StepOutcome::Progressed
        }
    }

    /// The outputs owed for the current cycle, resource grant first.
    /// Does not change state; call `complete` once they were applied.
    pub fn completion_effects(&self) -> SimResult<Vec<ProductionEffect>> {
        if !self.is_ready() {
            return Err(self.invalid("deliver"));
        }
        let mut effects = vec![ProductionEffect::ResourceGrant {
            resources: self.spec.outputs.clone(),
        }];
        if let Some(template) = &self.spec.unit {
            effects.push(ProductionEffect::EntitySpawn { template: template.clone() });
        }
        Ok(effects)
    }

    /// Record a failed delivery. Returns true when the line was not
    /// blocked before or is now blocked for a different reason.
    pub fn block(&mut self, reason: &str) -> bool {
        if self.blocked.as_deref() == Some(reason) {
            return false;
        }
        self.blocked = Some(reason.to_string());
        true
    }

    /// Producing → Completed, after the effects were applied.
    pub fn complete(&mut self) -> SimResult<()> {
        if !self.is_ready() {
            return Err(self.invalid("complete"));
        }
        self.state = ProductionState::Completed;
        self.blocked = None;
        self.consumed_inputs.clear();
        self.completions += 1;
        Ok(())
    }

    /// Completed → Idle, or Disabled for single-use lines.
    pub fn settle(&mut self) -> SimResult<ProductionState> {
        self.expect_state(ProductionState::Completed, "reset")?;
        self.elapsed_ticks = 0;
        self.state = if self.spec.single_use {
            ProductionState::Disabled
        } else {
            ProductionState::Idle
        };
        Ok(self.state)
    }

    pub fn pause(&mut self) -> SimResult<()> {
        self.expect_state(ProductionState::Producing, "pause")?;
        self.state = ProductionState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> SimResult<()> {
        self.expect_state(ProductionState::Paused, "resume")?;
        self.state = ProductionState::Producing;
        Ok(())
    }

    fn expect_state(&self, wanted: ProductionState, operation: &'static str) -> SimResult<()> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> SimError {
        SimError::InvalidProductionState {
            production: self.spec.id.clone(),
            state: self.state,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(pairs: &[(&str, u32)]) -> ResourceAmounts {
        pairs.iter().map(|(r, q)| (r.to_string(), *q)).collect()
    }

    fn spec(duration: u32, single_use: bool) -> ProductionSpec {
        ProductionSpec {
            id: "planks".into(),
            inputs: amounts(&[("wood", 2)]),
            outputs: amounts(&[("boards", 1)]),
            duration_ticks: duration,
            unit: None,
            single_use,
        }
    }

    #[test]
    fn zero_duration_rejected() {
        assert!(ProductionUnit::new(spec(0, false)).is_err());
    }

    #[test]
    fn shortfall_keeps_unit_idle() {
        let mut unit = ProductionUnit::new(spec(3, false)).unwrap();
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 1)]));

        assert!(!unit.try_start(&mut inv).unwrap());
        assert_eq!(unit.state(), ProductionState::Idle);
        assert_eq!(inv.amount("wood"), 1);
    }

    #[test]
    fn effects_only_after_full_progress() {
        let mut unit = ProductionUnit::new(spec(3, false)).unwrap();
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 2)]));
        assert!(unit.try_start(&mut inv).unwrap());
        assert_eq!(unit.consumed_inputs(), &amounts(&[("wood", 2)]));

        assert_eq!(unit.advance(), StepOutcome::Progressed);
        assert!(unit.completion_effects().is_err());
        assert_eq!(unit.advance(), StepOutcome::Progressed);
        assert!(unit.complete().is_err());
        assert_eq!(unit.advance(), StepOutcome::Ready);
        assert_eq!(unit.progress(), 1.0);

        let effects = unit.completion_effects().unwrap();
        assert_eq!(
            effects,
            vec![ProductionEffect::ResourceGrant { resources: amounts(&[("boards", 1)]) }]
        );
        unit.complete().unwrap();
        assert_eq!(unit.state(), ProductionState::Completed);
        assert!(unit.complete().is_err(), "completion must not be delivered twice");
        assert_eq!(unit.completions(), 1);
    }

    #[test]
    fn pause_freezes_progress() {
        let mut unit = ProductionUnit::new(spec(4, false)).unwrap();
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 2)]));
        unit.try_start(&mut inv).unwrap();
        unit.advance();
        unit.pause().unwrap();

        for _ in 0..10 {
            assert_eq!(unit.advance(), StepOutcome::Inactive);
        }
        assert_eq!(unit.progress(), 0.25);
        assert!(unit.pause().is_err());

        unit.resume().unwrap();
        assert_eq!(unit.remaining_ticks(), 3);
    }

    #[test]
    fn single_use_disables_after_completion() {
        let mut unit = ProductionUnit::new(spec(1, true)).unwrap();
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 10)]));
        unit.try_start(&mut inv).unwrap();
        assert_eq!(unit.advance(), StepOutcome::Ready);
        unit.complete().unwrap();
        assert_eq!(unit.settle().unwrap(), ProductionState::Disabled);

        assert!(unit.try_start(&mut inv).is_err());
        assert_eq!(unit.advance(), StepOutcome::Inactive);
        assert_eq!(inv.amount("wood"), 8);
    }

    #[test]
    fn block_reports_new_reasons_only_until_completed() {
        let mut unit = ProductionUnit::new(spec(1, false)).unwrap();
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 10)]));
        unit.try_start(&mut inv).unwrap();
        unit.advance();

        assert!(unit.block("no free tile"));
        assert!(!unit.block("no free tile"));
        assert!(unit.block("flooded"));
        assert_eq!(unit.blocked_reason(), Some("flooded"));

        unit.complete().unwrap();
        assert_eq!(unit.blocked_reason(), None);
    }

    #[test]
    fn unit_template_adds_spawn_effect_after_grant() {
        let mut s = spec(1, true);
        s.unit = Some(UnitTemplate { template_id: "frigate".into(), spawn_offset: None });
        let mut unit = ProductionUnit::new(s).unwrap();
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 2)]));
        unit.try_start(&mut inv).unwrap();
        unit.advance();

        let effects = unit.completion_effects().unwrap();
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], ProductionEffect::ResourceGrant { .. }));
        assert!(matches!(effects[1], ProductionEffect::EntitySpawn { .. }));
    }
}
