//! Facility storage. Quantities are whole units per resource.

use std::collections::BTreeMap;

use crate::{
    error::{SimError, SimResult},
    types::ResourceId,
};
use serde::{Deserialize, Serialize};

/// Resource amounts keyed by resource id. BTreeMap keeps iteration order
/// stable, which the event log and savegames rely on.
pub type ResourceAmounts = BTreeMap<ResourceId, u32>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inventory {
    amounts: ResourceAmounts,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_amounts(amounts: ResourceAmounts) -> Self {
        let amounts = amounts.into_iter().filter(|(_, qty)| *qty > 0).collect();
        Self { amounts }
    }

    pub fn amount(&self, resource: &str) -> u32 {
        self.amounts.get(resource).copied().unwrap_or(0)
    }

    pub fn amounts(&self) -> &ResourceAmounts {
        &self.amounts
    }

    pub fn add(&mut self, resource: &str, qty: u32) -> SimResult<()> {
        if qty == 0 {
            return Ok(());
        }
        let slot = self.amounts.entry(resource.to_string()).or_insert(0);
        *slot = slot
            .checked_add(qty)
            .ok_or_else(|| SimError::InventoryOverflow { resource: resource.to_string() })?;
        Ok(())
    }

    pub fn contains_all(&self, wanted: &ResourceAmounts) -> bool {
        wanted.iter().all(|(res, qty)| self.amount(res) >= *qty)
    }

    /// Remove every wanted amount, or nothing at all.
    pub fn take_all(&mut self, wanted: &ResourceAmounts) -> bool {
        if !self.contains_all(wanted) {
            return false;
        }
        for (res, qty) in wanted {
            if let Some(slot) = self.amounts.get_mut(res) {
                *slot -= qty;
                if *slot == 0 {
                    self.amounts.remove(res);
                }
            }
        }
        true
    }

    /// A copy of this inventory with `grant` added. Leaves `self` untouched
    /// so the caller can commit only once every other effect succeeded.
    pub fn with_granted(&self, grant: &ResourceAmounts) -> SimResult<Inventory> {
        let mut next = self.clone();
        for (res, qty) in grant {
            next.add(res, *qty)?;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(pairs: &[(&str, u32)]) -> ResourceAmounts {
        pairs.iter().map(|(r, q)| (r.to_string(), *q)).collect()
    }

    #[test]
    fn take_all_is_all_or_nothing() {
        let mut inv = Inventory::from_amounts(amounts(&[("wood", 3), ("tools", 1)]));

        assert!(!inv.take_all(&amounts(&[("wood", 2), ("tools", 2)])));
        assert_eq!(inv.amount("wood"), 3);
        assert_eq!(inv.amount("tools"), 1);

        assert!(inv.take_all(&amounts(&[("wood", 2), ("tools", 1)])));
        assert_eq!(inv.amount("wood"), 1);
        assert_eq!(inv.amount("tools"), 0);
        assert!(!inv.amounts().contains_key("tools"));
    }

    #[test]
    fn overflowing_grant_leaves_original_untouched() {
        let inv = Inventory::from_amounts(amounts(&[("gold", u32::MAX - 1)]));
        let err = inv.with_granted(&amounts(&[("gold", 5)])).unwrap_err();
        assert!(matches!(err, SimError::InventoryOverflow { .. }));
        assert_eq!(inv.amount("gold"), u32::MAX - 1);
    }
}
