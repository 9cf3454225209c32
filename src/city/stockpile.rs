//! Stockpile - settlement-level resource storage

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::world::resources::ResourceKind;

/// The food category settlers eat from
pub const FOOD: ResourceKind = ResourceKind::Berries;

/// A stockpile holding resources for a settlement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stockpile {
    /// Resources stored: type -> (current, capacity)
    resources: AHashMap<ResourceKind, (u32, u32)>,
}

impl Stockpile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set capacity for a resource type
    pub fn set_capacity(&mut self, resource: ResourceKind, capacity: u32) {
        let entry = self.resources.entry(resource).or_insert((0, 0));
        entry.1 = capacity;
    }

    /// Get current amount of a resource
    pub fn get(&self, resource: ResourceKind) -> u32 {
        self.resources.get(&resource).map(|(c, _)| *c).unwrap_or(0)
    }

    /// Try to add resources, returns amount actually added
    pub fn add(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        let entry = self.resources.entry(resource).or_insert((0, 500)); // Default capacity 500
        let space = entry.1.saturating_sub(entry.0);
        let added = amount.min(space);
        entry.0 += added;
        added
    }

    /// Try to remove resources, returns amount actually removed
    pub fn remove(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        if let Some(entry) = self.resources.get_mut(&resource) {
            let removed = amount.min(entry.0);
            entry.0 -= removed;
            removed
        } else {
            0
        }
    }

    /// Consume one food unit, false if the larder is empty
    pub fn take_food(&mut self) -> bool {
        self.remove(FOOD, 1) == 1
    }

    /// Snapshot for reporting, sorted by category
    pub fn totals(&self) -> Vec<(ResourceKind, u32)> {
        let mut totals: Vec<_> = self.resources.iter().map(|(k, (c, _))| (*k, *c)).collect();
        totals.sort_by_key(|(k, _)| *k);
        totals
    }
}
