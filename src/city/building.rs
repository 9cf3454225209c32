//! Production buildings with SoA layout

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, BuildingId, Vec2};
use crate::world::resources::ResourceKind;

/// Type of production building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    WoodcutterHut,
    Quarry,
    FlintKnapper,
    ForagerHut,
    HunterLodge,
}

impl BuildingKind {
    /// Resource category the building's worker gathers
    pub fn output_kind(&self) -> ResourceKind {
        match self {
            BuildingKind::WoodcutterHut => ResourceKind::Wood,
            BuildingKind::Quarry => ResourceKind::Stone,
            BuildingKind::FlintKnapper => ResourceKind::Flint,
            BuildingKind::ForagerHut => ResourceKind::Berries,
            BuildingKind::HunterLodge => ResourceKind::Game,
        }
    }

    /// Base work required to construct this building type
    pub fn work_required(&self) -> f32 {
        match self {
            BuildingKind::WoodcutterHut => 20.0,
            BuildingKind::Quarry => 30.0,
            BuildingKind::FlintKnapper => 24.0,
            BuildingKind::ForagerHut => 16.0,
            BuildingKind::HunterLodge => 24.0,
        }
    }
}

/// Current state of a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingState {
    /// Construction site - not yet staffed
    UnderConstruction,
    /// Operational, can take a worker
    Complete,
}

/// Structure of Arrays for production buildings
#[derive(Debug, Clone, Default)]
pub struct BuildingArchetype {
    pub ids: Vec<BuildingId>,
    pub kinds: Vec<BuildingKind>,
    pub states: Vec<BuildingState>,
    pub positions: Vec<Vec2>,
    /// Whether a specialized worker is believed to be staffing the building
    pub has_worker: Vec<bool>,
    /// The worker last assigned (cleared by reconciliation)
    pub workers: Vec<Option<AgentId>>,
    /// Units delivered into the building by its worker
    pub stored: Vec<u32>,
}

impl BuildingArchetype {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Spawn a new building (starts under construction)
    pub fn spawn(&mut self, id: BuildingId, kind: BuildingKind, position: Vec2) -> usize {
        let index = self.ids.len();
        self.ids.push(id);
        self.kinds.push(kind);
        self.states.push(BuildingState::UnderConstruction);
        self.positions.push(position);
        self.has_worker.push(false);
        self.workers.push(None);
        self.stored.push(0);
        index
    }

    pub fn index_of(&self, id: BuildingId) -> Option<usize> {
        self.ids.iter().position(|&b| b == id)
    }

    /// Mark construction finished; returns false if already complete or unknown
    pub fn complete(&mut self, id: BuildingId) -> bool {
        match self.index_of(id) {
            Some(idx) if self.states[idx] == BuildingState::UnderConstruction => {
                self.states[idx] = BuildingState::Complete;
                true
            }
            _ => false,
        }
    }

    /// Iterate over completed buildings without a worker
    pub fn iter_unstaffed(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(i, state)| **state == BuildingState::Complete && !self.has_worker[*i])
            .map(|(i, _)| i)
    }

    /// Iterate over buildings believed to be staffed
    pub fn iter_staffed(&self) -> impl Iterator<Item = usize> + '_ {
        self.has_worker
            .iter()
            .enumerate()
            .filter(|(_, staffed)| **staffed)
            .map(|(i, _)| i)
    }

    /// Record a delivery into the building
    pub fn deposit(&mut self, id: BuildingId, amount: u32) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                self.stored[idx] += amount;
                true
            }
            None => false,
        }
    }
}
