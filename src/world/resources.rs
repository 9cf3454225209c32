//! Gatherable resource nodes (trees, rocks, flint beds, bushes, game herds)
//!
//! A node holds a finite number of units. It can be claimed by one settler
//! at a time through the `Reservable` protocol and reports itself exhausted
//! once its last unit has been harvested.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::core::types::{ReservableId, Vec2};
use crate::entity::tasks::TaskKind;
use crate::world::reservation::Reservable;

/// Category of gatherable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Wood,
    Stone,
    Flint,
    Berries,
    Game,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Flint,
        ResourceKind::Berries,
        ResourceKind::Game,
    ];

    /// The task kind a settler runs to collect this category
    pub fn task_kind(self) -> TaskKind {
        match self {
            ResourceKind::Wood => TaskKind::GatherWood,
            ResourceKind::Stone => TaskKind::GatherStone,
            ResourceKind::Flint => TaskKind::GatherFlint,
            ResourceKind::Berries => TaskKind::GatherBerries,
            ResourceKind::Game => TaskKind::Hunt,
        }
    }

    /// Parse a material id as typed by the player ("flint", "wood", ...)
    pub fn from_material(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "wood" | "tree" | "log" => Some(ResourceKind::Wood),
            "stone" | "rock" => Some(ResourceKind::Stone),
            "flint" => Some(ResourceKind::Flint),
            "berries" | "berry" | "food" => Some(ResourceKind::Berries),
            "game" | "deer" | "animal" => Some(ResourceKind::Game),
            _ => None,
        }
    }
}

/// A finite, claimable resource in the world
#[derive(Debug)]
pub struct ResourceNode {
    id: ReservableId,
    kind: ResourceKind,
    position: Vec2,
    remaining: Cell<u32>,
    reserved: Cell<bool>,
}

impl ResourceNode {
    pub fn new(id: ReservableId, kind: ResourceKind, position: Vec2, capacity: u32) -> Self {
        Self {
            id,
            kind,
            position,
            remaining: Cell::new(capacity),
            reserved: Cell::new(false),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.get()
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved.get()
    }

    /// Take up to `amount` units, returns amount actually harvested
    pub fn harvest(&self, amount: u32) -> u32 {
        let taken = amount.min(self.remaining.get());
        self.remaining.set(self.remaining.get() - taken);
        taken
    }
}

impl Reservable for ResourceNode {
    fn id(&self) -> ReservableId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn try_reserve(&self) -> bool {
        if self.reserved.get() || self.is_exhausted() {
            return false;
        }
        self.reserved.set(true);
        true
    }

    fn release(&self) {
        self.reserved.set(false);
    }

    fn is_available(&self) -> bool {
        !self.reserved.get() && !self.is_exhausted()
    }

    fn is_exhausted(&self) -> bool {
        self.remaining.get() == 0
    }
}
