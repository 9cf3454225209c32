//! Construction sites - claimable build jobs that accumulate work

use std::cell::Cell;

use crate::core::types::{BuildingId, ReservableId, Vec2};
use crate::world::reservation::Reservable;

/// Result of a work contribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContributionResult {
    /// Work contributed, site still under construction
    InProgress { contributed: f32 },
    /// Work contributed, site is now complete
    Completed { contributed: f32 },
    /// Site was already complete
    AlreadyComplete,
}

/// A building under construction
///
/// One builder at a time holds the site. Finished sites report exhausted so
/// any task still pointing at them is invalidated.
#[derive(Debug)]
pub struct ConstructionSite {
    id: ReservableId,
    position: Vec2,
    work_required: f32,
    progress: Cell<f32>,
    reserved: Cell<bool>,
    /// Production building that becomes operational on completion
    building: Option<BuildingId>,
}

impl ConstructionSite {
    pub fn new(id: ReservableId, position: Vec2, work_required: f32) -> Self {
        Self {
            id,
            position,
            work_required,
            progress: Cell::new(0.0),
            reserved: Cell::new(false),
            building: None,
        }
    }

    pub fn for_building(mut self, building: BuildingId) -> Self {
        self.building = Some(building);
        self
    }

    pub fn building(&self) -> Option<BuildingId> {
        self.building
    }

    pub fn progress(&self) -> f32 {
        self.progress.get()
    }

    pub fn work_required(&self) -> f32 {
        self.work_required
    }

    pub fn is_complete(&self) -> bool {
        self.progress.get() >= self.work_required
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved.get()
    }

    /// Apply construction work
    pub fn add_work(&self, amount: f32) -> ContributionResult {
        if self.is_complete() {
            return ContributionResult::AlreadyComplete;
        }

        self.progress.set(self.progress.get() + amount);

        if self.is_complete() {
            ContributionResult::Completed { contributed: amount }
        } else {
            ContributionResult::InProgress { contributed: amount }
        }
    }
}

impl Reservable for ConstructionSite {
    fn id(&self) -> ReservableId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn try_reserve(&self) -> bool {
        if self.reserved.get() || self.is_complete() {
            return false;
        }
        self.reserved.set(true);
        true
    }

    fn release(&self) {
        self.reserved.set(false);
    }

    fn is_available(&self) -> bool {
        !self.reserved.get() && !self.is_complete()
    }

    fn is_exhausted(&self) -> bool {
        self.is_complete()
    }
}
