//! Tasks - the unit of work one settler carries out
//!
//! A task is owned by exactly one settler. When it targets a claimable
//! entity it owns the `Reservation` guard for it, so whatever drops the task
//! also releases the claim.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SchedError};
use crate::core::types::{BuildingId, OrderId, ReservableId, Vec2};
use crate::world::reservation::{Reservable, Reservation};
use crate::world::resources::ResourceKind;

/// What a task does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    GatherWood,
    GatherStone,
    GatherFlint,
    GatherBerries,
    Hunt,
    Build,
    Eat,
}

impl TaskKind {
    /// Resource category collected by a gather kind
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            TaskKind::GatherWood => Some(ResourceKind::Wood),
            TaskKind::GatherStone => Some(ResourceKind::Stone),
            TaskKind::GatherFlint => Some(ResourceKind::Flint),
            TaskKind::GatherBerries => Some(ResourceKind::Berries),
            TaskKind::Hunt => Some(ResourceKind::Game),
            TaskKind::Build | TaskKind::Eat => None,
        }
    }

    /// Gathers run the walk/work/return/deliver cycle
    pub fn is_gather(&self) -> bool {
        self.resource_kind().is_some()
    }
}

/// Where gathered goods go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// The settlement stockpile
    Storage,
    /// A production building's input store
    Building(BuildingId),
}

#[derive(Debug)]
pub struct Task {
    pub kind: TaskKind,
    pub target_position: Vec2,
    pub base_position: Vec2,
    pub work_duration: f32,
    reservation: Option<Reservation>,
    pub order_id: Option<OrderId>,
    pub speed_multiplier: f32,
    pub is_specialized: bool,
    pub target_valid: bool,
    pub delivery: Delivery,
    /// Units picked up and not yet delivered
    pub carrying: u32,
}

impl Task {
    pub fn new(kind: TaskKind, target_position: Vec2, base_position: Vec2, work_duration: f32) -> Self {
        Self {
            kind,
            target_position,
            base_position,
            work_duration,
            reservation: None,
            order_id: None,
            speed_multiplier: 1.0,
            is_specialized: false,
            target_valid: true,
            delivery: Delivery::Storage,
            carrying: 0,
        }
    }

    /// Gather from a claimed node, delivering to `base_position`
    pub fn gather(reservation: Reservation, kind: ResourceKind, base_position: Vec2, work_duration: f32) -> Self {
        let mut task = Self::new(kind.task_kind(), reservation.position(), base_position, work_duration);
        task.reservation = Some(reservation);
        task
    }

    /// Work on a claimed construction site
    pub fn build(reservation: Reservation, work_duration: f32) -> Self {
        let position = reservation.position();
        let mut task = Self::new(TaskKind::Build, position, position, work_duration);
        task.reservation = Some(reservation);
        task
    }

    /// Walk to the feeding spot and eat
    pub fn eat(feeding_position: Vec2, eat_duration: f32) -> Self {
        Self::new(TaskKind::Eat, feeding_position, feeding_position, eat_duration)
    }

    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Long-lived building labor: deliver into the building, walk faster
    pub fn specialized(mut self, building: BuildingId, speed_multiplier: f32) -> Self {
        self.is_specialized = true;
        self.delivery = Delivery::Building(building);
        self.speed_multiplier = speed_multiplier;
        self
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    pub fn holds(&self, id: ReservableId) -> bool {
        self.reservation.as_ref().is_some_and(|r| r.id() == id)
    }

    /// Give up the claim (dropping the result releases it)
    pub fn take_reservation(&mut self) -> Option<Reservation> {
        self.reservation.take()
    }

    /// Point the task at a newly claimed target
    pub fn retarget(&mut self, reservation: Reservation) {
        self.target_position = reservation.position();
        self.reservation = Some(reservation);
        self.target_valid = true;
    }

    /// Re-check the target; a depleted or finished target invalidates the task
    pub fn check_target(&mut self) -> Result<()> {
        if let Some(reservation) = &self.reservation {
            if reservation.target().is_exhausted() {
                self.target_valid = false;
            }
        }
        if self.target_valid {
            Ok(())
        } else {
            Err(SchedError::TargetInvalidated)
        }
    }
}

/// A settler's task holder
///
/// Interrupts nest at most one level deep: eating suspends the running task
/// and the eat task becomes the active one.
#[derive(Debug, Default)]
pub enum TaskSlot {
    #[default]
    Idle,
    Running(Task),
    Suspended { active: Task, saved: Task },
}

impl TaskSlot {
    pub fn is_idle(&self) -> bool {
        matches!(self, TaskSlot::Idle)
    }

    /// The task currently being executed
    pub fn current(&self) -> Option<&Task> {
        match self {
            TaskSlot::Idle => None,
            TaskSlot::Running(task) => Some(task),
            TaskSlot::Suspended { active, .. } => Some(active),
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut Task> {
        match self {
            TaskSlot::Idle => None,
            TaskSlot::Running(task) => Some(task),
            TaskSlot::Suspended { active, .. } => Some(active),
        }
    }

    /// The task parked by an interrupt
    pub fn saved(&self) -> Option<&Task> {
        match self {
            TaskSlot::Suspended { saved, .. } => Some(saved),
            _ => None,
        }
    }

    /// The settler's real work, ignoring an eat interrupt in front of it
    pub fn work(&self) -> Option<&Task> {
        match self {
            TaskSlot::Idle => None,
            TaskSlot::Running(task) => Some(task).filter(|t| t.kind != TaskKind::Eat),
            TaskSlot::Suspended { saved, .. } => Some(saved),
        }
    }

    pub fn take(&mut self) -> TaskSlot {
        std::mem::take(self)
    }
}
