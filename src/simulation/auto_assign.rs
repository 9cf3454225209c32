//! Auto-assignment of idle settlers to gathering and construction
//!
//! Lowest-priority scheduler. It never touches a settler an order claims,
//! and it learns about orders only through the `OrderQuery` bridge so the
//! order manager and this module do not depend on each other.

use rand::Rng;
use tracing::debug;

use crate::core::types::AgentId;
use crate::ecs::world::World;
use crate::entity::tasks::TaskKind;
use crate::world::reservation::Reservation;
use crate::world::resources::ResourceKind;

/// What the order layer tells the other schedulers
pub trait OrderQuery {
    /// An active, non-negated order claims this settler
    fn has_order_for(&self, agent: AgentId) -> bool;

    /// An active negated order prohibits this kind of task for this settler
    fn is_task_forbidden(&self, agent: AgentId, kind: TaskKind) -> bool;
}

/// Order layer with no orders, for running schedulers on their own
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOrders;

impl OrderQuery for NoOrders {
    fn has_order_for(&self, _agent: AgentId) -> bool {
        false
    }

    fn is_task_forbidden(&self, _agent: AgentId, _kind: TaskKind) -> bool {
        false
    }
}

/// Keeps idle, unordered settlers busy
#[derive(Debug, Default)]
pub struct ResourceTaskAssigner {
    timer: f32,
}

impl ResourceTaskAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate time and run a pass when the interval elapses
    pub fn update(&mut self, dt: f32, world: &mut World, orders: &dyn OrderQuery) -> usize {
        self.timer += dt;
        if self.timer < world.config.auto_assign_interval {
            return 0;
        }
        self.timer = 0.0;
        self.assign_pass(world, orders)
    }

    /// One assignment pass; returns the number of tasks handed out
    pub fn assign_pass(&mut self, world: &mut World, orders: &dyn OrderQuery) -> usize {
        let candidates: Vec<AgentId> = world
            .idle_settlers()
            .into_iter()
            .filter(|agent| !orders.has_order_for(*agent))
            .collect();

        let mut assigned = 0;
        for agent in candidates {
            // Construction first; while any site is unclaimed nobody is sent gathering
            if world.has_unclaimed_construction() {
                if self.assign_construction(agent, world, orders) {
                    assigned += 1;
                }
                continue;
            }

            if self.assign_gathering(agent, world, orders) {
                assigned += 1;
            }
        }

        if assigned > 0 {
            debug!(assigned, "auto-assignment pass");
        }
        assigned
    }

    fn assign_construction(&self, agent: AgentId, world: &mut World, orders: &dyn OrderQuery) -> bool {
        if orders.is_task_forbidden(agent, TaskKind::Build) {
            return false;
        }
        let Some(position) = world.settler(agent).map(|s| s.position()) else {
            return false;
        };

        let Some(reservation) = Reservation::acquire_first(world.site_candidates(position, None, None)) else {
            return false;
        };
        let task = world.build_task(reservation);
        world.assign_task(agent, task).is_ok()
    }

    fn assign_gathering(&self, agent: AgentId, world: &mut World, orders: &dyn OrderQuery) -> bool {
        let Some(position) = world.settler(agent).map(|s| s.position()) else {
            return false;
        };

        for kind in category_rotation(world) {
            if orders.is_task_forbidden(agent, kind.task_kind()) {
                continue;
            }
            let Some(reservation) = Reservation::acquire_first(world.node_candidates(&[kind], position, None)) else {
                continue;
            };
            let task = world.gather_task(reservation, kind);
            // A rejected task is dropped inside, freeing the node for the next category
            if world.assign_task(agent, task).is_ok() {
                return true;
            }
        }
        false
    }
}

/// Categories in rotation order from a weighted random start
///
/// Zero-weight categories are left out entirely.
fn category_rotation(world: &mut World) -> Vec<ResourceKind> {
    let weights = world.config.category_weights;
    let total = weights.total();
    if total == 0 {
        return Vec::new();
    }

    let mut roll = world.rng.gen_range(0..total);
    let mut start = 0;
    for (i, kind) in ResourceKind::ALL.iter().enumerate() {
        let weight = weights.weight(*kind);
        if roll < weight {
            start = i;
            break;
        }
        roll -= weight;
    }

    let n = ResourceKind::ALL.len();
    (0..n)
        .map(|offset| ResourceKind::ALL[(start + offset) % n])
        .filter(|kind| weights.weight(*kind) > 0)
        .collect()
}
