//! Building labor - specialized workers for completed production buildings

use ordered_float::OrderedFloat;
use tracing::{debug, info};

use crate::core::types::AgentId;
use crate::ecs::world::World;
use crate::entity::tasks::{Delivery, Task};
use crate::simulation::auto_assign::OrderQuery;
use crate::world::reservation::Reservation;

/// Staffs completed buildings and corrects stale `has_worker` flags
#[derive(Debug, Default)]
pub struct BuildingLaborAssigner {
    timer: f32,
    reconcile_timer: f32,
}

impl BuildingLaborAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, dt: f32, world: &mut World, orders: &dyn OrderQuery) -> usize {
        self.reconcile_timer += dt;
        if self.reconcile_timer >= world.config.reconcile_interval {
            self.reconcile_timer = 0.0;
            self.reconcile(world);
        }

        self.timer += dt;
        if self.timer < world.config.labor_interval {
            return 0;
        }
        self.timer = 0.0;
        self.assign_pass(world, orders)
    }

    /// Give each unstaffed building its nearest idle settler
    pub fn assign_pass(&mut self, world: &mut World, orders: &dyn OrderQuery) -> usize {
        let unstaffed: Vec<usize> = world.buildings.iter_unstaffed().collect();
        let mut staffed = 0;

        for idx in unstaffed {
            let building = world.buildings.ids[idx];
            let position = world.buildings.positions[idx];
            let output = world.buildings.kinds[idx].output_kind();
            let task_kind = output.task_kind();

            let Some(agent) = world
                .settlers()
                .iter()
                .filter(|s| s.is_idle())
                .filter(|s| !orders.has_order_for(s.id) && !orders.is_task_forbidden(s.id, task_kind))
                .min_by_key(|s| OrderedFloat(s.position().distance(&position)))
                .map(|s| s.id)
            else {
                continue;
            };

            let candidates = world.node_candidates(&[output], position, Some(world.config.labor_search_radius));
            let Some(reservation) = Reservation::acquire_first(candidates) else {
                debug!(%building, ?output, "no input node near building");
                continue;
            };

            let task = Task::gather(reservation, output, position, world.config.gather_time(output))
                .specialized(building, world.config.specialized_speed_multiplier);
            if world.assign_task(agent, task).is_ok() {
                info!(%building, settler = %agent, "building staffed");
                world.buildings.has_worker[idx] = true;
                world.buildings.workers[idx] = Some(agent);
                staffed += 1;
            }
        }
        staffed
    }

    /// Clear `has_worker` on buildings nobody is working for any more
    pub fn reconcile(&mut self, world: &mut World) -> usize {
        let staffed: Vec<usize> = world.buildings.iter_staffed().collect();
        let mut cleared = 0;

        for idx in staffed {
            let building = world.buildings.ids[idx];
            let output = world.buildings.kinds[idx].output_kind();
            let still_worked = world.settlers().iter().any(|s| {
                s.work_task().is_some_and(|t| {
                    t.delivery == Delivery::Building(building) && t.kind.resource_kind() == Some(output)
                })
            });

            if !still_worked {
                let previous: Option<AgentId> = world.buildings.workers[idx].take();
                debug!(%building, ?previous, "clearing stale worker flag");
                world.buildings.has_worker[idx] = false;
                cleared += 1;
            }
        }
        cleared
    }
}
