//! Tick system - orchestrates one simulation step
//!
//! Order of work inside a tick:
//! settlers (movement, hunger, task state) -> orders -> building labor -> auto-assignment
//!
//! Orders run before the other schedulers so a settler freed this tick goes
//! to the player's orders first.

use tracing::trace;

use crate::command::manager::OrderManager;
use crate::command::order::OrderDraft;
use crate::core::config::SchedulerConfig;
use crate::core::error::Result;
use crate::core::types::OrderId;
use crate::ecs::world::World;
use crate::simulation::auto_assign::ResourceTaskAssigner;
use crate::simulation::events::GameEvent;
use crate::simulation::labor::BuildingLaborAssigner;

/// The world plus the three schedulers that drive it
pub struct Simulation {
    pub world: World,
    pub orders: OrderManager,
    pub auto_assigner: ResourceTaskAssigner,
    pub labor: BuildingLaborAssigner,
}

impl Simulation {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Ok(Self {
            world: World::new(config)?,
            orders: OrderManager::new(),
            auto_assigner: ResourceTaskAssigner::new(),
            labor: BuildingLaborAssigner::new(),
        })
    }

    pub fn create_order(&mut self, draft: OrderDraft) -> Result<OrderId> {
        self.orders.create_order(draft, &mut self.world)
    }

    /// Parse and issue a typed command such as `"Ada gather flint"`
    pub fn issue(&mut self, command: &str) -> Result<OrderId> {
        self.orders.issue(command, &mut self.world)
    }

    pub fn cancel_order(&mut self, id: OrderId) -> Result<()> {
        self.orders.cancel_order(id, &mut self.world)
    }

    pub fn step(&mut self, dt: f32) -> Vec<GameEvent> {
        run_simulation_tick(self, dt)
    }
}

/// Run a single simulation tick and return the events it produced
pub fn run_simulation_tick(sim: &mut Simulation, dt: f32) -> Vec<GameEvent> {
    let Simulation {
        world,
        orders,
        auto_assigner,
        labor,
    } = sim;

    let dead = world.update_settlers(dt);
    let ordered = orders.update(dt, world);
    let staffed = labor.update(dt, world, &*orders);
    let auto = auto_assigner.update(dt, world, &*orders);

    trace!(
        tick = world.current_tick,
        dead = dead.len(),
        ordered,
        staffed,
        auto,
        "tick complete"
    );
    world.events.drain()
}
