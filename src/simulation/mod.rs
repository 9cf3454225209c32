pub mod auto_assign;
pub mod events;
pub mod labor;
pub mod tick;

pub use auto_assign::{NoOrders, OrderQuery, ResourceTaskAssigner};
pub use events::{EventBus, GameEvent};
pub use labor::BuildingLaborAssigner;
pub use tick::{run_simulation_tick, Simulation};
