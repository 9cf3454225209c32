pub mod movement;
pub mod needs;
pub mod settler;
pub mod tasks;

pub use movement::{Arrival, BlockedZone, Movement, StraightLineMovement};
pub use settler::{Settler, SettlerRole, SettlerState};
pub use tasks::{Delivery, Task, TaskKind, TaskSlot};
