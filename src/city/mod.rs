//! City layer - production buildings, construction sites, and storage

pub mod building;
pub mod construction;
pub mod stockpile;

pub use building::{BuildingArchetype, BuildingKind, BuildingState};
pub use construction::{ConstructionSite, ContributionResult};
pub use stockpile::Stockpile;
