//! Claimable world entities and the reservation protocol

pub mod reservation;
pub mod resources;

pub use reservation::{Reservable, ReservableRef, Reservation};
pub use resources::{ResourceKind, ResourceNode};
