use thiserror::Error;

use crate::core::types::{OrderId, ReservableId};

/// Why a settler refused a task
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("settler already holds a task")]
    Busy,

    #[error("no route to task target")]
    Unreachable,
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("Assignment rejected: {0}")]
    AssignmentRejected(RejectReason),

    #[error("Reservation conflict on {0}")]
    ReservationConflict(ReservableId),

    #[error("Task target is no longer valid")]
    TargetInvalidated,

    #[error("No settler named {0:?}")]
    UnknownSettler(String),

    #[error("More than one settler named {0:?}")]
    AmbiguousSettler(String),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedError>;
