//! Player orders and the scheduler that carries them out
//!
//! Typed command -> OrderDraft -> OrderManager::create_order -> Order -> Tasks

pub mod manager;
pub mod order;

pub use manager::OrderManager;
pub use order::{ObjectRef, Order, OrderDraft, OrderPriority, OrderStatus, OrderSummary, Predicate, Subject};
