//! Fire-and-forget event bus
//!
//! Schedulers publish what happened; presentation layers either drain the
//! queue once per frame or register a subscriber. Subscribers are called
//! synchronously and only see a shared reference, so they cannot reach back
//! into scheduler state.

use serde::Serialize;

use crate::command::order::OrderStatus;
use crate::core::types::{AgentId, BuildingId, OrderId, ReservableId, Vec2};
use crate::entity::tasks::{Delivery, TaskKind};
use crate::world::resources::ResourceKind;

/// Events produced during simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    OrderCreated {
        order: OrderId,
    },
    OrderStatusChanged {
        order: OrderId,
        status: OrderStatus,
    },
    OrderCancelled {
        order: OrderId,
    },
    /// Location marker shown for an order with a target position
    MarkerPlaced {
        order: OrderId,
        position: Vec2,
    },
    MarkerRemoved {
        order: OrderId,
    },
    TaskAssigned {
        agent: AgentId,
        kind: TaskKind,
        order: Option<OrderId>,
    },
    /// A settler was pulled off its work for a named order
    TaskPreempted {
        agent: AgentId,
        order: OrderId,
    },
    ResourceDelivered {
        agent: AgentId,
        kind: ResourceKind,
        amount: u32,
        delivery: Delivery,
    },
    BuildingCompleted {
        site: ReservableId,
        building: Option<BuildingId>,
    },
    SettlerDied {
        agent: AgentId,
        name: String,
    },
    PopulationChanged {
        population: usize,
    },
}

impl GameEvent {
    /// Short label used for event tallies
    pub fn label(&self) -> &'static str {
        match self {
            GameEvent::OrderCreated { .. } => "order_created",
            GameEvent::OrderStatusChanged { .. } => "order_status_changed",
            GameEvent::OrderCancelled { .. } => "order_cancelled",
            GameEvent::MarkerPlaced { .. } => "marker_placed",
            GameEvent::MarkerRemoved { .. } => "marker_removed",
            GameEvent::TaskAssigned { .. } => "task_assigned",
            GameEvent::TaskPreempted { .. } => "task_preempted",
            GameEvent::ResourceDelivered { .. } => "resource_delivered",
            GameEvent::BuildingCompleted { .. } => "building_completed",
            GameEvent::SettlerDied { .. } => "settler_died",
            GameEvent::PopulationChanged { .. } => "population_changed",
        }
    }
}

type Subscriber = Box<dyn FnMut(&GameEvent)>;

/// Queue plus synchronous subscribers
#[derive(Default)]
pub struct EventBus {
    queue: Vec<GameEvent>,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: GameEvent) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&event);
        }
        self.queue.push(event);
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Events published since the last drain
    pub fn pending(&self) -> &[GameEvent] {
        &self.queue
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.queue)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.queue.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
