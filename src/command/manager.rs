//! Order manager - owns player orders and runs their assignment passes
//!
//! Passes run on an interval rather than every tick. Each pass walks the
//! live orders from highest priority down and applies the subject's rule:
//!
//! - `Named`: assign if idle, no-op if already serving, preempt if the
//!   settler can be interrupted, otherwise wait for the next pass
//! - `NextFree`: first idle settler, then the order is complete
//! - `All`: every idle settler, every pass
//!
//! A settler is pulled off its work only when the order has a target for
//! it, and its old claim is released before the new one is taken.

use ahash::AHashMap;
use tracing::{debug, info, warn};

use crate::command::order::{Order, OrderDraft, OrderStatus, OrderSummary, Predicate, Subject};
use crate::core::error::{Result, SchedError};
use crate::core::types::{AgentId, OrderId, ReservableId, Vec2};
use crate::ecs::world::World;
use crate::entity::tasks::{Task, TaskKind};
use crate::simulation::auto_assign::OrderQuery;
use crate::simulation::events::GameEvent;
use crate::world::reservation::{Reservable, ReservableRef, Reservation};
use crate::world::resources::ResourceKind;

/// Outcome of trying to give one settler work for one order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Assigned,
    /// Nothing left to claim for this order
    NoTarget,
    /// Everything the order covers is prohibited for this settler
    Forbidden,
    /// The settler refused (busy or no route)
    Refused,
}

#[derive(Debug, Default)]
pub struct OrderManager {
    orders: Vec<Order>,
    next_id: u64,
    timer: f32,
    /// Location markers of orders with a target position
    markers: AHashMap<OrderId, Vec2>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self::default()
    }

    // === ORDER LIFECYCLE ===

    /// Validate a draft, resolve its subject and make it live
    pub fn create_order(&mut self, draft: OrderDraft, world: &mut World) -> Result<OrderId> {
        draft.validate()?;

        let named_agent = match &draft.subject {
            Subject::Named(name) => {
                let matches = world.find_by_name(name);
                match matches.as_slice() {
                    [agent] => Some(*agent),
                    [] => return Err(SchedError::UnknownSettler(name.clone())),
                    _ => return Err(SchedError::AmbiguousSettler(name.clone())),
                }
            }
            Subject::All | Subject::NextFree => None,
        };

        self.next_id += 1;
        let id = OrderId(self.next_id);
        let order = Order::from_draft(id, draft, named_agent);
        info!(order = %id, subject = %order.subject, predicate = ?order.predicate, negated = order.negated, "order created");

        world.events.publish(GameEvent::OrderCreated { order: id });
        if let Some(position) = order.target_position {
            self.markers.insert(id, position);
            world.events.publish(GameEvent::MarkerPlaced { order: id, position });
        }
        self.orders.push(order);
        Ok(id)
    }

    /// Parse a typed command and create the order
    pub fn issue(&mut self, command: &str, world: &mut World) -> Result<OrderId> {
        let draft: OrderDraft = command.parse()?;
        self.create_order(draft, world)
    }

    /// Active <-> Paused; pausing releases the settlers serving the order
    pub fn toggle_pause(&mut self, id: OrderId, world: &mut World) -> Result<OrderStatus> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(SchedError::OrderNotFound(id))?;

        order.status = match order.status {
            OrderStatus::Active => {
                let released = world.release_order(id);
                order.assigned_agents.clear();
                debug!(order = %id, released, "order paused");
                OrderStatus::Paused
            }
            OrderStatus::Paused => OrderStatus::Active,
            finished => {
                return Err(SchedError::InvalidOrder(format!(
                    "{} is {:?} and cannot be paused",
                    id, finished
                )))
            }
        };

        world.events.publish(GameEvent::OrderStatusChanged {
            order: id,
            status: order.status,
        });
        Ok(order.status)
    }

    /// Remove an order, releasing every settler serving it and its marker
    pub fn cancel_order(&mut self, id: OrderId, world: &mut World) -> Result<()> {
        let idx = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(SchedError::OrderNotFound(id))?;

        let released = world.release_order(id);
        self.remove_marker(id, world);
        self.orders.remove(idx);

        info!(order = %id, released, "order cancelled");
        world.events.publish(GameEvent::OrderCancelled { order: id });
        Ok(())
    }

    /// Same guarantees as `cancel_order`
    pub fn delete_order(&mut self, id: OrderId, world: &mut World) -> Result<()> {
        self.cancel_order(id, world)
    }

    /// Sweep Complete and Failed orders; returns how many were removed
    pub fn cleanup_finished(&mut self, world: &mut World) -> usize {
        let finished: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|o| o.status.is_finished())
            .map(|o| o.id)
            .collect();

        for id in &finished {
            self.remove_marker(*id, world);
        }
        self.orders.retain(|o| !o.status.is_finished());
        finished.len()
    }

    fn remove_marker(&mut self, id: OrderId, world: &mut World) {
        if self.markers.remove(&id).is_some() {
            world.events.publish(GameEvent::MarkerRemoved { order: id });
        }
    }

    // === QUERIES ===

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn markers(&self) -> impl Iterator<Item = (OrderId, Vec2)> + '_ {
        self.markers.iter().map(|(id, pos)| (*id, *pos))
    }

    pub fn summaries(&self) -> Vec<OrderSummary> {
        self.orders.iter().map(Order::summary).collect()
    }

    // === ASSIGNMENT ===

    /// Accumulate time and run a pass when the interval elapses
    pub fn update(&mut self, dt: f32, world: &mut World) -> usize {
        self.timer += dt;
        if self.timer < world.config.order_interval {
            return 0;
        }
        self.timer = 0.0;
        self.assign_pass(world)
    }

    /// One pass over every live order; returns the number of tasks handed out
    pub fn assign_pass(&mut self, world: &mut World) -> usize {
        self.prune(world);

        // Highest priority first; stable sort keeps creation order within a level
        let mut by_priority: Vec<usize> = (0..self.orders.len()).collect();
        by_priority.sort_by_key(|&i| std::cmp::Reverse(self.orders[i].priority));

        let mut assigned = 0;
        for idx in by_priority {
            if !self.orders[idx].is_live() {
                continue;
            }
            assigned += match self.orders[idx].subject {
                Subject::Named(_) => self.serve_named(idx, world),
                Subject::NextFree => self.serve_next_free(idx, world),
                Subject::All => self.serve_all(idx, world),
            };
        }
        assigned
    }

    /// Drop settlers that stopped serving; fail named orders whose settler is gone
    fn prune(&mut self, world: &mut World) {
        for order in &mut self.orders {
            let id = order.id;
            order
                .assigned_agents
                .retain(|agent| world.settler(*agent).is_some_and(|s| s.current_order() == Some(id)));

            let named_gone = order
                .named_agent
                .is_some_and(|agent| world.settler(agent).is_none());
            if named_gone && !order.status.is_finished() {
                warn!(order = %id, "named settler is gone, order failed");
                order.status = OrderStatus::Failed;
                world.events.publish(GameEvent::OrderStatusChanged {
                    order: id,
                    status: OrderStatus::Failed,
                });
            }
        }
    }

    fn serve_named(&mut self, idx: usize, world: &mut World) -> usize {
        let order_id = self.orders[idx].id;
        let priority = self.orders[idx].priority;
        let Some(agent) = self.orders[idx].named_agent else {
            return 0;
        };
        let Some(settler) = world.settler(agent) else {
            return 0;
        };

        let serving = settler.current_order();
        if serving == Some(order_id) {
            return 0;
        }

        if settler.is_idle() {
            return match self.try_assign(idx, agent, world, false) {
                Attempt::Assigned => 1,
                Attempt::NoTarget | Attempt::Forbidden | Attempt::Refused => 0,
            };
        }

        if !settler.is_interruptible() {
            debug!(order = %order_id, settler = %agent, state = ?settler.state(), "named settler busy, deferring");
            return 0;
        }

        // Another named order of at least this priority keeps its settler
        let held_by_named = serving.is_some_and(|other| {
            self.orders
                .iter()
                .any(|o| o.id == other && o.is_live() && o.named_agent == Some(agent) && o.priority >= priority)
        });
        if held_by_named {
            return 0;
        }

        // Only pull the settler off its work when there is something to hand over.
        // Its own claim counts, since clearing frees it for the new task.
        let Some(search) = Search::for_order(&self.orders[idx], agent, world, |_| false) else {
            return 0;
        };
        let held = settler
            .current_task()
            .and_then(Task::reservation)
            .is_some_and(|r| search.accepts(r.target()));
        let servable = held
            || search
                .candidates(world)
                .iter()
                .any(|c| settler.can_reach(c.position()));
        if !servable {
            debug!(order = %order_id, settler = %agent, "no target for named order, settler keeps its work");
            return 0;
        }

        if let Some(other) = serving {
            if let Some(previous) = self.orders.iter_mut().find(|o| o.id == other) {
                previous.assigned_agents.remove(&agent);
            }
        }
        world.clear_task(agent);
        info!(order = %order_id, settler = %agent, "preempting settler for named order");

        match self.try_assign(idx, agent, world, true) {
            Attempt::Assigned => 1,
            Attempt::NoTarget | Attempt::Forbidden | Attempt::Refused => 0,
        }
    }

    fn serve_next_free(&mut self, idx: usize, world: &mut World) -> usize {
        for agent in world.idle_settlers() {
            match self.try_assign(idx, agent, world, false) {
                Attempt::Assigned => {
                    let order = &mut self.orders[idx];
                    order.status = OrderStatus::Complete;
                    info!(order = %order.id, settler = %agent, "single-shot order complete");
                    world.events.publish(GameEvent::OrderStatusChanged {
                        order: order.id,
                        status: OrderStatus::Complete,
                    });
                    return 1;
                }
                Attempt::NoTarget => return 0,
                Attempt::Forbidden | Attempt::Refused => continue,
            }
        }
        0
    }

    fn serve_all(&mut self, idx: usize, world: &mut World) -> usize {
        let mut assigned = 0;
        for agent in world.idle_settlers() {
            match self.try_assign(idx, agent, world, false) {
                Attempt::Assigned => assigned += 1,
                Attempt::NoTarget => break,
                Attempt::Forbidden | Attempt::Refused => continue,
            }
        }
        assigned
    }

    /// Find and claim a target for the order, then hand the task over
    fn try_assign(&mut self, idx: usize, agent: AgentId, world: &mut World, preempting: bool) -> Attempt {
        let order = &self.orders[idx];
        let order_id = order.id;

        // Prohibitions bind group orders; a settler named directly is obeyed
        let named = matches!(order.subject, Subject::Named(_));
        let forbidden = |kind: TaskKind| !named && self.is_task_forbidden(agent, kind);

        let Some(search) = Search::for_order(order, agent, world, forbidden) else {
            return Attempt::Forbidden;
        };
        let Some(settler) = world.settler(agent) else {
            return Attempt::Refused;
        };

        let reachable = search
            .candidates(world)
            .into_iter()
            .filter(|c| settler.can_reach(c.position()));
        let Some(reservation) = Reservation::acquire_first(reachable) else {
            return Attempt::NoTarget;
        };

        let node_kind = reservation.target().as_node().map(|node| node.kind());
        let task = match node_kind {
            Some(kind) => world.gather_task(reservation, kind),
            None => world.build_task(reservation),
        };
        let task = task.with_order(order_id);

        let handed = if preempting {
            world.assign_preempting(agent, task, order_id)
        } else {
            world.assign_task(agent, task)
        };
        match handed {
            Ok(()) => {
                self.orders[idx].assigned_agents.insert(agent);
                Attempt::Assigned
            }
            Err(err) => {
                debug!(order = %order_id, settler = %agent, %err, "order assignment refused");
                Attempt::Refused
            }
        }
    }
}

/// What one order may claim for one settler, and where to look
///
/// With a target position the search is bounded to `order_search_radius`
/// around it; otherwise the nearest match to the settler wins.
struct Search {
    around: Vec2,
    radius: Option<f32>,
    target: SearchTarget,
}

enum SearchTarget {
    Site(Option<ReservableId>),
    Nodes(Vec<ResourceKind>),
}

impl Search {
    /// None when the settler may take none of the work the order covers
    fn for_order(order: &Order, agent: AgentId, world: &World, forbidden: impl Fn(TaskKind) -> bool) -> Option<Self> {
        let settler_position = world.settler(agent)?.position();
        let (around, radius) = match order.target_position {
            Some(position) => (position, Some(world.config.order_search_radius)),
            None => (settler_position, None),
        };

        let target = match order.predicate {
            Predicate::Build => {
                if forbidden(TaskKind::Build) {
                    return None;
                }
                SearchTarget::Site(order.site_filter())
            }
            Predicate::Gather | Predicate::Hunt => {
                let kinds: Vec<_> = order
                    .resource_kinds()
                    .into_iter()
                    .filter(|k| !forbidden(k.task_kind()))
                    .collect();
                if kinds.is_empty() {
                    return None;
                }
                SearchTarget::Nodes(kinds)
            }
        };
        Some(Self { around, radius, target })
    }

    /// Unclaimed matches, nearest to the search center first
    fn candidates(&self, world: &World) -> Vec<ReservableRef> {
        match &self.target {
            SearchTarget::Site(only) => world.site_candidates(self.around, self.radius, *only),
            SearchTarget::Nodes(kinds) => world.node_candidates(kinds, self.around, self.radius),
        }
    }

    /// Whether `target` matches regardless of who holds it
    fn accepts(&self, target: &ReservableRef) -> bool {
        if target.is_exhausted() {
            return false;
        }
        if self
            .radius
            .is_some_and(|r| target.position().distance(&self.around) > r)
        {
            return false;
        }
        match (&self.target, target) {
            (SearchTarget::Site(only), ReservableRef::Site(site)) => only.map_or(true, |id| site.id() == id),
            (SearchTarget::Nodes(kinds), ReservableRef::Node(node)) => kinds.contains(&node.kind()),
            _ => false,
        }
    }
}

impl OrderQuery for OrderManager {
    fn has_order_for(&self, agent: AgentId) -> bool {
        self.orders.iter().any(|o| o.claims(agent))
    }

    fn is_task_forbidden(&self, agent: AgentId, kind: TaskKind) -> bool {
        self.orders.iter().any(|o| o.forbids(agent, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::order::OrderPriority;
    use crate::entity::settler::SettlerState;
    use crate::world::reservation::Reservable;
    use crate::world::resources::ResourceKind;

    fn world() -> World {
        World::default()
    }

    #[test]
    fn test_named_order_requires_exactly_one_match() {
        let mut w = world();
        w.spawn_settler("Ada", Vec2::default());
        w.spawn_settler("Bo", Vec2::default());
        w.spawn_settler("Bo", Vec2::default());
        let mut orders = OrderManager::new();

        assert!(orders.issue("Ada gather wood", &mut w).is_ok());
        assert!(matches!(
            orders.issue("Cy gather wood", &mut w),
            Err(SchedError::UnknownSettler(_))
        ));
        assert!(matches!(
            orders.issue("Bo gather wood", &mut w),
            Err(SchedError::AmbiguousSettler(_))
        ));
        assert_eq!(orders.orders().len(), 1);
    }

    #[test]
    fn test_next_free_is_single_shot() {
        let mut w = world();
        let a = w.spawn_settler("Ada", Vec2::default());
        let b = w.spawn_settler("Bo", Vec2::default());
        let flint = w.spawn_node(ResourceKind::Flint, Vec2::new(3.0, 0.0), 5);
        let mut orders = OrderManager::new();
        let id = orders.issue("next gather flint", &mut w).unwrap();

        assert_eq!(orders.assign_pass(&mut w), 1);
        assert_eq!(orders.order(id).unwrap().status, OrderStatus::Complete);
        assert!(flint.is_reserved());
        let busy = [a, b].iter().filter(|x| !w.settler(**x).unwrap().is_idle()).count();
        assert_eq!(busy, 1);

        // Never assigned again
        w.spawn_node(ResourceKind::Flint, Vec2::new(4.0, 0.0), 5);
        assert_eq!(orders.assign_pass(&mut w), 0);
    }

    #[test]
    fn test_all_order_persists() {
        let mut w = world();
        let a = w.spawn_settler("Ada", Vec2::default());
        let b = w.spawn_settler("Bo", Vec2::default());
        w.spawn_node(ResourceKind::Stone, Vec2::new(3.0, 0.0), 5);
        let mut orders = OrderManager::new();
        let id = orders.issue("all gather stone", &mut w).unwrap();

        assert_eq!(orders.assign_pass(&mut w), 1);

        w.spawn_node(ResourceKind::Stone, Vec2::new(5.0, 0.0), 5);
        assert_eq!(orders.assign_pass(&mut w), 1);
        assert_eq!(orders.order(id).unwrap().status, OrderStatus::Active);
        assert_eq!(orders.order(id).unwrap().assigned_agents.len(), 2);
        assert_eq!(w.settler(a).unwrap().current_order(), Some(id));
        assert_eq!(w.settler(b).unwrap().current_order(), Some(id));
    }

    #[test]
    fn test_named_preempts_interruptible_settler() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let wood = w.spawn_node(ResourceKind::Wood, Vec2::new(3.0, 0.0), 5);
        let flint = w.spawn_node(ResourceKind::Flint, Vec2::new(4.0, 0.0), 5);

        let guard = Reservation::acquire(crate::world::reservation::ReservableRef::Node(wood.clone())).unwrap();
        let task = w.gather_task(guard, ResourceKind::Wood);
        w.assign_task(agent, task).unwrap();

        let mut orders = OrderManager::new();
        let id = orders.issue("Ada gather flint", &mut w).unwrap();
        w.events.drain();
        assert_eq!(orders.assign_pass(&mut w), 1);

        assert!(wood.is_available());
        assert!(flint.is_reserved());
        assert_eq!(w.settler(agent).unwrap().current_order(), Some(id));
        let events = w.events.drain();
        assert!(matches!(events[0], GameEvent::TaskPreempted { .. }));

        // Already serving: no-op
        assert_eq!(orders.assign_pass(&mut w), 0);
        assert!(flint.is_reserved());
    }

    #[test]
    fn test_named_waits_for_critical_state() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        w.spawn_node(ResourceKind::Flint, Vec2::new(4.0, 0.0), 5);
        w.stockpile.add(ResourceKind::Berries, 5);
        w.feeding_position = Vec2::new(-10.0, 0.0);
        w.settler_mut(agent).unwrap().hunger_mut().satiety = 5.0;
        w.update_settlers(0.1);
        assert_eq!(w.settler(agent).unwrap().state(), SettlerState::WalkingToEat);

        let mut orders = OrderManager::new();
        orders.issue("Ada gather flint", &mut w).unwrap();
        assert_eq!(orders.assign_pass(&mut w), 0);
        assert_eq!(w.settler(agent).unwrap().state(), SettlerState::WalkingToEat);
    }

    #[test]
    fn test_named_does_not_steal_from_higher_named() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        w.spawn_node(ResourceKind::Flint, Vec2::new(4.0, 0.0), 5);
        w.spawn_node(ResourceKind::Stone, Vec2::new(4.0, 1.0), 5);
        let mut orders = OrderManager::new();

        let urgent = orders.issue("Ada gather flint !urgent", &mut w).unwrap();
        orders.assign_pass(&mut w);
        orders.issue("Ada gather stone", &mut w).unwrap();
        orders.assign_pass(&mut w);

        assert_eq!(w.settler(agent).unwrap().current_order(), Some(urgent));
    }

    #[test]
    fn test_target_position_bounds_search_and_places_marker() {
        let mut w = world();
        w.spawn_settler("Ada", Vec2::default());
        let near = w.spawn_node(ResourceKind::Wood, Vec2::new(1.0, 0.0), 5);
        let marked = w.spawn_node(ResourceKind::Wood, Vec2::new(40.0, 0.0), 5);
        let mut orders = OrderManager::new();
        let id = orders.issue("next gather wood at 41,0", &mut w).unwrap();

        assert_eq!(orders.markers().collect::<Vec<_>>(), vec![(id, Vec2::new(41.0, 0.0))]);
        orders.assign_pass(&mut w);

        assert!(marked.is_reserved());
        assert!(near.is_available());
    }

    #[test]
    fn test_cancel_releases_settlers_and_marker() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let node = w.spawn_node(ResourceKind::Wood, Vec2::new(1.0, 0.0), 5);
        let mut orders = OrderManager::new();
        let id = orders.issue("all gather wood at 1,0", &mut w).unwrap();
        orders.assign_pass(&mut w);
        assert!(node.is_reserved());

        w.events.drain();
        orders.cancel_order(id, &mut w).unwrap();

        assert!(node.is_available());
        assert!(w.settler(agent).unwrap().is_idle());
        assert!(orders.order(id).is_none());
        assert_eq!(orders.markers().count(), 0);
        let events = w.events.drain();
        assert!(events.contains(&GameEvent::MarkerRemoved { order: id }));
        assert!(events.contains(&GameEvent::OrderCancelled { order: id }));

        assert!(matches!(orders.cancel_order(id, &mut w), Err(SchedError::OrderNotFound(_))));
    }

    #[test]
    fn test_pause_releases_and_resume_reassigns() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let node = w.spawn_node(ResourceKind::Wood, Vec2::new(1.0, 0.0), 5);
        let mut orders = OrderManager::new();
        let id = orders.issue("Ada gather wood", &mut w).unwrap();
        orders.assign_pass(&mut w);

        assert_eq!(orders.toggle_pause(id, &mut w).unwrap(), OrderStatus::Paused);
        assert!(node.is_available());
        assert!(!orders.has_order_for(agent));
        assert_eq!(orders.assign_pass(&mut w), 0);

        assert_eq!(orders.toggle_pause(id, &mut w).unwrap(), OrderStatus::Active);
        assert_eq!(orders.assign_pass(&mut w), 1);
        assert!(node.is_reserved());
    }

    #[test]
    fn test_dead_named_settler_fails_order() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let mut orders = OrderManager::new();
        let id = orders.issue("Ada hunt", &mut w).unwrap();

        w.remove_settler(agent);
        orders.assign_pass(&mut w);
        assert_eq!(orders.order(id).unwrap().status, OrderStatus::Failed);

        assert_eq!(orders.cleanup_finished(&mut w), 1);
        assert!(orders.orders().is_empty());
    }

    #[test]
    fn test_query_surface() {
        let mut w = world();
        let a = w.spawn_settler("Ada", Vec2::default());
        let b = w.spawn_settler("Bo", Vec2::default());
        let mut orders = OrderManager::new();

        orders.issue("Ada gather wood", &mut w).unwrap();
        orders.issue("all do not hunt", &mut w).unwrap();

        assert!(orders.has_order_for(a));
        assert!(!orders.has_order_for(b));
        assert!(orders.is_task_forbidden(b, TaskKind::Hunt));
        assert!(!orders.is_task_forbidden(b, TaskKind::GatherWood));
    }

    #[test]
    fn test_prohibition_filters_group_orders() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let game = w.spawn_node(ResourceKind::Game, Vec2::new(1.0, 0.0), 5);
        let mut orders = OrderManager::new();
        orders.issue("all do not hunt", &mut w).unwrap();
        orders.issue("all hunt", &mut w).unwrap();

        assert_eq!(orders.assign_pass(&mut w), 0);
        assert!(game.is_available());

        // A direct named order still goes through
        orders.issue("Ada hunt !high", &mut w).unwrap();
        assert_eq!(orders.assign_pass(&mut w), 1);
        assert!(!w.settler(agent).unwrap().is_idle());
    }

    #[test]
    fn test_prohibited_settler_is_skipped_by_all_order() {
        let mut w = world();
        let ada = w.spawn_settler("Ada", Vec2::default());
        let bo = w.spawn_settler("Bo", Vec2::default());
        let game = w.spawn_node(ResourceKind::Game, Vec2::new(2.0, 0.0), 5);
        w.spawn_node(ResourceKind::Game, Vec2::new(3.0, 0.0), 5);
        let mut orders = OrderManager::new();
        orders.issue("Ada do not hunt", &mut w).unwrap();
        let id = orders.issue("all hunt", &mut w).unwrap();

        assert_eq!(orders.assign_pass(&mut w), 1);
        assert!(w.settler(ada).unwrap().is_idle());
        assert_eq!(w.settler(bo).unwrap().current_order(), Some(id));
        assert!(game.is_reserved());
    }

    #[test]
    fn test_prohibited_settler_is_skipped_by_next_free_order() {
        let mut w = world();
        let ada = w.spawn_settler("Ada", Vec2::default());
        let bo = w.spawn_settler("Bo", Vec2::default());
        w.spawn_node(ResourceKind::Game, Vec2::new(2.0, 0.0), 5);
        let mut orders = OrderManager::new();
        orders.issue("Ada do not hunt", &mut w).unwrap();
        let id = orders.issue("next hunt", &mut w).unwrap();

        assert_eq!(orders.assign_pass(&mut w), 1);
        assert_eq!(orders.order(id).unwrap().status, OrderStatus::Complete);
        assert!(w.settler(ada).unwrap().is_idle());
        assert_eq!(w.settler(bo).unwrap().current_order(), Some(id));
    }

    #[test]
    fn test_named_without_target_keeps_current_work() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let wood = w.spawn_node(ResourceKind::Wood, Vec2::new(10.0, 0.0), 5);
        let mut orders = OrderManager::new();
        let all = orders.issue("all gather wood", &mut w).unwrap();
        orders.assign_pass(&mut w);

        let named = orders.issue("Ada gather flint", &mut w).unwrap();
        w.events.drain();
        for _ in 0..5 {
            assert_eq!(orders.assign_pass(&mut w), 0);
        }

        assert!(wood.is_reserved());
        let settler = w.settler(agent).unwrap();
        assert_eq!(settler.current_order(), Some(all));
        assert_eq!(settler.current_task().map(|t| t.kind), Some(TaskKind::GatherWood));
        assert!(!w
            .events
            .drain()
            .iter()
            .any(|e| matches!(e, GameEvent::TaskPreempted { .. })));

        // Once flint shows up the named order takes over
        let flint = w.spawn_node(ResourceKind::Flint, Vec2::new(4.0, 0.0), 5);
        assert_eq!(orders.assign_pass(&mut w), 1);
        assert!(wood.is_available());
        assert!(flint.is_reserved());
        assert_eq!(w.settler(agent).unwrap().current_order(), Some(named));
        let events = w.events.drain();
        assert!(matches!(events[0], GameEvent::TaskPreempted { order, .. } if order == named));
        assert!(matches!(events[1], GameEvent::TaskAssigned { order: Some(o), .. } if o == named));
    }

    #[test]
    fn test_named_with_unreachable_target_keeps_current_work() {
        let mut w = world();
        w.set_blocked_zones(vec![crate::entity::movement::BlockedZone::new(Vec2::new(20.0, 0.0), 2.0)]);
        let agent = w.spawn_settler("Ada", Vec2::default());
        let wood = w.spawn_node(ResourceKind::Wood, Vec2::new(3.0, 0.0), 5);
        let flint = w.spawn_node(ResourceKind::Flint, Vec2::new(20.0, 0.0), 5);
        let mut orders = OrderManager::new();
        orders.issue("all gather wood", &mut w).unwrap();
        orders.assign_pass(&mut w);

        orders.issue("Ada gather flint", &mut w).unwrap();
        w.events.drain();
        assert_eq!(orders.assign_pass(&mut w), 0);

        assert!(wood.is_reserved());
        assert!(flint.is_available());
        assert!(!w.settler(agent).unwrap().is_idle());
        assert!(w.events.drain().is_empty());
    }

    #[test]
    fn test_named_can_take_over_its_own_claim() {
        let mut w = world();
        let agent = w.spawn_settler("Ada", Vec2::default());
        let wood = w.spawn_node(ResourceKind::Wood, Vec2::new(3.0, 0.0), 5);
        let mut orders = OrderManager::new();
        orders.issue("all gather wood", &mut w).unwrap();
        orders.assign_pass(&mut w);

        let named = orders.issue("Ada gather wood", &mut w).unwrap();
        assert_eq!(orders.assign_pass(&mut w), 1);

        assert!(wood.is_reserved());
        assert_eq!(w.settler(agent).unwrap().current_order(), Some(named));
    }

    #[test]
    fn test_build_order_targets_named_site() {
        let mut w = world();
        w.spawn_settler("Ada", Vec2::default());
        let near = w.spawn_site(Vec2::new(1.0, 0.0), 5.0);
        let far = w.spawn_site(Vec2::new(9.0, 0.0), 5.0);
        let mut orders = OrderManager::new();
        orders
            .create_order(
                OrderDraft::new(Subject::NextFree, Predicate::Build)
                    .object(crate::command::order::ObjectRef::Site(far.id()))
                    .priority(OrderPriority::High),
                &mut w,
            )
            .unwrap();

        orders.assign_pass(&mut w);
        assert!(far.is_reserved());
        assert!(!near.is_reserved());
    }
}
