//! Settler state machine
//!
//! Each settler owns at most one task (plus one parked task while eating)
//! and advances it tick by tick:
//!
//! ```text
//! IdlePausing <-> IdleWalking                         (wander loop)
//! WalkingToTarget -> Working -> ReturningToBase -> Delivering -> WalkingToTarget | IdlePausing
//! WalkingToEat -> Eating -> (resume parked task | IdlePausing)
//! ```
//!
//! Reservations live inside tasks, so every path that drops a task also
//! drops its claim.

use std::rc::Rc;

use ordered_float::OrderedFloat;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::city::building::BuildingArchetype;
use crate::city::construction::{ConstructionSite, ContributionResult};
use crate::city::stockpile::Stockpile;
use crate::core::config::SchedulerConfig;
use crate::core::error::RejectReason;
use crate::core::types::{AgentId, BuildingId, OrderId, Vec2};
use crate::entity::movement::Movement;
use crate::entity::needs::{Hunger, HungerSignal};
use crate::entity::tasks::{Delivery, Task, TaskKind, TaskSlot};
use crate::simulation::events::{EventBus, GameEvent};
use crate::world::reservation::{Reservable, ReservableRef, Reservation};
use crate::world::resources::{ResourceKind, ResourceNode};

/// Where a settler is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlerState {
    IdlePausing,
    IdleWalking,
    WalkingToTarget,
    Working,
    ReturningToBase,
    Delivering,
    WalkingToEat,
    Eating,
}

impl SettlerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SettlerState::IdlePausing | SettlerState::IdleWalking)
    }

    /// Whether the settler may be pulled off what it is doing
    ///
    /// This is the only place critical states are listed. Order preemption
    /// and the hunger interrupt both go through it.
    pub fn is_interruptible(&self) -> bool {
        !matches!(
            self,
            SettlerState::WalkingToEat | SettlerState::Eating | SettlerState::Delivering
        )
    }
}

/// Presentation-facing role, updated with each assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlerRole {
    Idle,
    Gatherer(ResourceKind),
    Builder,
    Specialist(BuildingId),
    Eating,
}

/// A task handed back by `Settler::assign_task`
///
/// Dropping it releases whatever the task had claimed.
#[derive(Debug)]
pub struct Rejected {
    pub task: Task,
    pub reason: RejectReason,
}

/// Whether the settler survived its update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Alive,
    Died,
}

/// World state a settler reads and writes while updating
pub struct SettlerContext<'a> {
    pub config: &'a SchedulerConfig,
    pub rng: &'a mut ChaCha8Rng,
    pub stockpile: &'a mut Stockpile,
    pub buildings: &'a mut BuildingArchetype,
    pub nodes: &'a [Rc<ResourceNode>],
    pub sites: &'a [Rc<ConstructionSite>],
    pub feeding_position: Vec2,
    pub events: &'a mut EventBus,
}

impl SettlerContext<'_> {
    /// Any construction site nobody has claimed yet
    pub fn has_unclaimed_construction(&self) -> bool {
        self.sites.iter().any(|site| site.is_available())
    }

    /// Nearest available node of `kind` within `radius` of `around`
    fn substitutes(&self, kind: ResourceKind, around: Vec2, radius: f32) -> Vec<ReservableRef> {
        let mut candidates: Vec<&Rc<ResourceNode>> = self
            .nodes
            .iter()
            .filter(|n| n.kind() == kind && n.is_available())
            .filter(|n| n.position().distance(&around) <= radius)
            .collect();
        candidates.sort_by_key(|n| OrderedFloat(n.position().distance(&around)));
        candidates
            .into_iter()
            .map(|n| ReservableRef::Node(n.clone()))
            .collect()
    }
}

/// Random idle pause, spread so settlers do not re-poll in lockstep
pub fn random_pause(rng: &mut ChaCha8Rng, config: &SchedulerConfig) -> f32 {
    if config.idle_pause_max > config.idle_pause_min {
        rng.gen_range(config.idle_pause_min..=config.idle_pause_max)
    } else {
        config.idle_pause_min
    }
}

#[derive(Debug)]
pub struct Settler {
    pub id: AgentId,
    pub name: String,
    /// Anchor of the idle wander loop
    pub home: Vec2,
    state: SettlerState,
    slot: TaskSlot,
    hunger: Hunger,
    movement: Box<dyn Movement>,
    base_speed: f32,
    /// Countdown for the current timed state (pause, work, delivery, meal)
    timer: f32,
    role: SettlerRole,
}

impl Settler {
    pub fn new(id: AgentId, name: String, movement: Box<dyn Movement>, config: &SchedulerConfig) -> Self {
        let home = movement.position();
        let mut movement = movement;
        movement.set_speed(config.base_speed);
        Self {
            id,
            name,
            home,
            state: SettlerState::IdlePausing,
            slot: TaskSlot::Idle,
            hunger: Hunger::new(config.hunger_max),
            movement,
            base_speed: config.base_speed,
            timer: config.idle_pause_min,
            role: SettlerRole::Idle,
        }
    }

    pub fn state(&self) -> SettlerState {
        self.state
    }

    pub fn role(&self) -> SettlerRole {
        self.role
    }

    /// No task at all, not even a meal
    pub fn is_idle(&self) -> bool {
        self.slot.is_idle()
    }

    /// Can an order pull this settler off its current work
    pub fn is_interruptible(&self) -> bool {
        self.state.is_interruptible() && !self.hunger.is_starving()
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.slot.current()
    }

    pub fn saved_task(&self) -> Option<&Task> {
        self.slot.saved()
    }

    /// The work task, looking past an eat interrupt
    pub fn work_task(&self) -> Option<&Task> {
        self.slot.work()
    }

    /// Order served by the settler's work task
    pub fn current_order(&self) -> Option<OrderId> {
        self.slot.work().and_then(|t| t.order_id)
    }

    pub fn hunger(&self) -> &Hunger {
        &self.hunger
    }

    pub fn hunger_mut(&mut self) -> &mut Hunger {
        &mut self.hunger
    }

    pub fn position(&self) -> Vec2 {
        self.movement.position()
    }

    pub fn speed(&self) -> f32 {
        self.movement.speed()
    }

    pub fn can_reach(&self, pos: Vec2) -> bool {
        self.movement.can_reach(pos)
    }

    /// Take on a task
    ///
    /// Refused if the settler already has one or there is no route to the
    /// target. A refused task comes back to the caller.
    pub fn assign_task(&mut self, task: Task) -> std::result::Result<(), Rejected> {
        if !self.slot.is_idle() {
            return Err(Rejected {
                task,
                reason: RejectReason::Busy,
            });
        }
        if !self.movement.set_destination(task.target_position) {
            debug!(settler = %self.id, kind = ?task.kind, "no route to task target");
            return Err(Rejected {
                task,
                reason: RejectReason::Unreachable,
            });
        }

        self.movement.set_speed(self.base_speed * task.speed_multiplier);
        self.role = role_for(&task);
        self.state = SettlerState::WalkingToTarget;
        self.slot = TaskSlot::Running(task);
        Ok(())
    }

    /// Drop all tasks and go idle; releases every claim held
    pub fn clear_task(&mut self, rng: &mut ChaCha8Rng, config: &SchedulerConfig) {
        self.slot = TaskSlot::Idle;
        self.movement.stop();
        self.movement.set_speed(self.base_speed);
        self.role = SettlerRole::Idle;
        self.state = SettlerState::IdlePausing;
        self.timer = random_pause(rng, config);
    }

    /// Stop serving `order`; returns true if anything was released
    ///
    /// A settler eating with the order's task parked keeps eating and only
    /// loses the parked task.
    pub fn release_order(&mut self, order: OrderId, rng: &mut ChaCha8Rng, config: &SchedulerConfig) -> bool {
        match self.slot.take() {
            TaskSlot::Running(task) if task.order_id == Some(order) => {
                drop(task);
                self.clear_task(rng, config);
                true
            }
            TaskSlot::Suspended { active, saved } if saved.order_id == Some(order) => {
                drop(saved);
                self.slot = TaskSlot::Running(active);
                true
            }
            other => {
                self.slot = other;
                false
            }
        }
    }

    /// Advance one tick
    pub fn update(&mut self, dt: f32, ctx: &mut SettlerContext) -> TickOutcome {
        self.movement.advance(dt);

        match self.hunger.update(dt, ctx.config) {
            HungerSignal::Starved => {
                warn!(settler = %self.id, name = %self.name, "settler starved");
                return TickOutcome::Died;
            }
            HungerSignal::Hungry if self.state.is_interruptible() => self.start_eating(ctx),
            _ => {}
        }

        match self.state {
            SettlerState::IdlePausing => self.step_pausing(dt, ctx),
            SettlerState::IdleWalking => self.step_wandering(ctx),
            SettlerState::WalkingToTarget => self.step_walking_to_target(ctx),
            SettlerState::Working => self.step_working(dt, ctx),
            SettlerState::ReturningToBase => self.step_returning(ctx),
            SettlerState::Delivering => self.step_delivering(dt, ctx),
            SettlerState::WalkingToEat => self.step_walking_to_eat(ctx),
            SettlerState::Eating => self.step_eating(dt, ctx),
        }

        TickOutcome::Alive
    }

    /// Park the current task and head for food
    pub fn start_eating(&mut self, ctx: &mut SettlerContext) {
        if !self.movement.set_destination(ctx.feeding_position) {
            warn!(settler = %self.id, "no route to feeding spot");
            self.hunger.defer(ctx.config.eat_retry_cooldown);
            return;
        }

        let meal = Task::eat(ctx.feeding_position, ctx.config.eat_duration);
        self.slot = match self.slot.take() {
            TaskSlot::Idle => TaskSlot::Running(meal),
            TaskSlot::Running(saved) => TaskSlot::Suspended { active: meal, saved },
            // Already eating; keep the existing interrupt
            suspended @ TaskSlot::Suspended { .. } => suspended,
        };

        debug!(settler = %self.id, satiety = self.hunger.satiety, "going to eat");
        self.movement.set_speed(self.base_speed);
        self.role = SettlerRole::Eating;
        self.state = SettlerState::WalkingToEat;
    }

    fn step_pausing(&mut self, dt: f32, ctx: &mut SettlerContext) {
        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }

        let r = ctx.config.wander_radius;
        let offset = Vec2::new(ctx.rng.gen_range(-r..=r), ctx.rng.gen_range(-r..=r));
        if self.movement.set_destination(self.home + offset) {
            self.state = SettlerState::IdleWalking;
        } else {
            self.timer = random_pause(ctx.rng, ctx.config);
        }
    }

    fn step_wandering(&mut self, ctx: &mut SettlerContext) {
        let arrival = self.movement.has_arrived();
        if arrival.arrived || !arrival.reachable {
            self.movement.stop();
            self.state = SettlerState::IdlePausing;
            self.timer = random_pause(ctx.rng, ctx.config);
        }
    }

    fn step_walking_to_target(&mut self, ctx: &mut SettlerContext) {
        let Some(task) = self.slot.current_mut() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };
        if let Err(err) = task.check_target() {
            debug!(settler = %self.id, %err);
            self.handle_invalid_target(ctx);
            return;
        }
        let work_duration = task.work_duration;

        let arrival = self.movement.has_arrived();
        if !arrival.reachable {
            debug!(settler = %self.id, "lost route to task target");
            self.clear_task(ctx.rng, ctx.config);
        } else if arrival.arrived {
            self.state = SettlerState::Working;
            self.timer = work_duration;
        }
    }

    fn step_working(&mut self, dt: f32, ctx: &mut SettlerContext) {
        let Some(task) = self.slot.current_mut() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };
        if let Err(err) = task.check_target() {
            debug!(settler = %self.id, %err);
            self.handle_invalid_target(ctx);
            return;
        }

        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }

        if task.kind == TaskKind::Build {
            self.finish_build_cycle(ctx);
        } else {
            self.finish_gather_cycle(ctx);
        }
    }

    fn finish_gather_cycle(&mut self, ctx: &mut SettlerContext) {
        let Some(task) = self.slot.current_mut() else {
            return;
        };
        let harvested = task
            .reservation()
            .and_then(|r| r.target().as_node())
            .map(|node| node.harvest(1))
            .unwrap_or(0);
        if harvested == 0 {
            task.target_valid = false;
            self.handle_invalid_target(ctx);
            return;
        }

        task.carrying += harvested;
        let base = task.base_position;
        if self.movement.set_destination(base) {
            self.state = SettlerState::ReturningToBase;
        } else {
            warn!(settler = %self.id, "no route back to base, dropping load");
            self.clear_task(ctx.rng, ctx.config);
        }
    }

    fn finish_build_cycle(&mut self, ctx: &mut SettlerContext) {
        let Some(task) = self.slot.current_mut() else {
            return;
        };
        let work = task.work_duration;
        let Some(site) = task.reservation().and_then(|r| r.target().as_site()).cloned() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };

        match site.add_work(work) {
            ContributionResult::InProgress { .. } => {
                self.timer = work;
            }
            ContributionResult::Completed { .. } => {
                let building = site.building();
                if let Some(building) = building {
                    ctx.buildings.complete(building);
                }
                info!(settler = %self.id, site = %site.id(), "construction finished");
                ctx.events.publish(GameEvent::BuildingCompleted {
                    site: site.id(),
                    building,
                });
                self.clear_task(ctx.rng, ctx.config);
            }
            ContributionResult::AlreadyComplete => {
                self.clear_task(ctx.rng, ctx.config);
            }
        }
    }

    fn step_returning(&mut self, ctx: &mut SettlerContext) {
        let arrival = self.movement.has_arrived();
        if !arrival.reachable {
            warn!(settler = %self.id, "lost route to base, dropping load");
            self.clear_task(ctx.rng, ctx.config);
        } else if arrival.arrived {
            self.state = SettlerState::Delivering;
            self.timer = ctx.config.deliver_duration;
        }
    }

    fn step_delivering(&mut self, dt: f32, ctx: &mut SettlerContext) {
        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }

        let Some(task) = self.slot.current_mut() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };
        let Some(kind) = task.kind.resource_kind() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };

        let amount = std::mem::take(&mut task.carrying);
        let delivered_to_building = match task.delivery {
            Delivery::Building(id) => ctx.buildings.deposit(id, amount),
            Delivery::Storage => false,
        };
        if !delivered_to_building {
            ctx.stockpile.add(kind, amount);
        }
        ctx.events.publish(GameEvent::ResourceDelivered {
            agent: self.id,
            kind,
            amount,
            delivery: task.delivery,
        });

        self.repeat_cycle(ctx);
    }

    /// After a delivery: re-claim the same node, find a substitute, or go idle
    fn repeat_cycle(&mut self, ctx: &mut SettlerContext) {
        let Some(task) = self.slot.current_mut() else {
            return;
        };

        // Release before trying again; the node may have been claimed or
        // emptied during the round trip.
        let previous = task.take_reservation().map(|r| r.target().clone());

        if !task.is_specialized && ctx.has_unclaimed_construction() {
            debug!(settler = %self.id, "construction pending, leaving gather cycle");
            self.clear_task(ctx.rng, ctx.config);
            return;
        }

        if let Some(reclaimed) = previous.and_then(|target| Reservation::acquire(target).ok()) {
            task.retarget(reclaimed);
            let target = task.target_position;
            self.head_back_to_target(target, ctx);
            return;
        }

        if task.is_specialized {
            self.seek_substitute(ctx);
        } else {
            self.clear_task(ctx.rng, ctx.config);
        }
    }

    /// The target went away mid-task
    fn handle_invalid_target(&mut self, ctx: &mut SettlerContext) {
        let specialized_gather = self
            .slot
            .current()
            .is_some_and(|t| t.is_specialized && t.kind.is_gather());

        if specialized_gather {
            if let Some(task) = self.slot.current_mut() {
                drop(task.take_reservation());
            }
            self.seek_substitute(ctx);
        } else {
            debug!(settler = %self.id, "task target invalidated, going idle");
            self.clear_task(ctx.rng, ctx.config);
        }
    }

    /// Specialized workers look for another node of the same kind near base
    fn seek_substitute(&mut self, ctx: &mut SettlerContext) {
        let Some(task) = self.slot.current_mut() else {
            return;
        };
        let Some(kind) = task.kind.resource_kind() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };

        let candidates = ctx.substitutes(kind, task.base_position, ctx.config.substitute_search_radius);
        match Reservation::acquire_first(candidates) {
            Some(reservation) => {
                debug!(settler = %self.id, node = %reservation.id(), "switching to substitute node");
                task.retarget(reservation);
                let target = task.target_position;
                self.head_back_to_target(target, ctx);
            }
            None => {
                debug!(settler = %self.id, ?kind, "no substitute node near base");
                self.clear_task(ctx.rng, ctx.config);
            }
        }
    }

    fn head_back_to_target(&mut self, target: Vec2, ctx: &mut SettlerContext) {
        if self.movement.set_destination(target) {
            self.state = SettlerState::WalkingToTarget;
        } else {
            self.clear_task(ctx.rng, ctx.config);
        }
    }

    fn step_walking_to_eat(&mut self, ctx: &mut SettlerContext) {
        let arrival = self.movement.has_arrived();
        if !arrival.reachable {
            self.hunger.defer(ctx.config.eat_retry_cooldown);
            self.finish_eating(ctx);
        } else if arrival.arrived {
            self.state = SettlerState::Eating;
            self.timer = ctx.config.eat_duration;
        }
    }

    fn step_eating(&mut self, dt: f32, ctx: &mut SettlerContext) {
        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }

        if ctx.stockpile.take_food() {
            self.hunger.feed();
        } else {
            debug!(settler = %self.id, "no food in stockpile");
            self.hunger.defer(ctx.config.eat_retry_cooldown);
        }
        self.finish_eating(ctx);
    }

    /// Resume the parked task if it is still worth doing, else go idle
    fn finish_eating(&mut self, ctx: &mut SettlerContext) {
        let TaskSlot::Suspended { active: _, mut saved } = self.slot.take() else {
            self.clear_task(ctx.rng, ctx.config);
            return;
        };

        let (destination, next_state) = if saved.carrying > 0 {
            (saved.base_position, SettlerState::ReturningToBase)
        } else {
            (saved.target_position, SettlerState::WalkingToTarget)
        };
        let resumable = saved.carrying > 0 || saved.check_target().is_ok();

        if resumable && self.movement.set_destination(destination) {
            debug!(settler = %self.id, kind = ?saved.kind, "resuming task after meal");
            self.movement.set_speed(self.base_speed * saved.speed_multiplier);
            self.role = role_for(&saved);
            self.state = next_state;
            self.slot = TaskSlot::Running(saved);
        } else {
            drop(saved);
            self.clear_task(ctx.rng, ctx.config);
        }
    }
}

fn role_for(task: &Task) -> SettlerRole {
    match (task.kind, task.delivery) {
        (TaskKind::Eat, _) => SettlerRole::Eating,
        (TaskKind::Build, _) => SettlerRole::Builder,
        (_, Delivery::Building(id)) if task.is_specialized => SettlerRole::Specialist(id),
        (kind, _) => kind
            .resource_kind()
            .map(SettlerRole::Gatherer)
            .unwrap_or(SettlerRole::Idle),
    }
}
