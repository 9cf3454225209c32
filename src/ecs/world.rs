//! World - registry of settlers, claimable entities, buildings and storage
//!
//! Schedulers receive the world explicitly on every pass and query it fresh;
//! nothing caches world state between passes.

use std::rc::Rc;

use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::city::building::{BuildingArchetype, BuildingKind};
use crate::city::construction::ConstructionSite;
use crate::city::stockpile::Stockpile;
use crate::core::config::SchedulerConfig;
use crate::core::error::{Result, SchedError};
use crate::core::types::{AgentId, BuildingId, OrderId, ReservableId, Tick, Vec2};
use crate::entity::movement::{BlockedZone, Movement, StraightLineMovement};
use crate::entity::settler::{Settler, SettlerContext, TickOutcome};
use crate::entity::tasks::Task;
use crate::simulation::events::{EventBus, GameEvent};
use crate::world::reservation::{Reservable, ReservableRef, Reservation};
use crate::world::resources::{ResourceKind, ResourceNode};

/// The settlement containing all settlers and claimable entities
pub struct World {
    pub config: SchedulerConfig,
    pub current_tick: Tick,
    /// Simulated seconds since start
    pub elapsed: f32,
    settlers: Vec<Settler>,
    pub nodes: Vec<Rc<ResourceNode>>,
    pub sites: Vec<Rc<ConstructionSite>>,
    pub buildings: BuildingArchetype,
    pub stockpile: Stockpile,
    /// Entrance of the settlement storage; base of every non-specialized task
    pub storage_position: Vec2,
    pub feeding_position: Vec2,
    pub blocked: Rc<[BlockedZone]>,
    pub events: EventBus,
    pub rng: ChaCha8Rng,
    next_agent: u32,
    next_reservable: u32,
    next_building: u32,
}

impl World {
    /// Build an empty world; the config is validated first
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: SchedulerConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            current_tick: 0,
            elapsed: 0.0,
            settlers: Vec::new(),
            nodes: Vec::new(),
            sites: Vec::new(),
            buildings: BuildingArchetype::new(),
            stockpile: Stockpile::new(),
            storage_position: Vec2::default(),
            feeding_position: Vec2::default(),
            blocked: Rc::from(Vec::new()),
            events: EventBus::new(),
            rng,
            next_agent: 0,
            next_reservable: 0,
            next_building: 0,
        }
    }

    /// Zones without a route; applies to settlers spawned afterwards
    pub fn set_blocked_zones(&mut self, zones: Vec<BlockedZone>) {
        self.blocked = Rc::from(zones);
    }

    // === SPAWNING ===

    pub fn spawn_settler(&mut self, name: impl Into<String>, position: Vec2) -> AgentId {
        let movement = StraightLineMovement::new(position, self.config.base_speed, self.config.arrival_radius)
            .with_blocked(self.blocked.clone());
        self.spawn_settler_with(name, Box::new(movement))
    }

    /// Spawn with a caller-supplied movement controller
    pub fn spawn_settler_with(&mut self, name: impl Into<String>, movement: Box<dyn Movement>) -> AgentId {
        self.next_agent += 1;
        let id = AgentId(self.next_agent);
        let settler = Settler::new(id, name.into(), movement, &self.config);
        debug!(settler = %id, name = %settler.name, "settler spawned");
        self.settlers.push(settler);
        self.events.publish(GameEvent::PopulationChanged {
            population: self.settlers.len(),
        });
        id
    }

    pub fn spawn_node(&mut self, kind: ResourceKind, position: Vec2, capacity: u32) -> Rc<ResourceNode> {
        let node = Rc::new(ResourceNode::new(self.alloc_reservable(), kind, position, capacity));
        self.nodes.push(node.clone());
        node
    }

    pub fn spawn_site(&mut self, position: Vec2, work_required: f32) -> Rc<ConstructionSite> {
        let site = Rc::new(ConstructionSite::new(self.alloc_reservable(), position, work_required));
        self.sites.push(site.clone());
        site
    }

    /// Place a production building as a construction site
    pub fn spawn_building(&mut self, kind: BuildingKind, position: Vec2) -> (BuildingId, Rc<ConstructionSite>) {
        self.next_building += 1;
        let building = BuildingId(self.next_building);
        self.buildings.spawn(building, kind, position);

        let site = Rc::new(
            ConstructionSite::new(self.alloc_reservable(), position, kind.work_required()).for_building(building),
        );
        self.sites.push(site.clone());
        (building, site)
    }

    fn alloc_reservable(&mut self) -> ReservableId {
        self.next_reservable += 1;
        ReservableId(self.next_reservable)
    }

    // === SETTLER QUERIES ===

    pub fn settlers(&self) -> &[Settler] {
        &self.settlers
    }

    pub fn population(&self) -> usize {
        self.settlers.len()
    }

    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.settlers.iter().position(|s| s.id == id)
    }

    pub fn settler(&self, id: AgentId) -> Option<&Settler> {
        self.settlers.iter().find(|s| s.id == id)
    }

    pub fn settler_mut(&mut self, id: AgentId) -> Option<&mut Settler> {
        self.settlers.iter_mut().find(|s| s.id == id)
    }

    /// Settlers answering to `name` (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Vec<AgentId> {
        self.settlers
            .iter()
            .filter(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .map(|s| s.id)
            .collect()
    }

    /// Idle settlers in registry order
    pub fn idle_settlers(&self) -> Vec<AgentId> {
        self.settlers.iter().filter(|s| s.is_idle()).map(|s| s.id).collect()
    }

    // === RESERVABLE QUERIES ===

    /// Available nodes of the given kinds, nearest to `around` first
    ///
    /// With a radius, nodes farther than it are skipped. Equal distances keep
    /// registry order, so the first node found at the minimal distance wins.
    pub fn node_candidates(&self, kinds: &[ResourceKind], around: Vec2, radius: Option<f32>) -> Vec<ReservableRef> {
        let mut candidates: Vec<&Rc<ResourceNode>> = self
            .nodes
            .iter()
            .filter(|n| kinds.contains(&n.kind()) && n.is_available())
            .filter(|n| radius.map_or(true, |r| n.position().distance(&around) <= r))
            .collect();
        candidates.sort_by_key(|n| OrderedFloat(n.position().distance(&around)));
        candidates
            .into_iter()
            .map(|n| ReservableRef::Node(n.clone()))
            .collect()
    }

    /// Unclaimed construction sites, nearest first, optionally one specific site
    pub fn site_candidates(&self, around: Vec2, radius: Option<f32>, only: Option<ReservableId>) -> Vec<ReservableRef> {
        let mut candidates: Vec<&Rc<ConstructionSite>> = self
            .sites
            .iter()
            .filter(|s| s.is_available())
            .filter(|s| only.map_or(true, |id| s.id() == id))
            .filter(|s| radius.map_or(true, |r| s.position().distance(&around) <= r))
            .collect();
        candidates.sort_by_key(|s| OrderedFloat(s.position().distance(&around)));
        candidates
            .into_iter()
            .map(|s| ReservableRef::Site(s.clone()))
            .collect()
    }

    pub fn has_unclaimed_construction(&self) -> bool {
        self.sites.iter().any(|s| s.is_available())
    }

    // === TASK PLUMBING ===

    /// Gather task delivering to storage
    pub fn gather_task(&self, reservation: Reservation, kind: ResourceKind) -> Task {
        Task::gather(reservation, kind, self.storage_position, self.config.gather_time(kind))
    }

    pub fn build_task(&self, reservation: Reservation) -> Task {
        Task::build(reservation, self.config.build_cycle_duration)
    }

    /// Hand a task to a settler
    ///
    /// On rejection the task is dropped here, which releases its claim.
    pub fn assign_task(&mut self, agent: AgentId, task: Task) -> Result<()> {
        self.hand_over(agent, task, None)
    }

    /// Hand a task to a settler whose previous work was cleared for `order`
    ///
    /// `TaskPreempted` is published only if the settler takes the task.
    pub fn assign_preempting(&mut self, agent: AgentId, task: Task, order: OrderId) -> Result<()> {
        self.hand_over(agent, task, Some(order))
    }

    fn hand_over(&mut self, agent: AgentId, task: Task, preempted_for: Option<OrderId>) -> Result<()> {
        let Some(idx) = self.index_of(agent) else {
            return Err(SchedError::UnknownSettler(agent.to_string()));
        };

        let kind = task.kind;
        let order = task.order_id;
        match self.settlers[idx].assign_task(task) {
            Ok(()) => {
                debug!(settler = %agent, ?kind, ?order, "task assigned");
                if let Some(by) = preempted_for {
                    self.events.publish(GameEvent::TaskPreempted { agent, order: by });
                }
                self.events.publish(GameEvent::TaskAssigned { agent, kind, order });
                Ok(())
            }
            Err(rejected) => {
                debug!(settler = %agent, ?kind, reason = %rejected.reason, "task rejected");
                Err(SchedError::AssignmentRejected(rejected.reason))
            }
        }
    }

    /// Drop a settler's tasks and claims
    pub fn clear_task(&mut self, agent: AgentId) -> bool {
        let Some(idx) = self.index_of(agent) else {
            return false;
        };
        let World { settlers, rng, config, .. } = self;
        settlers[idx].clear_task(rng, config);
        true
    }

    /// Release every settler serving `order`
    pub fn release_order(&mut self, order: OrderId) -> usize {
        let World { settlers, rng, config, .. } = self;
        settlers
            .iter_mut()
            .filter_map(|s| s.release_order(order, rng, config).then_some(s.id))
            .count()
    }

    /// Remove a settler; its claims are released before it leaves
    pub fn remove_settler(&mut self, agent: AgentId) -> Option<Settler> {
        let idx = self.index_of(agent)?;
        let mut settler = self.settlers.remove(idx);
        settler.clear_task(&mut self.rng, &self.config);

        self.events.publish(GameEvent::SettlerDied {
            agent,
            name: settler.name.clone(),
        });
        self.events.publish(GameEvent::PopulationChanged {
            population: self.settlers.len(),
        });
        Some(settler)
    }

    /// Advance every settler one tick; returns the settlers that died
    pub fn update_settlers(&mut self, dt: f32) -> Vec<AgentId> {
        let mut dead = Vec::new();
        {
            let World {
                config,
                rng,
                stockpile,
                buildings,
                nodes,
                sites,
                feeding_position,
                events,
                settlers,
                ..
            } = self;
            let mut ctx = SettlerContext {
                config: &*config,
                rng,
                stockpile,
                buildings,
                nodes: nodes.as_slice(),
                sites: sites.as_slice(),
                feeding_position: *feeding_position,
                events,
            };
            for settler in settlers.iter_mut() {
                if settler.update(dt, &mut ctx) == TickOutcome::Died {
                    dead.push(settler.id);
                }
            }
        }

        for agent in &dead {
            if let Some(settler) = self.remove_settler(*agent) {
                info!(settler = %agent, name = %settler.name, "settler removed after starving");
            }
        }

        self.current_tick += 1;
        self.elapsed += dt;
        dead
    }
}

impl Default for World {
    fn default() -> Self {
        Self::with_valid_config(SchedulerConfig::default())
    }
}
