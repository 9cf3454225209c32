//! Scheduler configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other. The config is handed to the
//! `World` at construction; nothing reads it through a global.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SchedError};
use crate::world::resources::ResourceKind;

/// Configuration for the scheduling systems
///
/// Times are in simulated seconds, distances in world units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seed for the world RNG (idle pauses, wander targets, category rotation)
    pub seed: u64,

    // === SCHEDULER INTERVALS ===
    /// Seconds between order assignment passes
    ///
    /// Orders are batched rather than polled every tick. A released resource
    /// can sit unclaimed for up to this long.
    pub order_interval: f32,

    /// Seconds between auto-assignment passes
    ///
    /// Kept slower than `order_interval` so player orders get first pick.
    pub auto_assign_interval: f32,

    /// Seconds between building labor passes
    pub labor_interval: f32,

    /// Seconds between `has_worker` reconciliation sweeps
    pub reconcile_interval: f32,

    // === MOVEMENT ===
    /// Walking speed before task multipliers (units per second)
    pub base_speed: f32,

    /// Distance at which a destination counts as reached
    pub arrival_radius: f32,

    /// Speed multiplier granted to specialized building workers
    pub specialized_speed_multiplier: f32,

    // === IDLE BEHAVIOR ===
    /// Shortest idle pause between wander legs
    pub idle_pause_min: f32,

    /// Longest idle pause between wander legs
    ///
    /// Pauses are drawn uniformly from [min, max] so idle settlers do not
    /// re-poll in lockstep.
    pub idle_pause_max: f32,

    /// How far an idle settler wanders from where it stands
    pub wander_radius: f32,

    // === HUNGER ===
    /// Satiety of a freshly fed settler
    pub hunger_max: f32,

    /// Satiety lost per second
    ///
    /// At 0.5/s a full settler reaches the default threshold (30) in 140s.
    pub hunger_decay_rate: f32,

    /// Satiety below which the settler interrupts work to eat
    pub hunger_threshold: f32,

    /// Seconds a settler survives at zero satiety
    pub starvation_grace: f32,

    /// Seconds spent eating at the feeding spot
    pub eat_duration: f32,

    /// Seconds before retrying to eat after finding no food
    pub eat_retry_cooldown: f32,

    // === WORK ===
    /// Seconds to gather one unit from a non-game node
    pub gather_duration: f32,

    /// Seconds to bring down one unit of game
    pub hunt_duration: f32,

    /// Seconds per construction cycle (work added per cycle equals this)
    pub build_cycle_duration: f32,

    /// Seconds spent unloading at storage or a building
    pub deliver_duration: f32,

    // === SEARCH ===
    /// Radius around an order's target position searched for resources
    pub order_search_radius: f32,

    /// Radius around a specialized worker's base searched for a substitute node
    pub substitute_search_radius: f32,

    /// Radius around a production building searched for its input nodes
    pub labor_search_radius: f32,

    /// Relative weights for the auto-assigner's category rotation
    pub category_weights: CategoryWeights,
}

/// Auto-assignment weight per resource category
///
/// A zero weight removes the category from the rotation entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub wood: u32,
    pub stone: u32,
    pub flint: u32,
    pub berries: u32,
    pub game: u32,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            wood: 3,
            stone: 2,
            flint: 1,
            berries: 3,
            game: 1,
        }
    }
}

impl CategoryWeights {
    pub fn weight(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Flint => self.flint,
            ResourceKind::Berries => self.berries,
            ResourceKind::Game => self.game,
        }
    }

    pub fn total(&self) -> u32 {
        ResourceKind::ALL.iter().map(|k| self.weight(*k)).sum()
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            seed: 12345,

            order_interval: 0.5,
            auto_assign_interval: 1.0,
            labor_interval: 1.0,
            reconcile_interval: 5.0,

            base_speed: 3.0,
            arrival_radius: 0.5,
            specialized_speed_multiplier: 1.2,

            idle_pause_min: 1.0,
            idle_pause_max: 4.0,
            wander_radius: 5.0,

            hunger_max: 100.0,
            hunger_decay_rate: 0.5,
            hunger_threshold: 30.0,
            starvation_grace: 30.0,
            eat_duration: 3.0,
            eat_retry_cooldown: 10.0,

            gather_duration: 3.0,
            hunt_duration: 5.0,
            build_cycle_duration: 2.0,
            deliver_duration: 1.0,

            order_search_radius: 15.0,
            substitute_search_radius: 25.0,
            labor_search_radius: 30.0,

            category_weights: CategoryWeights::default(),
        }
    }
}

impl SchedulerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Work time for one cycle of a gather kind
    pub fn gather_time(&self, kind: ResourceKind) -> f32 {
        match kind {
            ResourceKind::Game => self.hunt_duration,
            _ => self.gather_duration,
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("order_interval", self.order_interval),
            ("auto_assign_interval", self.auto_assign_interval),
            ("labor_interval", self.labor_interval),
            ("reconcile_interval", self.reconcile_interval),
        ];
        for (name, value) in intervals {
            if !value.is_finite() || value <= 0.0 {
                return Err(SchedError::InvalidConfig(format!(
                    "{} must be positive (got {})",
                    name, value
                )));
            }
        }

        // Durations and radii feed timers and RNG ranges; zero is allowed
        let non_negative = [
            ("arrival_radius", self.arrival_radius),
            ("idle_pause_min", self.idle_pause_min),
            ("idle_pause_max", self.idle_pause_max),
            ("wander_radius", self.wander_radius),
            ("hunger_max", self.hunger_max),
            ("hunger_decay_rate", self.hunger_decay_rate),
            ("hunger_threshold", self.hunger_threshold),
            ("starvation_grace", self.starvation_grace),
            ("eat_duration", self.eat_duration),
            ("eat_retry_cooldown", self.eat_retry_cooldown),
            ("gather_duration", self.gather_duration),
            ("hunt_duration", self.hunt_duration),
            ("build_cycle_duration", self.build_cycle_duration),
            ("deliver_duration", self.deliver_duration),
            ("order_search_radius", self.order_search_radius),
            ("substitute_search_radius", self.substitute_search_radius),
            ("labor_search_radius", self.labor_search_radius),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SchedError::InvalidConfig(format!(
                    "{} must be finite and non-negative (got {})",
                    name, value
                )));
            }
        }

        let speeds = [self.base_speed, self.specialized_speed_multiplier];
        if speeds.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SchedError::InvalidConfig("speeds must be positive".into()));
        }

        if self.idle_pause_min > self.idle_pause_max {
            return Err(SchedError::InvalidConfig(format!(
                "idle_pause_min ({}) must be within [0, idle_pause_max ({})]",
                self.idle_pause_min, self.idle_pause_max
            )));
        }

        // Threshold must sit strictly inside the satiety range
        if self.hunger_threshold <= 0.0 || self.hunger_threshold >= self.hunger_max {
            return Err(SchedError::InvalidConfig(format!(
                "hunger_threshold ({}) must be in (0, hunger_max ({}))",
                self.hunger_threshold, self.hunger_max
            )));
        }

        if self.category_weights.total() == 0 {
            return Err(SchedError::InvalidConfig(
                "at least one category weight must be non-zero".into(),
            ));
        }

        Ok(())
    }
}
