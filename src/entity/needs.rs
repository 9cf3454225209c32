//! Hunger - the one need that can interrupt work

use serde::{Deserialize, Serialize};

use crate::core::config::SchedulerConfig;

/// What the hunger update asks of its settler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HungerSignal {
    Fine,
    /// Below the threshold: go eat
    Hungry,
    /// Starvation grace expired
    Starved,
}

/// Satiety scalar: `max` = fed, 0 = starving
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hunger {
    pub satiety: f32,
    pub max: f32,
    /// Seconds spent at zero satiety
    pub starving_for: f32,
    /// Seconds before the next attempt to eat is allowed
    pub retry_cooldown: f32,
}

impl Hunger {
    pub fn new(max: f32) -> Self {
        Self {
            satiety: max,
            max,
            starving_for: 0.0,
            retry_cooldown: 0.0,
        }
    }

    pub fn is_starving(&self) -> bool {
        self.satiety <= 0.0
    }

    /// Decay satiety and advance the starvation timer
    pub fn update(&mut self, dt: f32, config: &SchedulerConfig) -> HungerSignal {
        self.satiety = (self.satiety - config.hunger_decay_rate * dt).max(0.0);
        self.retry_cooldown = (self.retry_cooldown - dt).max(0.0);

        if self.is_starving() {
            self.starving_for += dt;
            if self.starving_for >= config.starvation_grace {
                return HungerSignal::Starved;
            }
        } else {
            self.starving_for = 0.0;
        }

        if self.satiety < config.hunger_threshold && self.retry_cooldown <= 0.0 {
            HungerSignal::Hungry
        } else {
            HungerSignal::Fine
        }
    }

    pub fn feed(&mut self) {
        self.satiety = self.max;
        self.starving_for = 0.0;
    }

    /// Back off after finding the larder empty
    pub fn defer(&mut self, seconds: f32) {
        self.retry_cooldown = seconds;
    }
}
