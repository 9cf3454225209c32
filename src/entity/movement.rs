//! Movement collaborator
//!
//! Route planning lives outside the scheduling core. Settlers only ask a
//! `Movement` implementation to head somewhere and poll whether they got
//! there. `StraightLineMovement` is the in-crate implementation: it walks in
//! a straight line and treats destinations inside blocked zones as having no
//! route.

use std::rc::Rc;

use crate::core::types::Vec2;

/// Result of polling a movement controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub arrived: bool,
    /// False once the controller has given up on the current destination
    pub reachable: bool,
}

/// Contract for whatever moves a settler around
pub trait Movement: std::fmt::Debug {
    /// Head for `pos`; false if no route exists
    fn set_destination(&mut self, pos: Vec2) -> bool;

    /// Whether a route to `pos` exists, without changing course
    fn can_reach(&self, pos: Vec2) -> bool;

    fn has_arrived(&self) -> Arrival;

    fn set_speed(&mut self, speed: f32);

    fn speed(&self) -> f32;

    fn position(&self) -> Vec2;

    /// Advance along the current route
    fn advance(&mut self, dt: f32);

    /// Forget the current destination
    fn stop(&mut self);
}

/// Circular region with no route into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockedZone {
    pub center: Vec2,
    pub radius: f32,
}

impl BlockedZone {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        self.center.distance(&pos) <= self.radius
    }
}

/// Straight-line walker
#[derive(Debug, Clone)]
pub struct StraightLineMovement {
    position: Vec2,
    destination: Option<Vec2>,
    speed: f32,
    arrival_radius: f32,
    blocked: Rc<[BlockedZone]>,
    route_lost: bool,
}

impl StraightLineMovement {
    pub fn new(position: Vec2, speed: f32, arrival_radius: f32) -> Self {
        Self {
            position,
            destination: None,
            speed,
            arrival_radius,
            blocked: Rc::from(Vec::new()),
            route_lost: false,
        }
    }

    pub fn with_blocked(mut self, blocked: Rc<[BlockedZone]>) -> Self {
        self.blocked = blocked;
        self
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.destination
    }

    /// Mark the current route as lost (e.g. a bridge collapsed mid-walk)
    pub fn lose_route(&mut self) {
        self.route_lost = true;
    }

    fn is_blocked(&self, pos: Vec2) -> bool {
        self.blocked.iter().any(|zone| zone.contains(pos))
    }
}

impl Movement for StraightLineMovement {
    fn set_destination(&mut self, pos: Vec2) -> bool {
        if !self.can_reach(pos) {
            return false;
        }
        self.destination = Some(pos);
        self.route_lost = false;
        true
    }

    fn can_reach(&self, pos: Vec2) -> bool {
        !self.is_blocked(pos)
    }

    fn has_arrived(&self) -> Arrival {
        match self.destination {
            Some(dest) => Arrival {
                arrived: !self.route_lost && self.position.distance(&dest) <= self.arrival_radius,
                reachable: !self.route_lost,
            },
            None => Arrival {
                arrived: true,
                reachable: true,
            },
        }
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn advance(&mut self, dt: f32) {
        if self.route_lost {
            return;
        }
        let Some(dest) = self.destination else {
            return;
        };

        let to_dest = dest - self.position;
        let remaining = to_dest.length();
        let step = self.speed * dt;
        if remaining <= step {
            self.position = dest;
        } else {
            self.position = self.position + to_dest.normalize() * step;
        }
    }

    fn stop(&mut self) {
        self.destination = None;
        self.route_lost = false;
    }
}
