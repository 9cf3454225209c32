//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifier of a settler (agent)
///
/// Allocated monotonically by the world registry, never reused.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "settler#{}", _0)]
pub struct AgentId(pub u32);

/// Identifier of a player order (monotonic)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "order#{}", _0)]
pub struct OrderId(pub u64);

/// Identifier of a reservable world entity (resource node or construction site)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "reservable#{}", _0)]
pub struct ReservableId(pub u32);

/// Identifier of a production building
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display(fmt = "building#{}", _0)]
pub struct BuildingId(pub u32);

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// 2D position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(AgentId(3).to_string(), "settler#3");
        assert_eq!(OrderId(12).to_string(), "order#12");
        assert_eq!(ReservableId(7).to_string(), "reservable#7");
        assert_eq!(BuildingId(1).to_string(), "building#1");
    }

    #[test]
    fn test_order_id_ordering() {
        // Monotonic ids compare by allocation order
        assert!(OrderId(1) < OrderId(2));
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 0.0001);
    }

    #[test]
    fn test_vec2_normalize_zero() {
        let zero = Vec2::default().normalize();
        assert_eq!(zero, Vec2::default());

        let unit = Vec2::new(10.0, 0.0).normalize();
        assert!((unit.x - 1.0).abs() < 0.0001);
    }
}
