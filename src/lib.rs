//! Homestead - settler task and order scheduling for a settlement simulation

pub mod city;
pub mod command;
pub mod core;
pub mod ecs;
pub mod entity;
pub mod simulation;
pub mod world;
