//! Hunger interrupt integration tests

use homestead::core::config::SchedulerConfig;
use homestead::core::types::Vec2;
use homestead::entity::settler::SettlerState;
use homestead::entity::tasks::TaskKind;
use homestead::simulation::events::GameEvent;
use homestead::simulation::tick::Simulation;
use homestead::world::reservation::Reservable;
use homestead::world::resources::ResourceKind;

fn sim() -> Simulation {
    let mut sim = Simulation::new(SchedulerConfig::default()).unwrap();
    sim.world.feeding_position = Vec2::new(-4.0, 0.0);
    sim
}

fn run(sim: &mut Simulation, seconds: f32) -> Vec<GameEvent> {
    let steps = (seconds / 0.1).round() as usize;
    (0..steps).flat_map(|_| sim.step(0.1)).collect()
}

#[test]
fn test_hungry_worker_eats_and_resumes_order() {
    let mut sim = sim();
    sim.world.stockpile.add(ResourceKind::Berries, 3);
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    let flint = sim.world.spawn_node(ResourceKind::Flint, Vec2::new(5.0, 0.0), 50);
    let id = sim.issue("Ada gather flint").unwrap();
    run(&mut sim, 1.0);
    assert_eq!(sim.world.settler(agent).unwrap().current_order(), Some(id));

    let threshold = sim.world.config.hunger_threshold;
    sim.world.settler_mut(agent).unwrap().hunger_mut().satiety = threshold - 1.0;
    sim.step(0.1);

    let settler = sim.world.settler(agent).unwrap();
    assert_eq!(settler.state(), SettlerState::WalkingToEat);
    assert!(!settler.is_interruptible());
    assert!(flint.is_reserved(), "parked task keeps its claim");
    // Still counted as serving, so the order manager leaves it alone
    assert_eq!(settler.current_order(), Some(id));

    // Walk back ~2-3s, eat 3s
    run(&mut sim, 8.0);

    let settler = sim.world.settler(agent).unwrap();
    assert!(settler.hunger().satiety > threshold);
    assert_eq!(sim.world.stockpile.get(ResourceKind::Berries), 2);
    assert_eq!(settler.current_task().map(|t| t.kind), Some(TaskKind::GatherFlint));
    assert_eq!(settler.current_order(), Some(id));
    assert!(flint.is_reserved());
}

#[test]
fn test_named_order_waits_while_settler_eats() {
    let mut sim = sim();
    sim.world.stockpile.add(ResourceKind::Berries, 3);
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    let stone = sim.world.spawn_node(ResourceKind::Stone, Vec2::new(3.0, 0.0), 50);

    sim.world.settler_mut(agent).unwrap().hunger_mut().satiety = 5.0;
    sim.step(0.1);
    assert_eq!(sim.world.settler(agent).unwrap().state(), SettlerState::WalkingToEat);

    sim.issue("Ada gather stone").unwrap();
    let events = run(&mut sim, 1.0);
    assert!(!events.iter().any(|e| matches!(e, GameEvent::TaskPreempted { .. })));
    assert!(stone.is_available());

    // After the meal the order picks the settler up
    run(&mut sim, 8.0);
    assert!(stone.is_reserved());
}

#[test]
fn test_no_food_defers_retry() {
    let mut sim = sim();
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    sim.world.settler_mut(agent).unwrap().hunger_mut().satiety = 20.0;

    run(&mut sim, 8.0);

    let settler = sim.world.settler(agent).unwrap();
    assert!(settler.hunger().retry_cooldown > 0.0);
    assert!(settler.state().is_idle());
}

#[test]
fn test_starvation_removes_settler() {
    let mut config = SchedulerConfig::default();
    config.starvation_grace = 2.0;
    let mut sim = Simulation::new(config).unwrap();
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    sim.world.settler_mut(agent).unwrap().hunger_mut().satiety = 0.5;

    let events = run(&mut sim, 5.0);

    assert_eq!(sim.world.population(), 0);
    assert!(events.iter().any(|e| matches!(e, GameEvent::SettlerDied { agent: a, .. } if *a == agent)));
}
