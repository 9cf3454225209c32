//! Scheduler integration tests: orders, auto-assignment and labor together

use homestead::city::building::BuildingKind;
use homestead::command::order::OrderStatus;
use homestead::core::config::SchedulerConfig;
use homestead::core::types::Vec2;
use homestead::entity::tasks::{Delivery, TaskKind};
use homestead::simulation::events::GameEvent;
use homestead::simulation::tick::Simulation;
use homestead::world::reservation::Reservable;
use homestead::world::resources::ResourceKind;

fn sim() -> Simulation {
    Simulation::new(SchedulerConfig::default()).unwrap()
}

fn run(sim: &mut Simulation, seconds: f32) -> Vec<GameEvent> {
    let steps = (seconds / 0.1).round() as usize;
    let mut events = Vec::new();
    for _ in 0..steps {
        events.extend(sim.step(0.1));
    }
    events
}

#[test]
fn test_next_free_assigns_exactly_one_settler() {
    let mut sim = sim();
    let a = sim.world.spawn_settler("Ada", Vec2::new(0.0, 0.0));
    let b = sim.world.spawn_settler("Bo", Vec2::new(0.0, 0.5));
    let flint = sim.world.spawn_node(ResourceKind::Flint, Vec2::new(3.0, 0.0), 10);

    let id = sim.issue("next gather flint").unwrap();
    sim.orders.assign_pass(&mut sim.world);

    assert_eq!(sim.orders.order(id).unwrap().status, OrderStatus::Complete);
    assert!(flint.is_reserved());
    let served: Vec<_> = [a, b]
        .into_iter()
        .filter(|agent| sim.world.settler(*agent).unwrap().current_order() == Some(id))
        .collect();
    assert_eq!(served.len(), 1);
    let other = if served[0] == a { b } else { a };
    assert!(sim.world.settler(other).unwrap().is_idle());
}

#[test]
fn test_all_order_serves_every_idle_settler() {
    let mut sim = sim();
    for name in ["Ada", "Bo", "Cy"] {
        sim.world.spawn_settler(name, Vec2::default());
    }
    for x in [2.0, 3.0, 4.0] {
        sim.world.spawn_node(ResourceKind::Wood, Vec2::new(x, 0.0), 20);
    }
    let id = sim.issue("all gather wood").unwrap();

    run(&mut sim, 3.0);

    let order = sim.orders.order(id).unwrap();
    assert_eq!(order.status, OrderStatus::Active);
    assert_eq!(order.assigned_agents.len(), 3);
    assert!(sim
        .world
        .settlers()
        .iter()
        .all(|s| s.current_order() == Some(id)));
}

#[test]
fn test_named_preemption_frees_previous_node() {
    let mut sim = sim();
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    let wood = sim.world.spawn_node(ResourceKind::Wood, Vec2::new(2.0, 0.0), 20);

    // Auto-assignment puts Ada on the wood
    run(&mut sim, 1.5);
    assert!(wood.is_reserved());
    let before = sim.world.settler(agent).unwrap().current_task().map(|t| t.kind);
    assert_eq!(before, Some(TaskKind::GatherWood));

    let stone = sim.world.spawn_node(ResourceKind::Stone, Vec2::new(-2.0, 0.0), 20);
    let id = sim.issue("Ada gather stone").unwrap();
    let events = run(&mut sim, 0.6);

    assert!(!wood.is_reserved(), "previous claim released");
    assert!(stone.is_reserved());
    assert_eq!(sim.world.settler(agent).unwrap().current_order(), Some(id));

    let preempted = events
        .iter()
        .position(|e| matches!(e, GameEvent::TaskPreempted { .. }))
        .unwrap();
    let assigned = events
        .iter()
        .position(|e| matches!(e, GameEvent::TaskAssigned { order: Some(o), .. } if *o == id))
        .unwrap();
    assert!(preempted < assigned);
}

#[test]
fn test_negated_hunt_blocks_auto_hunting() {
    let mut sim = sim();
    for name in ["Ada", "Bo", "Cy", "Dee"] {
        sim.world.spawn_settler(name, Vec2::default());
    }
    for i in 0..6 {
        sim.world.spawn_node(ResourceKind::Game, Vec2::new(2.0 + i as f32, 2.0), 50);
    }
    sim.issue("All do NOT Hunt").unwrap();

    let events = run(&mut sim, 20.0);

    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TaskAssigned { kind: TaskKind::Hunt, .. })));
    assert!(sim.world.nodes.iter().all(|n| n.is_available()));
}

#[test]
fn test_cancel_releases_every_serving_settler() {
    let mut sim = sim();
    sim.world.spawn_settler("Ada", Vec2::default());
    sim.world.spawn_settler("Bo", Vec2::default());
    let a = sim.world.spawn_node(ResourceKind::Stone, Vec2::new(2.0, 0.0), 20);
    let b = sim.world.spawn_node(ResourceKind::Stone, Vec2::new(3.0, 0.0), 20);
    let id = sim.issue("all gather stone at 2,0").unwrap();
    sim.orders.assign_pass(&mut sim.world);
    assert!(a.is_reserved() && b.is_reserved());

    sim.cancel_order(id).unwrap();

    assert!(a.is_available() && b.is_available());
    assert!(sim.world.settlers().iter().all(|s| s.current_order().is_none()));
    assert_eq!(sim.orders.markers().count(), 0);
}

#[test]
fn test_settler_death_releases_claim() {
    let mut sim = sim();
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    let node = sim.world.spawn_node(ResourceKind::Wood, Vec2::new(2.0, 0.0), 20);
    run(&mut sim, 1.5);
    assert!(node.is_reserved());

    sim.world.settler_mut(agent).unwrap().hunger_mut().satiety = 0.0;
    let grace = sim.world.config.starvation_grace;
    let events = sim.step(grace + 0.1);

    assert!(sim.world.settler(agent).is_none());
    assert!(node.is_available());
    assert!(events.contains(&GameEvent::PopulationChanged { population: 0 }));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::SettlerDied { name, .. } if name == "Ada")));
}

#[test]
fn test_construction_then_specialized_labor() {
    let mut sim = sim();
    let builder = sim.world.spawn_settler("Ada", Vec2::default());
    let (building, site) = sim.world.spawn_building(BuildingKind::WoodcutterHut, Vec2::new(4.0, 0.0));
    sim.world.spawn_node(ResourceKind::Wood, Vec2::new(8.0, 0.0), 50);

    let events = run(&mut sim, 40.0);

    assert!(site.is_complete());
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::BuildingCompleted { building: Some(b), .. } if *b == building)));

    let task = sim
        .world
        .settler(builder)
        .unwrap()
        .work_task()
        .map(|t| (t.kind, t.delivery));
    assert_eq!(task, Some((TaskKind::GatherWood, Delivery::Building(building))));
    assert!(sim.world.buildings.has_worker[0]);
}

#[test]
fn test_paused_order_does_not_block_auto_assignment() {
    let mut sim = sim();
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    sim.world.spawn_node(ResourceKind::Berries, Vec2::new(2.0, 0.0), 20);
    let id = sim.issue("Ada gather flint").unwrap();
    sim.orders.toggle_pause(id, &mut sim.world).unwrap();

    run(&mut sim, 1.5);

    let task = sim.world.settler(agent).unwrap().current_task().unwrap();
    assert_eq!(task.kind, TaskKind::GatherBerries);
    assert!(task.order_id.is_none());
}

#[test]
fn test_named_prohibition_leaves_group_order_to_others() {
    let mut sim = sim();
    let ada = sim.world.spawn_settler("Ada", Vec2::default());
    let bo = sim.world.spawn_settler("Bo", Vec2::new(0.0, 0.5));
    sim.world.spawn_node(ResourceKind::Game, Vec2::new(4.0, 0.0), 20);
    sim.world.spawn_node(ResourceKind::Game, Vec2::new(5.0, 0.0), 20);
    sim.issue("Ada do not hunt").unwrap();
    let id = sim.issue("all hunt").unwrap();

    let events = run(&mut sim, 2.0);

    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TaskAssigned { agent, kind: TaskKind::Hunt, .. } if *agent == ada)));
    let bo = sim.world.settler(bo).unwrap();
    assert_eq!(bo.current_order(), Some(id));
    assert_eq!(bo.current_task().map(|t| t.kind), Some(TaskKind::Hunt));
}

#[test]
fn test_unservable_named_order_does_not_churn_group_work() {
    let mut sim = sim();
    let agent = sim.world.spawn_settler("Ada", Vec2::default());
    let wood = sim.world.spawn_node(ResourceKind::Wood, Vec2::new(10.0, 0.0), 20);
    sim.issue("all gather wood").unwrap();
    sim.issue("Ada gather flint").unwrap();

    let events = run(&mut sim, 30.0);

    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TaskPreempted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::ResourceDelivered { .. })));
    assert!(wood.is_reserved());
    assert!(!sim.world.settler(agent).unwrap().is_idle());
}
