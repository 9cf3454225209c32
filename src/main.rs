//! Homestead - headless runner
//!
//! Builds a small demo settlement, issues a few orders, runs the scheduler
//! for a number of ticks and prints a summary.

use std::path::PathBuf;

use ahash::AHashMap;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use homestead::city::building::BuildingKind;
use homestead::command::order::OrderSummary;
use homestead::core::config::SchedulerConfig;
use homestead::core::error::Result;
use homestead::core::types::Vec2;
use homestead::simulation::tick::{run_simulation_tick, Simulation};
use homestead::world::resources::ResourceKind;

/// Headless settlement runner
#[derive(Parser, Debug)]
#[command(name = "homestead")]
#[command(about = "Run the settler scheduler headless and print a summary")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Number of settlers to spawn
    #[arg(long, default_value_t = 6)]
    settlers: usize,

    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

#[derive(Serialize)]
struct RunSummary {
    ticks: u64,
    elapsed: f32,
    population: usize,
    stockpile: Vec<(ResourceKind, u32)>,
    orders: Vec<OrderSummary>,
    events: Vec<(&'static str, usize)>,
}

const NAMES: [&str; 8] = ["Ada", "Bo", "Cy", "Dee", "Eli", "Fen", "Gus", "Hal"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("homestead=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SchedulerConfig::load(path)?,
        None => SchedulerConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut sim = Simulation::new(config)?;
    build_settlement(&mut sim, args.settlers);

    // Sample orders: a named gather, a prohibition and a single-shot build
    sim.issue("Ada gather flint")?;
    sim.issue("all do not hunt")?;
    sim.issue("next build")?;

    let mut event_counts: AHashMap<&'static str, usize> = AHashMap::new();
    for _ in 0..args.ticks {
        for event in run_simulation_tick(&mut sim, args.dt) {
            *event_counts.entry(event.label()).or_default() += 1;
        }
    }
    sim.orders.cleanup_finished(&mut sim.world);

    let mut events: Vec<_> = event_counts.into_iter().collect();
    events.sort();

    let summary = RunSummary {
        ticks: sim.world.current_tick,
        elapsed: sim.world.elapsed,
        population: sim.world.population(),
        stockpile: sim.world.stockpile.totals(),
        orders: sim.orders.summaries(),
        events,
    };

    if args.format == "text" {
        print_text(&summary);
    } else {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn build_settlement(sim: &mut Simulation, settlers: usize) {
    let world = &mut sim.world;
    world.storage_position = Vec2::new(0.0, 0.0);
    world.feeding_position = Vec2::new(-2.0, 0.0);
    world.stockpile.add(ResourceKind::Berries, 20);

    for i in 0..settlers {
        let name = match NAMES.get(i) {
            Some(name) => name.to_string(),
            None => format!("Settler{}", i + 1),
        };
        world.spawn_settler(name, Vec2::new(i as f32, 1.0));
    }

    let layout = [
        (ResourceKind::Wood, Vec2::new(8.0, 4.0)),
        (ResourceKind::Wood, Vec2::new(10.0, -3.0)),
        (ResourceKind::Stone, Vec2::new(-9.0, 6.0)),
        (ResourceKind::Flint, Vec2::new(-6.0, -8.0)),
        (ResourceKind::Berries, Vec2::new(4.0, 9.0)),
        (ResourceKind::Berries, Vec2::new(-3.0, 10.0)),
        (ResourceKind::Game, Vec2::new(18.0, 18.0)),
    ];
    for (kind, position) in layout {
        world.spawn_node(kind, position, 40);
    }

    world.spawn_building(BuildingKind::WoodcutterHut, Vec2::new(6.0, 0.0));
}

fn print_text(summary: &RunSummary) {
    println!("=== HOMESTEAD ===");
    println!("Ticks: {} ({:.1}s)", summary.ticks, summary.elapsed);
    println!("Population: {}", summary.population);
    println!();
    println!("Stockpile:");
    for (kind, amount) in &summary.stockpile {
        println!("  {:<8} {}", format!("{:?}", kind), amount);
    }
    println!();
    println!("Orders:");
    for order in &summary.orders {
        println!(
            "  {} {}{} {:?} {:?} [{:?}] serving={}",
            order.id,
            order.subject,
            if order.negated { " not" } else { "" },
            order.predicate,
            order.objects,
            order.status,
            order.assigned
        );
    }
    println!();
    println!("Events:");
    for (label, count) in &summary.events {
        println!("  {:<20} {}", label, count);
    }
}
