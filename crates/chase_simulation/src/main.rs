//! Headless chase симуляция
//!
//! Демо-уровень: игрок бежит по скриптованному input, агенты преследуют.

use bevy::prelude::*;
use chase_simulation::demo::{demo_level, spawn_demo_actors};
use chase_simulation::{
    log_error, try_create_simulation_app, BodyPosition, CollisionWorld, MovementInput,
    ProvisionReport, SimulationConfig,
};

const TICKS: u64 = 1200;
const AGENTS: usize = 3;

/// Скриптованный input: вперёд, потом вправо с прыжками, toggle на 600-м tick'е
fn scripted_input(tick: u64) -> MovementInput {
    MovementInput {
        forward: tick < 300,
        right: (300..900).contains(&tick),
        jump: tick % 120 == 0 && tick >= 300,
        toggle_tracking: tick == 600 || tick == 750,
        ..default()
    }
}

fn main() {
    let seed = 42;
    println!("Starting chase headless simulation (seed: {})", seed);

    let mut app = match try_create_simulation_app(seed, SimulationConfig::default()) {
        Ok(app) => app,
        Err(err) => {
            log_error(&format!("Simulation init failed: {}", err));
            std::process::exit(1);
        }
    };
    app.insert_resource(demo_level());

    let (player, agents) = match spawn_demo_actors(app.world_mut(), AGENTS) {
        Ok(actors) => actors,
        Err(err) => {
            log_error(&format!("Demo spawn failed: {}", err));
            std::process::exit(1);
        }
    };

    // Первый update: Startup (provisioning), время ещё не идёт
    app.update();
    if let Some(report) = app.world().get_resource::<ProvisionReport>() {
        println!("Level: {} static colliders", report.total_colliders());
    }

    let mut tick = 0;
    while tick < TICKS {
        app.insert_resource(scripted_input(tick));
        app.update();
        tick = app.world().resource::<CollisionWorld>().tick();

        if tick % 120 == 0 {
            let world = app.world();
            let position = |entity: Entity| world.get::<BodyPosition>(entity).map(|p| p.0);
            println!("Tick {}: player {:?}", tick, position(player));
            for agent in &agents {
                println!("    agent {:?}: {:?}", agent, position(*agent));
            }
        }
    }

    println!("Simulation complete!");
}
