//! Chase Simulation Core
//!
//! Kinematic character movement поверх rapier + pursuit agent, на Bevy 0.16 ECS.
//!
//! Порядок за fixed tick (SimulationSet, строго последовательно):
//! 1. Physics: один step Collision World
//! 2. Player: input → velocity → integrator
//! 3. Agents: target refresh → pursuit velocity → integrator
//! 4. ReadBack: позиции body → BodyPosition/Transform, гасим single-shot input

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod character;
pub mod config;
pub mod demo;
pub mod logger;
pub mod movement;
pub mod physics;

// Re-export базовых типов для удобства
pub use ai::{spawn_pursuit_agent, PerformanceSignal, PursuitAgent, PursuitPlugin, PursuitState};
pub use character::{
    despawn_character, spawn_character, spawn_player, tick_character, BodyPosition, Character,
    Facing, HorizontalIntent, Player, SpawnError,
};
pub use config::{
    CharacterConfig, ControllerTuning, PerformanceConfig, PhysicsConfig, PursuitConfig,
    SimulationConfig,
};
pub use logger::*;
pub use movement::{MovementInput, MovementState};
pub use physics::{
    CollisionWorld, ControllerHandle, KinematicHandle, LevelGeometry, MoveError, MovementOutcome,
    ProvisionReport, WorldInitError,
};

/// Фазы fixed tick
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Physics,
    Player,
    Agents,
    ReadBack,
}

/// Главный plugin симуляции (объединяет все подсистемы)
#[derive(Default)]
pub struct SimulationPlugin {
    pub config: SimulationConfig,
}

impl SimulationPlugin {
    pub fn with_config(config: SimulationConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Мир мог быть создан заранее (try_create_simulation_app)
        if !app.world().contains_resource::<CollisionWorld>() {
            match CollisionWorld::new(&self.config) {
                Ok(world) => {
                    app.insert_resource(world);
                }
                Err(err) => {
                    // Degraded physics mode нет: без мира симуляция не стартует
                    log_error(&format!("Collision world init failed: {}", err));
                    panic!("collision world init failed: {err}");
                }
            }
        }

        app
            // Fixed timestep совпадает с шагом Collision World
            .insert_resource(Time::<Fixed>::from_hz(self.config.physics.tick_hz))
            .insert_resource(self.config.clone())
            .init_resource::<MovementInput>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Physics,
                    SimulationSet::Player,
                    SimulationSet::Agents,
                    SimulationSet::ReadBack,
                )
                    .chain(),
            )
            .add_systems(Startup, physics::provision_level_system)
            .add_systems(
                FixedUpdate,
                (
                    physics::step_collision_world.in_set(SimulationSet::Physics),
                    character::move_player.in_set(SimulationSet::Player),
                    (
                        character::sync_body_positions,
                        movement::consume_single_shot_input,
                    )
                        .chain()
                        .in_set(SimulationSet::ReadBack),
                ),
            )
            .add_plugins(PursuitPlugin);

        log_info(&format!(
            "Simulation plugin ready: {} Hz, gravity {}",
            self.config.physics.tick_hz, self.config.physics.gravity
        ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время ручное: каждый update() = ровно один fixed tick на 60 Hz.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)) // 60Hz FixedUpdate
        .insert_resource(manual_tick_strategy(60.0));

    app
}

/// Headless app + SimulationPlugin; ошибка инициализации мира возвращается, а не паникует
pub fn try_create_simulation_app(seed: u64, config: SimulationConfig) -> Result<App, WorldInitError> {
    let world = CollisionWorld::new(&config)?;

    let mut app = create_headless_app(seed);
    app.insert_resource(manual_tick_strategy(config.physics.tick_hz))
        .insert_resource(world)
        .add_plugins(SimulationPlugin::with_config(config));

    Ok(app)
}

fn manual_tick_strategy(tick_hz: f64) -> TimeUpdateStrategy {
    TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / tick_hz))
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    // Собираем все компоненты в детерминированный формат
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
