//! Chase integration test
//!
//! Headless app + SimulationPlugin, ручное время (один update = один fixed tick).
//!
//! Проверяем:
//! - Агент догоняет цель и останавливается на follow distance
//! - Idle агент стоит, но падает и приземляется
//! - Стена и потолок не пропускают игрока (non-penetration)
//! - Битый submesh → AABB fallback, количество коллайдеров не меняется
//! - Сломанная entity (без body) не роняет tick

use bevy::prelude::*;
use chase_simulation::demo::{box_submesh, demo_level};
use chase_simulation::physics::ModelGeometry;
use chase_simulation::*;

/// Helper: app с полом и заданной моделью уровня
fn create_chase_app(config: SimulationConfig, models: Vec<ModelGeometry>) -> App {
    let mut app = try_create_simulation_app(42, config).expect("valid config");
    app.insert_resource(LevelGeometry {
        ground_half_size: 50.0,
        models,
    });
    app
}

/// Прогнать ровно `ticks` fixed tick'ов (первый update может быть без tick'а)
fn run_ticks(app: &mut App, ticks: u64) {
    let target = app.world().resource::<CollisionWorld>().tick() + ticks;
    let mut updates = 0;
    while app.world().resource::<CollisionWorld>().tick() < target {
        app.update();
        updates += 1;
        assert!(updates <= ticks + 5, "fixed tick не идёт");
    }
}

fn position(app: &App, entity: Entity) -> Vec3 {
    app.world()
        .get::<BodyPosition>(entity)
        .expect("entity has BodyPosition")
        .0
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

#[test]
fn test_agent_reaches_follow_distance_and_stops() {
    let mut app = create_chase_app(SimulationConfig::default(), Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");
    let agent = spawn_pursuit_agent(app.world_mut(), Vec3::new(6.0, 1.0, 0.0), player).expect("agent");

    run_ticks(&mut app, 300);

    let distance = planar_distance(position(&app, agent), position(&app, player));
    // Останавливаемся внутри follow distance (1.5), перелёт не больше одного шага
    assert!(distance <= 1.5 && distance > 1.4, "distance = {}", distance);

    let before = position(&app, agent);
    run_ticks(&mut app, 60);
    let after = position(&app, agent);
    assert!(planar_distance(before, after) < 1e-4, "агент должен стоять");

    // Агент смотрит на игрока (-X): yaw = atan2(-1, 0)
    let facing = app.world().get::<Facing>(agent).expect("facing");
    assert!((facing.yaw + std::f32::consts::FRAC_PI_2).abs() < 1e-3, "yaw = {}", facing.yaw);
}

#[test]
fn test_agent_follows_moving_player() {
    let mut app = create_chase_app(SimulationConfig::default(), Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");
    let agent = spawn_pursuit_agent(app.world_mut(), Vec3::new(0.0, 1.0, 3.0), player).expect("agent");

    // Игрок уходит вперёд (-Z), агент идёт следом
    app.insert_resource(MovementInput {
        forward: true,
        ..default()
    });
    run_ticks(&mut app, 120);

    let player_pos = position(&app, player);
    let agent_pos = position(&app, agent);
    assert!(player_pos.z < -5.0, "player z = {}", player_pos.z);
    assert!(agent_pos.z < 0.0, "agent z = {}", agent_pos.z);
    // Агент медленнее (2.5 vs 5.0 m/s), но идёт в ту же сторону
    assert!(agent_pos.z > player_pos.z);
}

#[test]
fn test_idle_agent_holds_position_but_falls() {
    let config = SimulationConfig {
        pursuit: PursuitConfig {
            tracking_on_spawn: false,
            ..PursuitConfig::default()
        },
        ..SimulationConfig::default()
    };
    let mut app = create_chase_app(config, Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");
    let agent = spawn_pursuit_agent(app.world_mut(), Vec3::new(6.0, 3.0, 0.0), player).expect("agent");

    run_ticks(&mut app, 120);

    let agent_pos = position(&app, agent);
    assert!((agent_pos.x - 6.0).abs() < 1e-3);
    assert!(agent_pos.z.abs() < 1e-3);
    // Капсула агента 1.6 м: центр на ~0.8 над полом
    assert!(agent_pos.y > 0.75 && agent_pos.y < 0.9, "y = {}", agent_pos.y);

    let state = app.world().get::<MovementState>(agent).expect("state");
    assert!(state.grounded);
    assert_eq!(state.velocity.y, 0.0);

    let pursuit = app.world().get::<PursuitAgent>(agent).expect("pursuit");
    assert_eq!(pursuit.state(), PursuitState::Idle);
    assert_eq!(pursuit.target_position, None);
}

#[test]
fn test_toggle_tracking_freezes_agent() {
    let mut app = create_chase_app(SimulationConfig::default(), Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");
    let agent = spawn_pursuit_agent(app.world_mut(), Vec3::new(8.0, 1.0, 0.0), player).expect("agent");

    run_ticks(&mut app, 30);
    assert_eq!(
        app.world().get::<PursuitAgent>(agent).map(|a| a.state()),
        Some(PursuitState::Pursuing)
    );

    app.insert_resource(MovementInput {
        toggle_tracking: true,
        ..default()
    });
    run_ticks(&mut app, 1);

    // Single-shot событие погашено после tick'а
    assert!(!app.world().resource::<MovementInput>().toggle_tracking);
    assert_eq!(
        app.world().get::<PursuitAgent>(agent).map(|a| a.state()),
        Some(PursuitState::Idle)
    );

    let frozen = position(&app, agent);
    run_ticks(&mut app, 60);
    assert!(planar_distance(frozen, position(&app, agent)) < 1e-4);
}

#[test]
fn test_player_jump_and_land() {
    let mut app = create_chase_app(SimulationConfig::default(), Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");

    run_ticks(&mut app, 60);
    let standing = position(&app, player);

    app.insert_resource(MovementInput {
        jump: true,
        ..default()
    });
    let mut apex = standing.y;
    for _ in 0..120 {
        run_ticks(&mut app, 1);
        apex = apex.max(position(&app, player).y);
    }

    // v² / 2g ≈ 1.03 м
    assert!(apex - standing.y > 0.8, "apex = {}, standing = {}", apex, standing.y);
    let landed = position(&app, player);
    assert!((landed.y - standing.y).abs() < 0.05, "landed y = {}", landed.y);
}

#[test]
fn test_straight_jump_does_not_pass_ceiling() {
    // Плита 0.4 м, нижняя грань на y = 2.2
    let ceiling = ModelGeometry {
        name: "ceiling".to_string(),
        submeshes: vec![box_submesh(
            "slab",
            Vec3::new(-3.0, 2.2, -3.0),
            Vec3::new(3.0, 2.6, 3.0),
        )],
    };
    let mut app = create_chase_app(SimulationConfig::default(), vec![ceiling]);
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");

    run_ticks(&mut app, 60);

    app.insert_resource(MovementInput {
        jump: true,
        ..default()
    });
    // Половина высоты капсулы игрока 0.9
    let mut highest_top = f32::MIN;
    for _ in 0..60 {
        run_ticks(&mut app, 1);
        let top = position(&app, player).y + 0.9;
        assert!(top <= 2.2 + 1e-3, "capsule top = {}", top);
        highest_top = highest_top.max(top);
    }

    // Прыжок был и упёрся в потолок
    assert!(highest_top > 2.1, "highest top = {}", highest_top);
}

#[test]
fn test_wall_blocks_player() {
    let wall = ModelGeometry {
        name: "wall".to_string(),
        submeshes: vec![box_submesh(
            "wall_body",
            Vec3::new(3.0, 0.0, -4.0),
            Vec3::new(3.5, 2.5, 4.0),
        )],
    };
    let mut app = create_chase_app(SimulationConfig::default(), vec![wall]);
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");

    app.insert_resource(MovementInput {
        right: true,
        ..default()
    });
    run_ticks(&mut app, 180);

    let player_pos = position(&app, player);
    // Радиус капсулы 0.4, грань стены x = 3.0
    assert!(player_pos.x <= 2.6 + 0.02, "x = {}", player_pos.x);
    assert!(player_pos.x > 2.0, "игрок должен дойти до стены, x = {}", player_pos.x);
    assert!(player_pos.is_finite());
}

#[test]
fn test_degenerate_submesh_gets_box_fallback() {
    let level = demo_level();
    let submeshes: usize = level.models.iter().map(|m| m.submeshes.len()).sum();

    let mut app = try_create_simulation_app(42, SimulationConfig::default()).expect("valid config");
    app.insert_resource(level);
    run_ticks(&mut app, 1);

    let report = app.world().resource::<ProvisionReport>();
    assert!(report.ground.is_some());
    // Каждый submesh дал ровно один коллайдер
    assert_eq!(report.total_colliders(), submeshes + 1);

    let crate_model = &report.models[1];
    assert_eq!(crate_model.trimesh_count, 1);
    assert_eq!(crate_model.submesh_box_count, 1);
    assert!(!crate_model.whole_model_fallback);
}

#[test]
fn test_entity_without_body_does_not_stop_simulation() {
    let mut app = create_chase_app(SimulationConfig::default(), Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");
    let agent = spawn_pursuit_agent(app.world_mut(), Vec3::new(6.0, 1.0, 0.0), player).expect("agent");

    // Агент без KinematicHandle: движение пропускается с warning
    let broken = app
        .world_mut()
        .spawn((
            Character {
                config: CharacterConfig::agent(),
            },
            ControllerHandle::Agent,
            PursuitAgent::new(player, &PursuitConfig::default(), 2.5),
        ))
        .id();

    run_ticks(&mut app, 60);

    assert!(position(&app, agent).x < 6.0);
    assert_eq!(position(&app, broken), Vec3::ZERO);
}

#[test]
fn test_despawn_removes_body() {
    let mut app = create_chase_app(SimulationConfig::default(), Vec::new());
    let player = spawn_player(app.world_mut(), Vec3::new(0.0, 1.0, 0.0)).expect("player");
    let before = app.world().resource::<CollisionWorld>().collider_count();

    assert!(despawn_character(app.world_mut(), player));
    assert_eq!(
        app.world().resource::<CollisionWorld>().collider_count(),
        before - 1
    );
    run_ticks(&mut app, 10);
}

#[test]
fn test_invalid_config_is_fatal() {
    let config = SimulationConfig {
        physics: PhysicsConfig {
            gravity: f32::INFINITY,
            ..PhysicsConfig::default()
        },
        ..SimulationConfig::default()
    };
    assert!(matches!(
        try_create_simulation_app(1, config),
        Err(WorldInitError::NonFiniteGravity(_))
    ));
}

#[test]
#[should_panic(expected = "collision world init failed")]
fn test_plugin_panics_on_invalid_world() {
    let config = SimulationConfig {
        physics: PhysicsConfig {
            tick_hz: -1.0,
            ..PhysicsConfig::default()
        },
        ..SimulationConfig::default()
    };
    let mut app = create_headless_app(1);
    app.add_plugins(SimulationPlugin::with_config(config));
}
