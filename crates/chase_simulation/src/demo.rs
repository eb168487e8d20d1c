//! Демо-уровень для headless бинаря и интеграционных тестов
//!
//! Ground + стена (trimesh) + ящик с битым submesh (fallback на AABB),
//! игрок в центре, агенты разбросаны детерминированным RNG.

use bevy::prelude::*;
use rand::Rng;

use crate::ai::spawn_pursuit_agent;
use crate::character::{spawn_player, SpawnError};
use crate::physics::{LevelGeometry, ModelGeometry, SubmeshGeometry};
use crate::DeterministicRng;

/// Агенты появляются на кольце этого радиуса вокруг игрока (вне статики уровня)
pub const AGENT_SPAWN_RADIUS: f32 = 7.0;

/// Индексированный box submesh (12 треугольников)
pub fn box_submesh(name: &str, min: Vec3, max: Vec3) -> SubmeshGeometry {
    let vertices = vec![
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(max.x, max.y, max.z),
        Vec3::new(min.x, max.y, max.z),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 0, 3, 2, // -Z
        4, 5, 6, 4, 6, 7, // +Z
        0, 1, 5, 0, 5, 4, // -Y
        3, 7, 6, 3, 6, 2, // +Y
        0, 4, 7, 0, 7, 3, // -X
        1, 2, 6, 1, 6, 5, // +X
    ];
    SubmeshGeometry {
        name: name.to_string(),
        vertices,
        indices: Some(indices),
    }
}

/// Статика демо-уровня
pub fn demo_level() -> LevelGeometry {
    let wall = ModelGeometry {
        name: "wall".to_string(),
        submeshes: vec![box_submesh(
            "wall_body",
            Vec3::new(3.0, 0.0, -4.0),
            Vec3::new(3.5, 2.5, 4.0),
        )],
    };

    // Второй submesh ссылается на несуществующую вершину → AABB fallback
    let mut broken_lid = box_submesh("lid", Vec3::new(-5.0, 0.8, 2.0), Vec3::new(-4.0, 1.0, 3.0));
    if let Some(indices) = broken_lid.indices.as_mut() {
        indices[0] = 99;
    }
    let crate_model = ModelGeometry {
        name: "crate".to_string(),
        submeshes: vec![
            box_submesh("crate_body", Vec3::new(-5.0, 0.0, 2.0), Vec3::new(-4.0, 0.8, 3.0)),
            broken_lid,
        ],
    };

    LevelGeometry {
        ground_half_size: 50.0,
        models: vec![wall, crate_model],
    }
}

/// Игрок в начале координат + agent_count агентов вокруг
///
/// Возвращает (player, agents).
pub fn spawn_demo_actors(
    world: &mut World,
    agent_count: usize,
) -> Result<(Entity, Vec<Entity>), SpawnError> {
    let player = spawn_player(world, Vec3::new(0.0, 1.0, 0.0))?;

    let positions: Vec<Vec3> = {
        let Some(mut rng) = world.get_resource_mut::<DeterministicRng>() else {
            return Ok((player, Vec::new()));
        };
        (0..agent_count)
            .map(|_| {
                let angle = rng.rng.gen_range(0.0..std::f32::consts::TAU);
                Vec3::new(
                    angle.cos() * AGENT_SPAWN_RADIUS,
                    1.0,
                    angle.sin() * AGENT_SPAWN_RADIUS,
                )
            })
            .collect()
    };

    let agents = positions
        .into_iter()
        .map(|position| spawn_pursuit_agent(world, position, player))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((player, agents))
}
