//! Character: один тип для игрока и агентов
//!
//! Разница только в CharacterConfig и ControllerHandle. Общий tick:
//! sanitize → grounded query → горизонталь → вертикаль → integrator.

use bevy::prelude::*;
use thiserror::Error;

use crate::config::{CharacterConfig, SimulationConfig};
use crate::movement::{
    update_horizontal_velocity, update_vertical_velocity, MovementInput, MovementState, VerticalStep,
};
use crate::physics::integrator::resolve_handles;
use crate::physics::{
    move_character, ColliderBuildError, ColliderShape, CollisionWorld, ControllerHandle,
    KinematicHandle, MovementOutcome,
};

/// Ниже этой горизонтальной скорости facing не меняется (m/s)
pub const FACING_EPSILON: f32 = 0.01;

/// Персонаж с kinematic капсулой
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
#[require(MovementState, BodyPosition, Facing, Transform)]
pub struct Character {
    pub config: CharacterConfig,
}

/// Маркер: персонаж управляется MovementInput
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Последняя закоммиченная позиция body (read-back для визуала)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct BodyPosition(pub Vec3);

/// Yaw вокруг Y (радианы), 0 = смотрим в +Z
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Facing {
    pub yaw: f32,
}

impl Facing {
    /// Мгновенный поворот по горизонтальной скорости
    pub fn update_from_velocity(&mut self, velocity: Vec3) {
        if let Some(yaw) = facing_yaw(velocity) {
            self.yaw = yaw;
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }
}

/// atan2 горизонтальных компонент; None если стоим
pub fn facing_yaw(velocity: Vec3) -> Option<f32> {
    let planar = Vec2::new(velocity.x, velocity.z);
    (planar.length() > FACING_EPSILON).then(|| velocity.x.atan2(velocity.z))
}

/// Откуда берётся горизонтальная скорость на этот tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizontalIntent {
    /// Направление input: ускорение/трение по CharacterConfig
    Steer(Vec3),
    /// Готовая планарная скорость (pursuit)
    Velocity(Vec3),
}

/// Один tick движения персонажа
#[allow(clippy::too_many_arguments)]
pub fn tick_character(
    world: &mut CollisionWorld,
    handle: Option<&KinematicHandle>,
    controller: Option<ControllerHandle>,
    config: &CharacterConfig,
    state: &mut MovementState,
    intent: HorizontalIntent,
    jump: bool,
    dt: f32,
) -> MovementOutcome {
    state.sanitize();

    let grounded = match resolve_handles(handle, controller)
        .and_then(|(handle, controller)| world.query_grounded(handle, controller))
    {
        Ok(grounded) => grounded,
        Err(err) => return MovementOutcome::skipped(err),
    };
    state.grounded = grounded;

    let planar = match intent {
        HorizontalIntent::Steer(direction) => {
            update_horizontal_velocity(state.velocity, direction, config, dt)
        }
        HorizontalIntent::Velocity(velocity) => Vec3::new(velocity.x, 0.0, velocity.z),
    };
    state.velocity.x = planar.x;
    state.velocity.z = planar.z;

    let step = VerticalStep {
        gravity: world.gravity_y(),
        dt,
        jump_speed: config.jump_speed,
        max_fall_speed: config.max_fall_speed,
    };
    state.velocity.y = update_vertical_velocity(state.velocity.y, grounded, jump, &step);
    state.sanitize();

    move_character(world, handle, controller, state.velocity * dt)
}

/// Ошибка spawn персонажа
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpawnError {
    #[error("collision world is not initialized")]
    MissingWorld,
    #[error("character collider rejected: {0}")]
    Collider(#[from] ColliderBuildError),
}

/// Создать body + entity персонажа
pub fn spawn_character(
    world: &mut World,
    config: CharacterConfig,
    controller: ControllerHandle,
    position: Vec3,
) -> Result<Entity, SpawnError> {
    let shape = ColliderShape::character_capsule(&config);
    let handle = {
        let mut collision_world = world
            .get_resource_mut::<CollisionWorld>()
            .ok_or(SpawnError::MissingWorld)?;
        collision_world.create_kinematic_body(&shape, position)?
    };

    let entity = world
        .spawn((
            Character { config },
            controller,
            handle,
            BodyPosition(position),
            Transform::from_translation(position + Vec3::Y * config.visual_offset),
        ))
        .id();

    crate::log(&format!(
        "Spawned {:?} character {:?} at {:?}",
        controller, entity, position
    ));
    Ok(entity)
}

/// Игрок с player preset из SimulationConfig
pub fn spawn_player(world: &mut World, position: Vec3) -> Result<Entity, SpawnError> {
    let config = world
        .get_resource::<SimulationConfig>()
        .map(|c| c.player)
        .unwrap_or_else(CharacterConfig::player);
    let entity = spawn_character(world, config, ControllerHandle::Player, position)?;
    world.entity_mut(entity).insert(Player);
    Ok(entity)
}

/// Удалить entity персонажа и его body
pub fn despawn_character(world: &mut World, entity: Entity) -> bool {
    let handle = world.get::<KinematicHandle>(entity).copied();
    if let (Some(handle), Some(mut collision_world)) =
        (handle, world.get_resource_mut::<CollisionWorld>())
    {
        collision_world.remove_kinematic_body(&handle);
    }
    world.despawn(entity)
}

/// Система: движение игрока по MovementInput
pub fn move_player(
    mut world: ResMut<CollisionWorld>,
    input: Res<MovementInput>,
    time: Res<Time<Fixed>>,
    mut players: Query<
        (
            &Character,
            &mut MovementState,
            &mut Facing,
            Option<&KinematicHandle>,
            Option<&ControllerHandle>,
        ),
        With<Player>,
    >,
) {
    let dt = time.delta_secs();
    let direction = input.direction();

    for (character, mut state, mut facing, handle, controller) in players.iter_mut() {
        let outcome = tick_character(
            &mut world,
            handle,
            controller.copied(),
            &character.config,
            &mut state,
            HorizontalIntent::Steer(direction),
            input.jump,
            dt,
        );
        if outcome.is_committed() {
            facing.update_from_velocity(state.velocity);
        }
    }
}

/// Система: read-back закоммиченных позиций в BodyPosition + Transform
pub fn sync_body_positions(
    world: Res<CollisionWorld>,
    mut characters: Query<(
        &KinematicHandle,
        &Character,
        &Facing,
        &mut BodyPosition,
        &mut Transform,
    )>,
) {
    for (handle, character, facing, mut body_position, mut transform) in characters.iter_mut() {
        let Some(position) = world.translation(handle.body) else {
            continue;
        };
        body_position.0 = position;
        transform.translation = position + Vec3::Y * character.config.visual_offset;
        transform.rotation = facing.rotation();
    }
}
