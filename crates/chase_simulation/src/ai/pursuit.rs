//! Pursuit agent: straight-line преследование цели
//!
//! idle (tracking выключен) ⇄ pursuing.
//! Target position копируется с цели не чаще refresh_period; между обновлениями
//! агент идёт к последней известной позиции. Obstacle avoidance нет, только
//! коррекция controller'а.

use bevy::prelude::*;

use crate::character::{
    spawn_character, tick_character, BodyPosition, Character, Facing, HorizontalIntent, SpawnError,
};
use crate::config::{CharacterConfig, PursuitConfig, SimulationConfig};
use crate::movement::{MovementInput, MovementState};
use crate::physics::{CollisionWorld, ControllerHandle, KinematicHandle};

/// Состояние агента (производное от tracking flag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum PursuitState {
    Idle,
    Pursuing,
}

/// Pursuit agent component
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct PursuitAgent {
    /// Кого преследуем (read-only BodyPosition)
    pub target: Entity,
    /// Последняя скопированная позиция цели
    pub target_position: Option<Vec3>,
    pub tracking: bool,
    pub follow_distance: f32,
    pub move_speed: f32,
    /// Текущий период обновления target (адаптируется по FPS)
    pub refresh_period: f32,
    /// Время с последнего обновления target
    pub since_refresh: f32,
}

impl PursuitAgent {
    pub fn new(target: Entity, pursuit: &PursuitConfig, move_speed: f32) -> Self {
        Self {
            target,
            target_position: None,
            tracking: pursuit.tracking_on_spawn,
            follow_distance: pursuit.follow_distance,
            move_speed,
            refresh_period: pursuit.base_refresh_period,
            since_refresh: 0.0,
        }
    }

    pub fn state(&self) -> PursuitState {
        if self.tracking {
            PursuitState::Pursuing
        } else {
            PursuitState::Idle
        }
    }

    /// Нужно ли копировать позицию цели на этом tick'е (timer уже продвинут)
    pub fn refresh_due(&self) -> bool {
        self.target_position.is_none() || self.since_refresh >= self.refresh_period
    }

    /// Планарная скорость на этот tick
    pub fn desired_velocity(&self, position: Vec3) -> Vec3 {
        match (self.state(), self.target_position) {
            (PursuitState::Pursuing, Some(target)) => {
                pursuit_velocity(position, target, self.follow_distance, self.move_speed)
            }
            _ => Vec3::ZERO,
        }
    }
}

/// Планарная скорость к цели: normalize × speed, либо 0 внутри follow distance
pub fn pursuit_velocity(position: Vec3, target: Vec3, follow_distance: f32, move_speed: f32) -> Vec3 {
    let to_target = Vec3::new(target.x - position.x, 0.0, target.z - position.z);
    if !to_target.is_finite() || to_target.length() <= follow_distance {
        return Vec3::ZERO;
    }
    to_target.normalize_or_zero() * move_speed
}

/// Spawn агента, преследующего target
pub fn spawn_pursuit_agent(
    world: &mut World,
    position: Vec3,
    target: Entity,
) -> Result<Entity, SpawnError> {
    let (character, pursuit) = world
        .get_resource::<SimulationConfig>()
        .map(|c| (c.agent, c.pursuit))
        .unwrap_or_else(|| (CharacterConfig::agent(), PursuitConfig::default()));

    let entity = spawn_character(world, character, ControllerHandle::Agent, position)?;
    world
        .entity_mut(entity)
        .insert(PursuitAgent::new(target, &pursuit, character.move_speed));
    Ok(entity)
}

/// Система: toggle_tracking переключает всех агентов
pub fn toggle_tracking(input: Res<MovementInput>, mut agents: Query<(Entity, &mut PursuitAgent)>) {
    if !input.toggle_tracking {
        return;
    }

    for (entity, mut agent) in agents.iter_mut() {
        agent.tracking = !agent.tracking;
        crate::log_info(&format!(
            "Pursuit agent {:?}: {:?}",
            entity,
            agent.state()
        ));
    }
}

/// Система: rate-limited копирование позиции цели
///
/// Idle агент заморожен: timer и target не меняются.
pub fn refresh_pursuit_targets(
    time: Res<Time<Fixed>>,
    mut agents: Query<(Entity, &mut PursuitAgent)>,
    targets: Query<&BodyPosition>,
) {
    let dt = time.delta_secs();

    for (entity, mut agent) in agents.iter_mut() {
        if agent.state() == PursuitState::Idle {
            continue;
        }

        agent.since_refresh += dt;
        if !agent.refresh_due() {
            continue;
        }

        match targets.get(agent.target) {
            Ok(target) => {
                agent.target_position = Some(target.0);
                agent.since_refresh = 0.0;
            }
            Err(_) => {
                // Цель пропала: идём к последней известной позиции
                if agent.target_position.is_none() {
                    crate::log_warning(&format!(
                        "Pursuit agent {:?}: target {:?} has no position",
                        entity, agent.target
                    ));
                }
                agent.since_refresh = 0.0;
            }
        }
    }
}

/// Система: движение агентов через общий character tick
pub fn move_pursuit_agents(
    mut world: ResMut<CollisionWorld>,
    time: Res<Time<Fixed>>,
    mut agents: Query<(
        &PursuitAgent,
        &Character,
        &BodyPosition,
        &mut MovementState,
        &mut Facing,
        Option<&KinematicHandle>,
        Option<&ControllerHandle>,
    )>,
) {
    let dt = time.delta_secs();

    for (agent, character, position, mut state, mut facing, handle, controller) in agents.iter_mut() {
        let velocity = agent.desired_velocity(position.0);
        let outcome = tick_character(
            &mut world,
            handle,
            controller.copied(),
            &character.config,
            &mut state,
            HorizontalIntent::Velocity(velocity),
            false,
            dt,
        );
        if outcome.is_committed() {
            facing.update_from_velocity(velocity);
        }
    }
}
