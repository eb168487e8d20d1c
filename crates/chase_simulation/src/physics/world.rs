//! Collision World: единственный общий simulation clock и spatial index
//!
//! Архитектура:
//! - Rapier pipeline (через re-export bevy_rapier3d), шагаем сами: step() = один
//!   фиксированный инкремент, без внешнего delta time
//! - Typed handles наружу (RigidBodyHandle, ColliderHandle, ControllerHandle),
//!   остальная поверхность rapier не часть контракта
//! - Два character controller'а: player и agent
//!
//! Ошибка инициализации: fatal (degraded physics mode нет).

use bevy::prelude::*;
use bevy_rapier3d::rapier::na::{Quaternion, Translation3, UnitQuaternion};
use bevy_rapier3d::rapier::prelude as rapier;
use bevy_rapier3d::rapier::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, Isometry, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, QueryFilter, Real, RigidBodyBuilder, RigidBodySet, Vector,
};
use thiserror::Error;

use super::colliders::{ColliderBuildError, ColliderShape};
use super::controller::{CharacterController, ControllerHandle, MovementCorrection};
use crate::config::SimulationConfig;

/// Длина probe для grounded query (метры)
pub const GROUND_PROBE_DISTANCE: f32 = 1e-3;

/// Handle rigid body (владеет Collision World)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub(crate) rapier::RigidBodyHandle);

/// Handle коллайдера (static: без body)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub(crate) rapier::ColliderHandle);

/// Пара {body, collider} движимого персонажа
///
/// Entity ссылается на body, но не владеет им.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KinematicHandle {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// Fatal ошибка создания мира
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorldInitError {
    #[error("gravity must be finite, got {0}")]
    NonFiniteGravity(f32),
    #[error("tick rate must be positive and finite, got {0}")]
    InvalidTickRate(f64),
    #[error("{controller:?} controller tuning rejected: {reason}")]
    InvalidControllerTuning {
        controller: ControllerHandle,
        reason: &'static str,
    },
}

/// Handle не резолвится в мире (recoverable no-op)
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum MoveError {
    #[error("rigid body {0:?} not found")]
    MissingBody(RigidBodyHandle),
    #[error("collider {0:?} not found")]
    MissingCollider(ColliderHandle),
    #[error("entity has no kinematic body handle")]
    MissingHandle,
    #[error("entity has no character controller")]
    MissingController,
}

/// Collision World resource
#[derive(Resource)]
pub struct CollisionWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    player_controller: CharacterController,
    agent_controller: CharacterController,
    static_colliders: usize,
    tick: u64,
}

impl CollisionWorld {
    pub fn new(config: &SimulationConfig) -> Result<Self, WorldInitError> {
        let physics = config.physics;
        if !physics.gravity.is_finite() {
            return Err(WorldInitError::NonFiniteGravity(physics.gravity));
        }
        if !physics.tick_hz.is_finite() || physics.tick_hz <= 0.0 {
            return Err(WorldInitError::InvalidTickRate(physics.tick_hz));
        }

        let player_controller = CharacterController::new(config.player_controller).map_err(
            |reason| WorldInitError::InvalidControllerTuning {
                controller: ControllerHandle::Player,
                reason,
            },
        )?;
        let agent_controller = CharacterController::new(config.agent_controller).map_err(
            |reason| WorldInitError::InvalidControllerTuning {
                controller: ControllerHandle::Agent,
                reason,
            },
        )?;

        let integration_parameters = IntegrationParameters {
            dt: (1.0 / physics.tick_hz) as Real,
            ..IntegrationParameters::default()
        };

        Ok(Self {
            gravity: Vector::new(0.0, physics.gravity, 0.0),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            player_controller,
            agent_controller,
            static_colliders: 0,
            tick: 0,
        })
    }

    /// Вертикальная гравитация мира (m/s²)
    pub fn gravity_y(&self) -> f32 {
        self.gravity.y
    }

    /// Фиксированный инкремент одного step() (секунды)
    pub fn fixed_timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Сколько раз мир был шагнут
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Один фиксированный шаг симуляции
    ///
    /// Spatial index (BVH) обновляется здесь: геометрия и позиции, закоммиченные
    /// после прошлого step(), видны запросам только после этого вызова.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.tick += 1;
    }

    /// Постоянная статическая геометрия (ground, меши уровня)
    pub fn create_static_collider(
        &mut self,
        shape: &ColliderShape,
        transform: Transform,
    ) -> Result<ColliderHandle, ColliderBuildError> {
        let builder = shape.to_builder()?;
        Ok(self.insert_static(builder, transform))
    }

    pub(crate) fn insert_static(&mut self, builder: ColliderBuilder, transform: Transform) -> ColliderHandle {
        let collider = builder.position(to_isometry(&transform)).build();
        self.static_colliders += 1;
        ColliderHandle(self.colliders.insert(collider))
    }

    /// Kinematic body персонажа: нулевая скорость, двигается только коммитами позиции
    pub fn create_kinematic_body(
        &mut self,
        shape: &ColliderShape,
        position: Vec3,
    ) -> Result<KinematicHandle, ColliderBuildError> {
        let collider = shape.to_builder()?.build();
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(to_vector(position))
            .build();

        let body_handle = self.bodies.insert(body);
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        Ok(KinematicHandle {
            body: RigidBodyHandle(body_handle),
            collider: ColliderHandle(collider_handle),
        })
    }

    /// Удалить body персонажа вместе с его коллайдером
    pub fn remove_kinematic_body(&mut self, handle: &KinematicHandle) -> bool {
        self.bodies
            .remove(
                handle.body.0,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn static_collider_count(&self) -> usize {
        self.static_colliders
    }

    /// Текущая позиция body (read-only между коммитами)
    pub fn translation(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(body.0).map(|b| from_vector(b.translation()))
    }

    /// Коммит позиции kinematic body (одно атомарное обновление)
    pub fn set_translation(&mut self, body: RigidBodyHandle, position: Vec3) -> Result<(), MoveError> {
        let rigid_body = self.bodies.get_mut(body.0).ok_or(MoveError::MissingBody(body))?;
        rigid_body.set_translation(to_vector(position), true);
        Ok(())
    }

    pub fn controller(&self, controller: ControllerHandle) -> &CharacterController {
        match controller {
            ControllerHandle::Player => &self.player_controller,
            ControllerHandle::Agent => &self.agent_controller,
        }
    }

    /// Collision-corrected translation для desired (без коммита позиции)
    ///
    /// Результат запоминается как last correction controller'а.
    pub fn compute_movement(
        &mut self,
        handle: &KinematicHandle,
        controller: ControllerHandle,
        desired: Vec3,
    ) -> Result<MovementCorrection, MoveError> {
        let correction = self.run_controller(handle, controller, desired)?;
        let slot = match controller {
            ControllerHandle::Player => &mut self.player_controller,
            ControllerHandle::Agent => &mut self.agent_controller,
        };
        slot.last_correction = Some(correction);
        Ok(correction)
    }

    /// Есть ли опора под персонажем
    ///
    /// Короткий probe вниз без коммита: позиция body не меняется.
    pub fn query_grounded(
        &self,
        handle: &KinematicHandle,
        controller: ControllerHandle,
    ) -> Result<bool, MoveError> {
        self.run_controller(handle, controller, Vec3::new(0.0, -GROUND_PROBE_DISTANCE, 0.0))
            .map(|correction| correction.grounded)
    }

    fn run_controller(
        &self,
        handle: &KinematicHandle,
        controller: ControllerHandle,
        desired: Vec3,
    ) -> Result<MovementCorrection, MoveError> {
        let body = self
            .bodies
            .get(handle.body.0)
            .ok_or(MoveError::MissingBody(handle.body))?;
        let collider = self
            .colliders
            .get(handle.collider.0)
            .ok_or(MoveError::MissingCollider(handle.collider))?;

        // Позиция body: источник истины; collider обновится только на step()
        let position = *body.position();

        let filter = QueryFilter::default()
            .exclude_rigid_body(handle.body.0)
            .exclude_collider(handle.collider.0);
        let query_pipeline = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );

        let movement = self.controller(controller).inner.move_shape(
            self.integration_parameters.dt,
            &query_pipeline,
            collider.shape(),
            &position,
            to_vector(desired),
            |_| {},
        );

        Ok(MovementCorrection {
            desired,
            corrected: from_vector(&movement.translation),
            grounded: movement.grounded,
            sliding: movement.is_sliding_down_slope,
        })
    }
}

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub(crate) fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_isometry(transform: &Transform) -> Isometry<Real> {
    let t = transform.translation;
    let r = transform.rotation;
    Isometry::from_parts(
        Translation3::new(t.x, t.y, t.z),
        UnitQuaternion::new_normalize(Quaternion::new(r.w, r.x, r.y, r.z)),
    )
}

/// Система: один step Collision World за tick
pub fn step_collision_world(mut world: ResMut<CollisionWorld>) {
    world.step();
}
