//! Physics module
//!
//! Collision World (rapier), character controllers, провижн коллайдеров,
//! kinematic integrator.

pub mod colliders;
pub mod controller;
pub mod integrator;
pub mod world;

// Re-export основных типов
pub use colliders::{
    create_ground_plane, provision_level, provision_level_system, provision_model, Aabb3,
    ColliderBuildError, ColliderShape, LevelGeometry, ModelColliders, ModelGeometry,
    ProvisionReport, SubmeshGeometry,
};
pub use controller::{CharacterController, ControllerHandle, MovementCorrection};
pub use integrator::{
    move_character, resolve_translation, MovementOutcome, VERTICAL_OVERRIDE_EPSILON,
    ZERO_INTENT_EPSILON,
};
pub use world::{
    step_collision_world, ColliderHandle, CollisionWorld, KinematicHandle, MoveError,
    RigidBodyHandle, WorldInitError,
};
