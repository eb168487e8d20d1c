//! AI module
//!
//! Straight-line pursuit (без navmesh и graph search) + адаптация частоты
//! обновления target под performance signal.

use bevy::prelude::*;

pub mod performance;
pub mod pursuit;

// Re-export основных типов
pub use performance::{
    adapt_refresh_period, FrameRateEstimator, PerformanceSampler, PerformanceSignal,
};
pub use pursuit::{pursuit_velocity, spawn_pursuit_agent, PursuitAgent, PursuitState};

use crate::SimulationSet;

/// Pursuit Plugin
///
/// Порядок внутри SimulationSet::Agents:
/// 1. toggle_tracking: single-shot toggle из input snapshot
/// 2. refresh_pursuit_targets: rate-limited копирование позиции цели
/// 3. apply_performance_signal: подстройка refresh period
/// 4. move_pursuit_agents: character tick агентов
pub struct PursuitPlugin;

impl Plugin for PursuitPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PerformanceSignal>()
            .init_resource::<FrameRateEstimator>()
            .init_resource::<PerformanceSampler>()
            .add_systems(Update, performance::estimate_frame_rate)
            .add_systems(
                FixedUpdate,
                (
                    pursuit::toggle_tracking,
                    pursuit::refresh_pursuit_targets,
                    performance::apply_performance_signal,
                    pursuit::move_pursuit_agents,
                )
                    .chain()
                    .in_set(SimulationSet::Agents),
            );
    }
}
