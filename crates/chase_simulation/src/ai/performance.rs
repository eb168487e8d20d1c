//! Адаптация частоты обновления target по performance signal
//!
//! Мало FPS → реже копируем позицию цели (refresh period растёт до max).
//! FPS восстановился → период возвращается к базовому.

use bevy::prelude::*;

use super::pursuit::PursuitAgent;
use crate::config::{PerformanceConfig, PursuitConfig, SimulationConfig};

/// Оценка FPS от performance collaborator
#[derive(Resource, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct PerformanceSignal {
    pub estimated_fps: f32,
}

impl Default for PerformanceSignal {
    fn default() -> Self {
        Self { estimated_fps: 60.0 }
    }
}

/// EMA frame time (используется если никто снаружи не пишет signal)
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameRateEstimator {
    pub average_frame_time: Option<f32>,
}

/// Вес нового кадра в EMA
pub const FRAME_TIME_SMOOTHING: f32 = 0.1;

impl FrameRateEstimator {
    pub fn push(&mut self, frame_time: f32) -> Option<f32> {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return self.fps();
        }
        let average = match self.average_frame_time {
            Some(avg) => avg + (frame_time - avg) * FRAME_TIME_SMOOTHING,
            None => frame_time,
        };
        self.average_frame_time = Some(average);
        self.fps()
    }

    pub fn fps(&self) -> Option<f32> {
        self.average_frame_time.map(|t| 1.0 / t)
    }
}

/// Таймер опроса signal
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceSampler {
    pub elapsed: f32,
}

/// Новый refresh period по текущему FPS
pub fn adapt_refresh_period(
    current: f32,
    fps: f32,
    performance: &PerformanceConfig,
    pursuit: &PursuitConfig,
) -> f32 {
    let factor = performance.adaptation_factor.max(1.0);
    if !fps.is_finite() {
        return current;
    }

    if fps < performance.low_fps {
        (current * factor).min(pursuit.max_refresh_period)
    } else if fps > performance.high_fps {
        (current / factor).max(pursuit.base_refresh_period)
    } else {
        current
    }
}

/// Система (Update): frame time → PerformanceSignal
pub fn estimate_frame_rate(
    config: Res<SimulationConfig>,
    time: Res<Time<Real>>,
    mut estimator: ResMut<FrameRateEstimator>,
    mut signal: ResMut<PerformanceSignal>,
) {
    if !config.performance.estimate_from_frame_time {
        return;
    }
    if let Some(fps) = estimator.push(time.delta_secs()) {
        signal.estimated_fps = fps;
    }
}

/// Система (FixedUpdate): раз в sample_interval подстраиваем refresh period агентов
pub fn apply_performance_signal(
    config: Res<SimulationConfig>,
    signal: Res<PerformanceSignal>,
    time: Res<Time<Fixed>>,
    mut sampler: ResMut<PerformanceSampler>,
    mut agents: Query<&mut PursuitAgent>,
) {
    sampler.elapsed += time.delta_secs();
    if sampler.elapsed < config.performance.sample_interval {
        return;
    }
    sampler.elapsed = 0.0;

    for mut agent in agents.iter_mut() {
        let period = adapt_refresh_period(
            agent.refresh_period,
            signal.estimated_fps,
            &config.performance,
            &config.pursuit,
        );
        if period != agent.refresh_period {
            crate::log(&format!(
                "Pursuit refresh period {:.3}s → {:.3}s (fps {:.1})",
                agent.refresh_period, period, signal.estimated_fps
            ));
            agent.refresh_period = period;
        }
    }
}
