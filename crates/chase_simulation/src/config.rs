//! Конфигурация симуляции (data-driven, Default + serde)
//!
//! Все параметры: plain data. SimulationConfig собирает их вместе и
//! вставляется как Resource; кастомная конфигурация через SimulationPlugin::with_config.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Параметры Collision World
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Вертикальное ускорение (m/s², отрицательное = вниз)
    pub gravity: f32,
    /// Частота fixed tick (Hz). Шаг мира = 1 / tick_hz
    pub tick_hz: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81, // Earth gravity
            tick_hz: 60.0,
        }
    }
}

/// Настройки character controller для одного режима движения (player / agent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerTuning {
    /// Skin/contact offset (метры)
    pub offset: f32,
    /// Autostep: максимальная высота ступеньки (0 = autostep выключен)
    pub autostep_max_height: f32,
    /// Autostep: минимальная ширина площадки над ступенькой
    pub autostep_min_width: f32,
    /// Autostep: разрешать шагать на dynamic тела
    pub autostep_include_dynamic: bool,
    /// Snap-to-ground дистанция (0 = выключено)
    pub snap_to_ground: f32,
    /// Максимальный угол подъёма (градусы)
    pub max_slope_climb_deg: f32,
    /// Угол, с которого начинается соскальзывание (градусы)
    pub min_slope_slide_deg: f32,
}

impl ControllerTuning {
    /// Игрок: выше ступеньки, можно наступать на dynamic объекты
    pub fn player() -> Self {
        Self {
            offset: 0.01,
            autostep_max_height: 0.5,
            autostep_min_width: 0.2,
            autostep_include_dynamic: true,
            snap_to_ground: 0.5,
            max_slope_climb_deg: 45.0,
            min_slope_slide_deg: 50.0,
        }
    }

    /// Агент: ниже ступеньки, dynamic объекты не использует как опору
    pub fn agent() -> Self {
        Self {
            offset: 0.01,
            autostep_max_height: 0.3,
            autostep_min_width: 0.2,
            autostep_include_dynamic: false,
            snap_to_ground: 0.3,
            max_slope_climb_deg: 40.0,
            min_slope_slide_deg: 45.0,
        }
    }
}

/// Параметры персонажа (капсула + движение). Один тип для игрока и агента.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
pub struct CharacterConfig {
    /// Радиус капсулы (метры)
    pub radius: f32,
    /// Полная высота капсулы, включая полусферы (метры)
    pub height: f32,
    /// Максимальная горизонтальная скорость (m/s)
    pub move_speed: f32,
    /// Горизонтальное ускорение от input (m/s²)
    pub acceleration: f32,
    /// Трение при отсутствии input (1/s)
    pub friction: f32,
    /// Скорость прыжка (m/s, 0 = прыжки запрещены)
    pub jump_speed: f32,
    /// Terminal velocity (m/s, модуль)
    pub max_fall_speed: f32,
    /// Вертикальный сдвиг визуала относительно центра капсулы
    pub visual_offset: f32,
}

impl CharacterConfig {
    pub fn player() -> Self {
        Self {
            radius: 0.4,
            height: 1.8,
            move_speed: 5.0,
            acceleration: 40.0,
            friction: 10.0,
            jump_speed: 4.5,
            max_fall_speed: 50.0,
            visual_offset: -0.9, // модель стоит ногами на дне капсулы
        }
    }

    pub fn agent() -> Self {
        Self {
            radius: 0.4,
            height: 1.6,
            move_speed: 2.5,
            acceleration: 40.0,
            friction: 10.0,
            jump_speed: 0.0,
            max_fall_speed: 50.0,
            visual_offset: -0.8,
        }
    }

    /// Полувысота цилиндрической части капсулы
    pub fn capsule_half_height(&self) -> f32 {
        (self.height - 2.0 * self.radius).max(0.0) / 2.0
    }
}

/// Параметры преследования
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PursuitConfig {
    /// Минимальная планарная дистанция до цели (ближе: стоим)
    pub follow_distance: f32,
    /// Базовый период обновления target позиции (секунды)
    pub base_refresh_period: f32,
    /// Верхняя граница периода при нехватке FPS
    pub max_refresh_period: f32,
    /// Включено ли преследование сразу после spawn
    pub tracking_on_spawn: bool,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            follow_distance: 1.5,
            base_refresh_period: 0.25,
            max_refresh_period: 1.0,
            tracking_on_spawn: true,
        }
    }
}

/// Параметры реакции на performance signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Ниже этого FPS: реже обновляем target
    pub low_fps: f32,
    /// Выше этого FPS: возвращаемся к базовому периоду
    pub high_fps: f32,
    /// Множитель изменения периода за одну адаптацию
    pub adaptation_factor: f32,
    /// Как часто смотрим на signal (секунды)
    pub sample_interval: f32,
    /// Оценивать FPS по frame time, если никто снаружи не пишет signal
    pub estimate_from_frame_time: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            low_fps: 30.0,
            high_fps: 55.0,
            adaptation_factor: 1.5,
            sample_interval: 1.0,
            estimate_from_frame_time: true,
        }
    }
}

/// Вся конфигурация симуляции
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    pub player_controller: ControllerTuning,
    pub agent_controller: ControllerTuning,
    pub player: CharacterConfig,
    pub agent: CharacterConfig,
    pub pursuit: PursuitConfig,
    pub performance: PerformanceConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            player_controller: ControllerTuning::player(),
            agent_controller: ControllerTuning::agent(),
            player: CharacterConfig::player(),
            agent: CharacterConfig::agent(),
            pursuit: PursuitConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}
