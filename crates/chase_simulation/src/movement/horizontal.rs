//! Горизонтальная модель игрока: ускорение к input, трение без input, clamp скорости

use bevy::prelude::*;

use crate::config::CharacterConfig;

/// Горизонтальная скорость ниже этого порога гасится в 0
pub const STOP_SPEED: f32 = 0.01;

/// Новая горизонтальная скорость (y не трогаем)
pub fn update_horizontal_velocity(
    velocity: Vec3,
    direction: Vec3,
    config: &CharacterConfig,
    dt: f32,
) -> Vec3 {
    let planar = Vec2::new(velocity.x, velocity.z);
    let wish = Vec2::new(direction.x, direction.z).normalize_or_zero();

    let planar = if wish != Vec2::ZERO {
        let target = wish * config.move_speed;
        let delta = target - planar;
        let max_change = config.acceleration * dt;
        planar + delta.clamp_length_max(max_change)
    } else {
        // Экспоненциальное трение, без overshoot в обратную сторону
        let damped = planar * (1.0 - config.friction * dt).max(0.0);
        if damped.length() < STOP_SPEED {
            Vec2::ZERO
        } else {
            damped
        }
    };

    let planar = planar.clamp_length_max(config.move_speed);
    Vec3::new(planar.x, velocity.y, planar.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_accelerates_toward_input() {
        let config = CharacterConfig::player();
        let v = update_horizontal_velocity(Vec3::ZERO, Vec3::NEG_Z, &config, DT);
        // 40 m/s² * 1/60 s
        assert!((v.z + 40.0 * DT).abs() < 1e-5, "vz = {}", v.z);
        assert_eq!(v.x, 0.0);
    }

    #[test]
    fn test_speed_clamped_to_move_speed() {
        let config = CharacterConfig::player();
        let mut v = Vec3::ZERO;
        for _ in 0..120 {
            v = update_horizontal_velocity(v, Vec3::new(1.0, 0.0, 1.0), &config, DT);
        }
        let planar = Vec2::new(v.x, v.z).length();
        assert!((planar - config.move_speed).abs() < 1e-4, "speed = {}", planar);
    }

    #[test]
    fn test_friction_stops_without_input() {
        let config = CharacterConfig::player();
        let mut v = Vec3::new(5.0, -1.0, 0.0);
        for _ in 0..120 {
            v = update_horizontal_velocity(v, Vec3::ZERO, &config, DT);
        }
        assert_eq!(v.x, 0.0);
        assert_eq!(v.z, 0.0);
        // Вертикаль не трогаем
        assert_eq!(v.y, -1.0);
    }
}
