//! Vertical motion / grounding
//!
//! Порядок за tick: sanitize → grounded query → gravity или clamp → jump → terminal velocity.

use bevy::prelude::*;

/// Скорость персонажа (mutates раз в tick владельцем)
///
/// `grounded`: последний результат grounded query, только для чтения снаружи.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MovementState {
    pub velocity: Vec3,
    pub grounded: bool,
}

impl MovementState {
    /// Self-healing: non-finite компоненты → 0
    pub fn sanitize(&mut self) {
        self.velocity = sanitize_velocity(self.velocity);
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec2::new(self.velocity.x, self.velocity.z).length()
    }
}

pub fn sanitize_velocity(velocity: Vec3) -> Vec3 {
    let fix = |c: f32| if c.is_finite() { c } else { 0.0 };
    Vec3::new(fix(velocity.x), fix(velocity.y), fix(velocity.z))
}

/// Параметры вертикального шага
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalStep {
    pub gravity: f32,
    pub dt: f32,
    /// 0 = прыжки запрещены
    pub jump_speed: f32,
    pub max_fall_speed: f32,
}

/// Новая вертикальная скорость
pub fn update_vertical_velocity(vy: f32, grounded: bool, jump: bool, step: &VerticalStep) -> f32 {
    let mut vy = if vy.is_finite() { vy } else { 0.0 };

    if !grounded {
        vy += step.gravity * step.dt;
    } else if vy < 0.0 {
        vy = 0.0;
    }

    if jump && grounded && step.jump_speed > 0.0 {
        vy = step.jump_speed;
    }

    vy.max(-step.max_fall_speed.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(dt: f32) -> VerticalStep {
        VerticalStep {
            gravity: -9.81,
            dt,
            jump_speed: 4.5,
            max_fall_speed: 50.0,
        }
    }

    #[test]
    fn test_grounded_clamps_negative_velocity() {
        assert_eq!(update_vertical_velocity(-3.0, true, false, &step(0.1)), 0.0);
    }

    #[test]
    fn test_grounded_keeps_positive_velocity() {
        // Только что прыгнули, ещё касаемся пола
        assert_eq!(update_vertical_velocity(2.0, true, false, &step(0.1)), 2.0);
    }

    #[test]
    fn test_airborne_accumulates_gravity() {
        let vy = update_vertical_velocity(-2.0, false, false, &step(0.1));
        assert!((vy - (-2.981)).abs() < 1e-5, "vy = {}", vy);
    }

    #[test]
    fn test_jump_only_while_grounded() {
        assert_eq!(update_vertical_velocity(0.0, true, true, &step(0.1)), 4.5);

        let airborne = update_vertical_velocity(0.0, false, true, &step(0.1));
        assert!(airborne < 0.0);
    }

    #[test]
    fn test_zero_jump_speed_disables_jump() {
        let no_jump = VerticalStep {
            jump_speed: 0.0,
            ..step(0.1)
        };
        assert_eq!(update_vertical_velocity(0.0, true, true, &no_jump), 0.0);
    }

    #[test]
    fn test_terminal_velocity() {
        let vy = update_vertical_velocity(-49.9, false, false, &step(1.0));
        assert_eq!(vy, -50.0);
    }

    #[test]
    fn test_non_finite_velocity_is_healed() {
        let mut state = MovementState {
            velocity: Vec3::new(f32::NAN, f32::NEG_INFINITY, 1.0),
            grounded: false,
        };
        state.sanitize();
        assert_eq!(state.velocity, Vec3::new(0.0, 0.0, 1.0));

        assert_eq!(update_vertical_velocity(f32::NAN, true, false, &step(0.1)), 0.0);
    }
}
