//! Input snapshot игрока
//!
//! Input collaborator пишет сюда раз в tick; симуляция только читает.
//! Single-shot события (jump, toggle_tracking) гасятся после tick'а.

use bevy::prelude::*;

/// Снимок input на один tick
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Resource)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Single-shot: прыжок
    pub jump: bool,
    /// Single-shot: включить/выключить преследование
    pub toggle_tracking: bool,
}

impl MovementInput {
    /// Нормализованное планарное направление (forward = -Z, right = +X)
    ///
    /// Противоположные клавиши гасят друг друга.
    pub fn direction(&self) -> Vec3 {
        let x = axis(self.right, self.left);
        let z = axis(self.backward, self.forward);
        Vec3::new(x, 0.0, z).normalize_or_zero()
    }

    pub fn has_direction(&self) -> bool {
        self.direction() != Vec3::ZERO
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Система: гасим single-shot события в конце tick'а
pub fn consume_single_shot_input(mut input: ResMut<MovementInput>) {
    if input.jump || input.toggle_tracking {
        input.jump = false;
        input.toggle_tracking = false;
    }
}
