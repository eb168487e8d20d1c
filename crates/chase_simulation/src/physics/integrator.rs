//! Kinematic Movement Integrator
//!
//! desired translation → controller correction → один коммит позиции body.
//!
//! Vertical override: если горизонталь была запрошена, но controller срезал её
//! в ~0, а вертикаль запрошена, берём запрошенную вертикаль (прыжок/падение
//! вдоль стены не должны залипать). Горизонталь всегда из correction.
//! Чисто вертикальное движение (прыжок на месте) идёт как есть через controller:
//! потолок и пол его останавливают.

use bevy::prelude::*;

use super::controller::{ControllerHandle, MovementCorrection};
use super::world::{CollisionWorld, KinematicHandle, MoveError};
use crate::movement::sanitize_velocity;

/// Порог для vertical override (метры за tick): горизонталь desired должна быть
/// длиннее него, а обе горизонтальные компоненты correction короче
pub const VERTICAL_OVERRIDE_EPSILON: f32 = 1e-4;

/// Ниже этой длины desired translation считается нулевым intent
pub const ZERO_INTENT_EPSILON: f32 = 1e-6;

/// Чем закончился запрос на движение
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementOutcome {
    Committed {
        /// Фактически применённое смещение
        translation: Vec3,
        /// Новая позиция body
        position: Vec3,
        grounded: bool,
        vertical_override: bool,
    },
    /// Handle не резолвится: ничего не двигали
    Skipped(MoveError),
}

impl MovementOutcome {
    /// Recoverable no-op: пишем warning, симуляция продолжается
    pub fn skipped(error: MoveError) -> Self {
        crate::log_warning(&format!("Movement skipped: {}", error));
        Self::Skipped(error)
    }

    pub fn position(&self) -> Option<Vec3> {
        match self {
            Self::Committed { position, .. } => Some(*position),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Итоговое смещение из desired и correction controller'а
///
/// Возвращает (translation, vertical_override).
pub fn resolve_translation(desired: Vec3, correction: &MovementCorrection) -> (Vec3, bool) {
    let corrected = correction.corrected;
    // Срезано столкновением, а не просто не запрошено
    let horizontal_blocked = Vec2::new(desired.x, desired.z).length() > VERTICAL_OVERRIDE_EPSILON
        && corrected.x.abs() < VERTICAL_OVERRIDE_EPSILON
        && corrected.z.abs() < VERTICAL_OVERRIDE_EPSILON;
    let wants_vertical = desired.y.abs() > VERTICAL_OVERRIDE_EPSILON;
    // Приземление: пол остановил падение, override протолкнул бы сквозь него
    let landing = correction.grounded && desired.y < 0.0;

    if horizontal_blocked && wants_vertical && !landing {
        (Vec3::new(corrected.x, desired.y, corrected.z), true)
    } else {
        (corrected, false)
    }
}

pub(crate) fn resolve_handles(
    handle: Option<&KinematicHandle>,
    controller: Option<ControllerHandle>,
) -> Result<(&KinematicHandle, ControllerHandle), MoveError> {
    let handle = handle.ok_or(MoveError::MissingHandle)?;
    let controller = controller.ok_or(MoveError::MissingController)?;
    Ok((handle, controller))
}

/// Подвинуть персонажа на desired (velocity × dt) с учётом коллизий
///
/// Non-finite компоненты desired обнуляются. Нулевой intent позицию не меняет.
pub fn move_character(
    world: &mut CollisionWorld,
    handle: Option<&KinematicHandle>,
    controller: Option<ControllerHandle>,
    desired: Vec3,
) -> MovementOutcome {
    let (handle, controller) = match resolve_handles(handle, controller) {
        Ok(resolved) => resolved,
        Err(err) => return MovementOutcome::skipped(err),
    };

    let Some(current) = world.translation(handle.body) else {
        return MovementOutcome::skipped(MoveError::MissingBody(handle.body));
    };

    let desired = sanitize_velocity(desired);
    if desired.length() < ZERO_INTENT_EPSILON {
        let grounded = world.query_grounded(handle, controller).unwrap_or(false);
        return MovementOutcome::Committed {
            translation: Vec3::ZERO,
            position: current,
            grounded,
            vertical_override: false,
        };
    }

    let correction = match world.compute_movement(handle, controller, desired) {
        Ok(correction) => correction,
        Err(err) => return MovementOutcome::skipped(err),
    };

    let (translation, vertical_override) = resolve_translation(desired, &correction);
    let position = current + translation;

    if let Err(err) = world.set_translation(handle.body, position) {
        return MovementOutcome::skipped(err);
    }

    MovementOutcome::Committed {
        translation,
        position,
        grounded: correction.grounded,
        vertical_override,
    }
}
