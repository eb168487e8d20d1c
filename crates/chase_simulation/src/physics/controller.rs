//! Character controllers (player / agent)
//!
//! Два независимых экземпляра KinematicCharacterController, чтобы tuning
//! игрока и агентов никогда не влиял друг на друга.

use bevy::prelude::*;
use bevy_rapier3d::rapier::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};

use crate::config::ControllerTuning;

/// Какой controller использует персонаж
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub enum ControllerHandle {
    Player,
    Agent,
}

/// Результат последнего запроса к controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementCorrection {
    /// Что просили
    pub desired: Vec3,
    /// Что controller разрешил (collision-corrected)
    pub corrected: Vec3,
    /// Controller видит опору под капсулой
    pub grounded: bool,
    /// Скатываемся по слишком крутому склону
    pub sliding: bool,
}

/// Controller одного режима движения
///
/// Stateless между тиками, кроме последней correction.
#[derive(Debug, Clone)]
pub struct CharacterController {
    pub(crate) tuning: ControllerTuning,
    pub(crate) inner: KinematicCharacterController,
    pub(crate) last_correction: Option<MovementCorrection>,
}

impl CharacterController {
    pub fn new(tuning: ControllerTuning) -> Result<Self, &'static str> {
        tuning.validate()?;
        Ok(Self {
            tuning,
            inner: tuning.to_rapier(),
            last_correction: None,
        })
    }

    pub fn tuning(&self) -> &ControllerTuning {
        &self.tuning
    }

    pub fn last_correction(&self) -> Option<MovementCorrection> {
        self.last_correction
    }
}

impl ControllerTuning {
    /// Проверка tuning перед созданием мира (ошибка = fatal init)
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.offset.is_finite() || self.offset <= 0.0 {
            return Err("offset must be a positive finite length");
        }
        if !self.autostep_max_height.is_finite() || self.autostep_max_height < 0.0 {
            return Err("autostep max height must be finite and non-negative");
        }
        if !self.autostep_min_width.is_finite() || self.autostep_min_width < 0.0 {
            return Err("autostep min width must be finite and non-negative");
        }
        if !self.snap_to_ground.is_finite() || self.snap_to_ground < 0.0 {
            return Err("snap-to-ground distance must be finite and non-negative");
        }
        if !(0.0..=90.0).contains(&self.max_slope_climb_deg)
            || !(0.0..=90.0).contains(&self.min_slope_slide_deg)
        {
            return Err("slope angles must lie in [0, 90] degrees");
        }
        Ok(())
    }

    /// Конвертация в rapier controller
    pub fn to_rapier(&self) -> KinematicCharacterController {
        let autostep = (self.autostep_max_height > 0.0).then(|| CharacterAutostep {
            max_height: CharacterLength::Absolute(self.autostep_max_height),
            min_width: CharacterLength::Absolute(self.autostep_min_width),
            include_dynamic_bodies: self.autostep_include_dynamic,
        });
        let snap_to_ground =
            (self.snap_to_ground > 0.0).then(|| CharacterLength::Absolute(self.snap_to_ground));

        KinematicCharacterController {
            offset: CharacterLength::Absolute(self.offset),
            slide: true,
            autostep,
            snap_to_ground,
            max_slope_climb_angle: self.max_slope_climb_deg.to_radians(),
            min_slope_slide_angle: self.min_slope_slide_deg.to_radians(),
            ..KinematicCharacterController::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tunings_are_valid() {
        assert!(ControllerTuning::player().validate().is_ok());
        assert!(ControllerTuning::agent().validate().is_ok());
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let tuning = ControllerTuning {
            offset: 0.0,
            ..ControllerTuning::player()
        };
        assert!(CharacterController::new(tuning).is_err());

        let tuning = ControllerTuning {
            offset: f32::NAN,
            ..ControllerTuning::player()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_zero_autostep_and_snap_disable_features() {
        let tuning = ControllerTuning {
            autostep_max_height: 0.0,
            snap_to_ground: 0.0,
            ..ControllerTuning::agent()
        };
        let controller = tuning.to_rapier();
        assert!(controller.autostep.is_none());
        assert!(controller.snap_to_ground.is_none());
    }

    #[test]
    fn test_rapier_controller_carries_tuning() {
        let controller = ControllerTuning::player().to_rapier();
        let autostep = controller.autostep.expect("player autostep enabled");
        assert!(autostep.include_dynamic_bodies);
        assert!(matches!(autostep.max_height, CharacterLength::Absolute(h) if (h - 0.5).abs() < 1e-6));
        assert!(matches!(controller.snap_to_ground, Some(CharacterLength::Absolute(d)) if (d - 0.5).abs() < 1e-6));
        assert!(controller.slide);
    }
}
