use cgmath::{InnerSpace, Quaternion, Rad, Rotation, Rotation3, Vector3, Zero};
use log::warn;

use super::avatar::Avatar;
use crate::config::MovementConfig;

/// Directional intent sampled from the held keys
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MovementIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MovementIntent {
    /// Local-space intent `(right - left, up - down, back - forward)`
    ///
    /// The camera looks down `-Z`, so forward maps to negative Z.
    pub fn local_vector(&self) -> Vector3<f32> {
        let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
        Vector3::new(
            axis(self.right, self.left),
            axis(self.up, self.down),
            axis(self.backward, self.forward),
        )
    }

    pub fn is_idle(&self) -> bool {
        self.local_vector().magnitude2() == 0.0
    }
}

/// Converts discrete intent into damped velocity and position
///
/// Every call is one fixed step: frame delta time is deliberately not used, so
/// damping and move speed are expressed per update.
#[derive(Debug, Clone, Copy)]
pub struct MovementIntegrator {
    damping: f32,
}

/// Largest damping kept; 1.0 would stop the avatar dead every step
const MAX_DAMPING: f32 = 0.99;

impl MovementIntegrator {
    /// Damping outside `[0, 1)` is clamped into range with a warning.
    pub fn new(damping: f32) -> Self {
        let clamped = if damping.is_nan() {
            0.0
        } else {
            damping.clamp(0.0, MAX_DAMPING)
        };
        if clamped != damping {
            warn!("Movement damping {damping} outside [0, 1), using {clamped}");
        }
        Self { damping: clamped }
    }

    pub fn from_config(config: &MovementConfig) -> Self {
        Self::new(config.damping)
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// World-space unit direction for `intent` at the given yaw
    ///
    /// Returns `None` when no direction is held (nothing to normalize).
    pub fn world_direction(intent: &MovementIntent, yaw: f32) -> Option<Vector3<f32>> {
        let local = intent.local_vector();
        if local.magnitude2() == 0.0 {
            return None;
        }
        let heading = Quaternion::from_angle_y(Rad(yaw));
        Some(heading.rotate_vector(local.normalize()))
    }

    /// Advance the avatar by one step
    pub fn step(&self, avatar: &mut Avatar, intent: &MovementIntent) {
        let impulse = Self::world_direction(intent, avatar.yaw()).unwrap_or_else(Vector3::zero);

        avatar.velocity *= 1.0 - self.damping;
        avatar.velocity += impulse * avatar.move_speed;
        avatar.location += avatar.velocity;
    }
}

impl Default for MovementIntegrator {
    fn default() -> Self {
        Self::from_config(&MovementConfig::default())
    }
}
