//! # Viewport Configuration
//!
//! Plain configuration structs with sensible defaults for every tunable part of
//! the viewport: the avatar, the first-person camera rig, movement damping, key
//! bindings, selection thresholds and the host window.
//!
//! All structs implement [`Default`]; override individual fields with struct
//! update syntax:
//!
//! ```no_run
//! use vantage::config::{ViewportConfig, MovementConfig};
//!
//! let config = ViewportConfig {
//!     movement: MovementConfig { damping: 0.3 },
//!     ..Default::default()
//! };
//! ```

use cgmath::{Deg, Vector3, Zero};
use winit::keyboard::KeyCode;

use crate::input::PointerButton;

/// Aggregated configuration for a whole viewport session
#[derive(Debug, Clone, Default)]
pub struct ViewportConfig {
    pub avatar: AvatarConfig,
    pub rig: RigConfig,
    pub movement: MovementConfig,
    pub bindings: KeyBindings,
    pub selection: SelectionConfig,
    pub window: WindowConfig,
}

/// Initial avatar parameters
#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub name: String,
    /// Impulse added to velocity per update while a direction is held
    pub move_speed: f32,
    /// Radians of rotation per pixel of mouse motion
    pub rotational_speed: f32,
    pub spawn_location: Vector3<f32>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            move_speed: 0.1,
            rotational_speed: 0.005,
            spawn_location: Vector3::zero(),
        }
    }
}

/// First-person camera rig parameters
#[derive(Debug, Clone, Copy)]
pub struct RigConfig {
    /// Height of the avatar body in world units
    pub avatar_height: f32,
    /// Fraction of `avatar_height` at which the eye sits
    pub eye_height_fraction: f32,
    /// Pitch is clamped to `±(π/2 - pitch_epsilon)`
    pub pitch_epsilon: f32,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl RigConfig {
    /// Largest absolute pitch the rig allows
    pub fn pitch_limit(&self) -> f32 {
        std::f32::consts::FRAC_PI_2 - self.pitch_epsilon
    }

    /// Vertical offset from the avatar location to the eye
    pub fn eye_height(&self) -> f32 {
        self.avatar_height * self.eye_height_fraction
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            avatar_height: 1.0,
            eye_height_fraction: 0.9,
            pitch_epsilon: 0.1,
            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

/// Velocity damping for the movement integrator
#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    /// Fraction of velocity removed every update, in `[0, 1)`
    pub damping: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self { damping: 0.5 }
    }
}

/// Physical keys and mouse buttons driving the avatar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    /// Button whose press requests pointer capture for mouse look
    pub look_button: PointerButton,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            up: KeyCode::Space,
            down: KeyCode::ShiftLeft,
            look_button: PointerButton::Primary,
        }
    }
}

/// Selection tool thresholds
#[derive(Debug, Clone, Copy)]
pub struct SelectionConfig {
    /// Screen distance in device pixels a press must travel to become a drag
    pub drag_threshold: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
        }
    }
}

/// Host window settings
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f64; 4],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vantage".to_string(),
            width: 1200,
            height: 800,
            clear_color: [0.1, 0.2, 0.3, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pitch_limit_stays_below_vertical() {
        let rig = RigConfig::default();
        assert!(rig.pitch_limit() < std::f32::consts::FRAC_PI_2);
        assert!((rig.pitch_limit() - (std::f32::consts::FRAC_PI_2 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_default_eye_height() {
        let rig = RigConfig::default();
        assert!((rig.eye_height() - 0.9).abs() < 1e-6);
    }
}
