use cgmath::{Vector3, Zero};

use crate::config::AvatarConfig;

/// First-person avatar state
///
/// Yaw lives in `rotation.y`; pitch is owned by the camera rig so the body
/// never tilts. Location and velocity are written only by the movement
/// integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub name: String,
    pub move_speed: f32,
    pub rotational_speed: f32,
    pub location: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub velocity: Vector3<f32>,
}

impl Avatar {
    pub fn new(name: impl Into<String>, spawn_location: Vector3<f32>) -> Self {
        let defaults = AvatarConfig::default();
        Self {
            name: name.into(),
            move_speed: defaults.move_speed,
            rotational_speed: defaults.rotational_speed,
            location: spawn_location,
            rotation: Vector3::zero(),
            velocity: Vector3::zero(),
        }
    }

    pub fn from_config(config: &AvatarConfig) -> Self {
        Self {
            name: config.name.clone(),
            move_speed: config.move_speed,
            rotational_speed: config.rotational_speed,
            location: config.spawn_location,
            rotation: Vector3::zero(),
            velocity: Vector3::zero(),
        }
    }

    /// Heading around the world up axis in radians
    pub fn yaw(&self) -> f32 {
        self.rotation.y
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.rotation.y = yaw;
    }

    /// Put the avatar back at `location` with no motion or heading
    pub fn respawn(&mut self, location: Vector3<f32>) {
        self.location = location;
        self.rotation = Vector3::zero();
        self.velocity = Vector3::zero();
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self::from_config(&AvatarConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_from_config() {
        let config = AvatarConfig {
            name: "Scout".to_string(),
            move_speed: 0.2,
            rotational_speed: 0.01,
            spawn_location: Vector3::new(1.0, 2.0, 3.0),
        };
        let avatar = Avatar::from_config(&config);
        assert_eq!(avatar.name, "Scout");
        assert_eq!(avatar.location, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(avatar.velocity, Vector3::zero());
        assert_eq!(avatar.yaw(), 0.0);
    }

    #[test]
    fn test_respawn_clears_motion() {
        let mut avatar = Avatar::new("Player", Vector3::zero());
        avatar.velocity = Vector3::new(1.0, 0.0, 0.0);
        avatar.set_yaw(1.2);
        avatar.respawn(Vector3::new(0.0, 5.0, 0.0));
        assert_eq!(avatar.location, Vector3::new(0.0, 5.0, 0.0));
        assert_eq!(avatar.velocity, Vector3::zero());
        assert_eq!(avatar.yaw(), 0.0);
    }
}
