use cgmath::{Quaternion, Rad, Rotation3, Vector3};

use super::camera_utils::Camera;
use crate::avatar::Avatar;
use crate::config::RigConfig;

/// First-person rig deriving the camera pose from an [`Avatar`]
///
/// Yaw is stored on the avatar, pitch is owned here so that the body never
/// tilts. Pitch is clamped to `±pitch_limit` after every orientation delta.
#[derive(Debug, Clone, Copy)]
pub struct CameraRig {
    pitch: f32,
    pitch_limit: f32,
    eye_height: f32,
}

impl CameraRig {
    pub fn new(config: &RigConfig) -> Self {
        Self {
            pitch: 0.0,
            pitch_limit: config.pitch_limit(),
            eye_height: config.eye_height(),
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn pitch_limit(&self) -> f32 {
        self.pitch_limit
    }

    pub fn eye_height(&self) -> f32 {
        self.eye_height
    }

    /// Turn the view by a raw mouse delta in pixels
    ///
    /// Moving right turns the avatar right (yaw decreases), moving down looks
    /// down (pitch decreases).
    pub fn apply_orientation_delta(&mut self, avatar: &mut Avatar, dx: f32, dy: f32) {
        let yaw = avatar.yaw() - dx * avatar.rotational_speed;
        avatar.set_yaw(yaw);
        self.pitch = (self.pitch - dy * avatar.rotational_speed)
            .clamp(-self.pitch_limit, self.pitch_limit);
    }

    /// World orientation for the given avatar yaw: yaw about world up, then
    /// pitch about the camera's local X axis
    pub fn orientation(&self, yaw: f32) -> Quaternion<f32> {
        Quaternion::from_angle_y(Rad(yaw)) * Quaternion::from_angle_x(Rad(self.pitch))
    }

    /// Eye position for an avatar
    pub fn eye_position(&self, avatar: &Avatar) -> Vector3<f32> {
        avatar.location + Vector3::unit_y() * self.eye_height
    }

    /// Write the avatar's current pose into `camera`
    pub fn materialize(&self, avatar: &Avatar, camera: &mut dyn Camera) {
        camera.set_pose(self.eye_position(avatar), self.orientation(avatar.yaw()));
    }

    /// Level the view again
    pub fn reset_pitch(&mut self) {
        self.pitch = 0.0;
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(&RigConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::PerspectiveCamera;
    use cgmath::{InnerSpace, Rotation, Zero};
    use rand::Rng;

    #[test]
    fn test_pitch_is_clamped_for_any_delta_sequence() {
        let mut rng = rand::rng();
        let mut rig = CameraRig::default();
        let mut avatar = Avatar::default();
        let limit = rig.pitch_limit();

        for _ in 0..1000 {
            let dx = rng.random_range(-2000.0f32..2000.0);
            let dy = rng.random_range(-2000.0f32..2000.0);
            rig.apply_orientation_delta(&mut avatar, dx, dy);
            assert!(rig.pitch() >= -limit && rig.pitch() <= limit);
        }
    }

    #[test]
    fn test_delta_directions() {
        let mut rig = CameraRig::default();
        let mut avatar = Avatar::default();

        rig.apply_orientation_delta(&mut avatar, 100.0, 0.0);
        assert!((avatar.yaw() + 0.5).abs() < 1e-6);
        assert_eq!(rig.pitch(), 0.0);

        rig.apply_orientation_delta(&mut avatar, 0.0, 100.0);
        assert!((rig.pitch() + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_orientation_has_no_roll() {
        let mut rng = rand::rng();
        let mut rig = CameraRig::default();
        let mut avatar = Avatar::default();

        for _ in 0..100 {
            rig.apply_orientation_delta(
                &mut avatar,
                rng.random_range(-500.0f32..500.0),
                rng.random_range(-500.0f32..500.0),
            );
            // Yaw before pitch keeps the camera's right vector horizontal
            let right = rig.orientation(avatar.yaw()).rotate_vector(Vector3::unit_x());
            assert!(right.y.abs() < 1e-5);
        }
    }

    #[test]
    fn test_materialize_places_eye_above_avatar() {
        let rig = CameraRig::default();
        let mut avatar = Avatar::default();
        avatar.location = Vector3::new(2.0, 1.0, -3.0);
        avatar.set_yaw(std::f32::consts::FRAC_PI_2);

        let mut camera = PerspectiveCamera::default();
        rig.materialize(&avatar, &mut camera);

        assert!((camera.position - Vector3::new(2.0, 1.9, -3.0)).magnitude() < 1e-5);
        assert!((camera.forward() - Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_reset_pitch() {
        let mut rig = CameraRig::default();
        let mut avatar = Avatar::default();
        rig.apply_orientation_delta(&mut avatar, 0.0, -40.0);
        assert!(!rig.pitch().is_zero());
        rig.reset_pitch();
        assert_eq!(rig.pitch(), 0.0);
    }
}
