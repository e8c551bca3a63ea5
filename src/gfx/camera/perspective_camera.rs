use cgmath::{
    perspective, Deg, InnerSpace, Matrix4, One, Quaternion, Rad, Rotation, Vector3, Zero,
};

use super::camera_utils::Camera;
use crate::config::RigConfig;

/// Perspective camera with an explicit world pose
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCamera {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    released: bool,
}

impl PerspectiveCamera {
    pub fn new(fovy: impl Into<Rad<f32>>, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            position: Vector3::zero(),
            orientation: Quaternion::one(),
            aspect,
            fovy: fovy.into(),
            znear,
            zfar,
            released: false,
        }
    }

    /// Camera matching the rig's field of view and clip planes
    pub fn from_rig_config(config: &RigConfig, aspect: f32) -> Self {
        Self::new(config.fovy, aspect, config.znear, config.zfar)
    }

    /// Direction the camera looks in world space
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(-Vector3::unit_z()).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_x()).normalize()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.orientation.rotate_vector(Vector3::unit_y()).normalize()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Default for PerspectiveCamera {
    /// Throwaway camera used when nothing else is available: 50° fov, square aspect
    fn default() -> Self {
        Self::new(Deg(50.0), 1.0, 0.1, 2000.0)
    }
}

impl Camera for PerspectiveCamera {
    fn position(&self) -> Vector3<f32> {
        self.position
    }

    fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    fn set_pose(&mut self, position: Vector3<f32>, orientation: Quaternion<f32>) {
        self.position = position;
        self.orientation = orientation.normalize();
    }

    fn view_matrix(&self) -> Matrix4<f32> {
        let rotation = Matrix4::from(self.orientation.conjugate());
        rotation * Matrix4::from_translation(-self.position)
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    fn resize_projection(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    fn release(&mut self) {
        self.released = true;
    }
}
