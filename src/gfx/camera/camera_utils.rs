use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// A render camera the viewport can draw through and pick with
///
/// Cameras look down their local `-Z` axis with `+Y` up. Projection matrices
/// use the OpenGL clip convention (`z ∈ [-1, 1]`); the renderer applies
/// [`OPENGL_TO_WGPU_MATRIX`] when building uniforms.
pub trait Camera {
    fn position(&self) -> Vector3<f32>;

    fn orientation(&self) -> Quaternion<f32>;

    /// Place the camera in world space
    fn set_pose(&mut self, position: Vector3<f32>, orientation: Quaternion<f32>);

    /// World-to-view transform
    fn view_matrix(&self) -> Matrix4<f32>;

    /// View-to-clip transform in OpenGL convention
    fn projection_matrix(&self) -> Matrix4<f32>;

    /// Update the aspect ratio after the surface was resized
    fn resize_projection(&mut self, width: u32, height: u32);

    /// Release hook invoked when the owning lifecycle stops
    fn release(&mut self) {}

    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection_matrix() * self.view_matrix()
    }

    fn uniform(&self) -> CameraUniform {
        let eye = self.position();
        CameraUniform {
            view_position: [eye.x, eye.y, eye.z, 1.0],
            view_proj: convert_matrix4_to_array(self.build_view_projection_matrix()),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct CameraUniform {
    /// The eye position of the camera in homogenous coordinates.
    ///
    /// Homogenous coordinates are used to fullfill the 16 byte alignment requirement.
    pub view_position: [f32; 4],

    /// Contains the view projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    /// Creates a default [CameraUniform].
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: convert_matrix4_to_array(Matrix4::identity()),
        }
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}
