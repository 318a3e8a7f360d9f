//! Camera flight along the tube centerline.

use glam::{Mat4, Vec2, Vec3};

use crate::params::CameraPath;

const NEAR_PLANE: f32 = 0.05;
const FAR_PLANE: f32 = 200.0;

/// Camera that rides the tube centerline; a pure function of time
#[derive(Debug, Clone, Default)]
pub struct TubeCamera {
    path: CameraPath,
}

impl TubeCamera {
    pub fn new(path: CameraPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &CameraPath {
        &self.path
    }

    /// XY offset of the tube centerline at depth `z`
    pub fn centerline(&self, z: f32) -> Vec2 {
        let p = &self.path;
        Vec2::new(
            (z * p.sway_x_frequency).sin() * p.sway_x_amplitude,
            (z * p.sway_y_frequency).sin() * p.sway_y_amplitude,
        )
    }

    /// Compute camera position and look-at target for given time
    pub fn compute_position_and_target(&self, time_s: f32) -> (Vec3, Vec3) {
        let z = time_s * self.path.forward_speed;
        let target_z = z + self.path.look_ahead;

        let eye = self.centerline(z).extend(z);
        let target = self.centerline(target_z).extend(target_z);
        (eye, target)
    }

    /// View-projection matrix and eye position for `time_s`
    pub fn create_view_proj_matrix(&self, time_s: f32, aspect_ratio: f32) -> (Mat4, Vec3) {
        let (eye, target) = self.compute_position_and_target(time_s);

        // Y stays up; the path never turns steeply enough to roll
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            self.path.fov_degrees.to_radians(),
            aspect_ratio,
            NEAR_PLANE,
            FAR_PLANE,
        );

        (proj * view, eye)
    }
}
