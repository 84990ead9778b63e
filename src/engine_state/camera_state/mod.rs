//! # Camera State
//!
//! The viewer's frame of reference as the world core sees it: a position and
//! the three orthonormal view vectors. The frame is stored in level files,
//! drives the visibility scheduler and answers "is the camera inside a fluid".
//!
//! Input handling and projection belong to the collaborating game loop, which
//! pushes new frames with `Level::set_camera`.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// Position and orientation of the viewer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraFrame {
    /// Position in world space
    pub position: Point3<f32>,
    /// Normalized viewing direction
    pub front: Vector3<f32>,
    /// Normalized up vector
    pub up: Vector3<f32>,
    /// Normalized vector to the viewer's right
    pub right: Vector3<f32>,
}

impl Default for CameraFrame {
    fn default() -> Self {
        CameraFrame::from_yaw_pitch(Point3::new(0.0, 0.0, 0.0), Rad(0.0), Rad(0.0))
    }
}

impl CameraFrame {
    /// Builds a frame looking along `yaw` (around Y) and `pitch` (around X).
    ///
    /// Pitch is clamped just short of straight up or down.
    ///
    /// # Example
    /// ```rust
    /// use cgmath::{Deg, Point3};
    /// use paged_voxel_world::CameraFrame;
    ///
    /// let frame = CameraFrame::from_yaw_pitch(Point3::new(0.0, 4.0, 0.0), Deg(90.0), Deg(0.0));
    /// assert!((frame.front.z - 1.0).abs() < 1.0e-5);
    /// ```
    pub fn from_yaw_pitch<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        let yaw: Rad<f32> = yaw.into();
        let pitch = pitch.into().0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2);
        let (yaw_sin, yaw_cos) = yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = pitch.sin_cos();

        let front = Vector3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize();
        let right = front.cross(Vector3::unit_y()).normalize();
        let up = right.cross(front).normalize();
        CameraFrame {
            position: position.into(),
            front,
            up,
            right,
        }
    }

    /// Builds a frame from stored vectors, as read from a level file.
    pub fn from_vectors(position: Point3<f32>, front: Vector3<f32>, up: Vector3<f32>, right: Vector3<f32>) -> Self {
        CameraFrame {
            position,
            front,
            up,
            right,
        }
    }

    /// The view matrix of this frame.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front, self.up)
    }
}
