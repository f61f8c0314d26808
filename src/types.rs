use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics, shared by every image in the sequence. No distortion
/// model; inputs are assumed rectified or close enough.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> CameraIntrinsics {
        CameraIntrinsics { fx, fy, cx, cy }
    }

    /// Rough intrinsics for uncalibrated input: focal length 1.2x the image
    /// width, principal point at the image center.
    pub fn from_image_size(width: u32, height: u32) -> CameraIntrinsics {
        let focal = width as f64 * 1.2;
        CameraIntrinsics {
            fx: focal,
            fy: focal,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        }
    }

    pub fn k_matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(
            self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0,
        )
    }

    pub fn mean_focal(&self) -> f64 {
        (self.fx + self.fy) / 2.0
    }

    /// Maps a pixel observation onto the normalized image plane.
    pub fn normalize(&self, p: &na::Vector2<f64>) -> na::Vector2<f64> {
        na::Vector2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }
}

/// Rigid pose of a camera relative to the first one. The translation is a
/// unit direction; two monocular views leave its scale unknown.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub rotation: na::Matrix3<f64>,
    pub translation: na::Vector3<f64>,
}

impl Pose {
    pub fn identity() -> Pose {
        Pose {
            rotation: na::Matrix3::identity(),
            translation: na::Vector3::zeros(),
        }
    }
}

/// A reconstructed scene point, expressed in the first camera's frame.
#[derive(Debug, Clone, Copy)]
pub struct Point3D {
    pub position: glam::Vec3,
    pub color: [u8; 3],
}

impl Point3D {
    pub const WHITE: [u8; 3] = [255, 255, 255];

    /// A point with the default white color; color projection is a separate
    /// concern that this pipeline does not perform.
    pub fn new(position: glam::Vec3) -> Point3D {
        Point3D {
            position,
            color: Point3D::WHITE,
        }
    }

    pub fn with_color(position: glam::Vec3, color: [u8; 3]) -> Point3D {
        Point3D { position, color }
    }
}
