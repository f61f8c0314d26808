use nalgebra as na;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detected_features::FrameFeatures;
use crate::geometry::essential::{
    PoseEstimationError, RansacParams, estimate_relative_pose,
};
use crate::geometry::triangulation::{projection_matrix, triangulate_pair};
use crate::matching::{DEFAULT_RATIO_THRESHOLD, DescriptorMatch};
use crate::observer::ReconstructionObserver;
use crate::types::{CameraIntrinsics, Point3D, Pose};

/// Tuning knobs for the whole pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Lowe ratio-test acceptance threshold.
    pub ratio_threshold: f32,
    /// Minimum accepted matches before pose estimation is attempted.
    pub min_matches: usize,
    pub ransac: RansacParams,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
            min_matches: 50,
            ransac: RansacParams::default(),
        }
    }
}

/// Reconstruction failures. All of these are recoverable: the caller
/// reports the reason and produces no output, it does not crash.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("need at least two images with features, got {found}")]
    InsufficientImages { found: usize },

    #[error("need at least {required} matches between the first image pair, got {found}")]
    InsufficientMatches { found: usize, required: usize },

    #[error(transparent)]
    PoseEstimation(#[from] PoseEstimationError),
}

/// Sparse scene reconstructed from the first image pair. The first pose is
/// the identity by convention; points live in that camera's frame.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionResult {
    pub points: Vec<Point3D>,
    pub poses: Vec<Pose>,
}

/// Reconstructs a sparse point cloud from the first image pair.
///
/// `pair_matches[i]` holds the matches between frames `i` and `i + 1`; only
/// pair (0, 1) is consumed. Estimating poses for later pairs needs the
/// resolved pose chain of every earlier image, which makes that stage
/// inherently sequential — chaining, re-triangulation and bundle adjustment
/// are future work, so later match lists are accepted and ignored here.
///
/// Stages run strictly in order over freshly owned data: matches are read
/// into correspondence lists, pose estimation consumes those, and the
/// triangulator consumes the pose plus the inlier subset.
pub fn reconstruct_initial_pair<R: Rng>(
    frames: &[FrameFeatures],
    pair_matches: &[Vec<DescriptorMatch>],
    intrinsics: &CameraIntrinsics,
    config: &ReconstructionConfig,
    rng: &mut R,
    observer: &mut dyn ReconstructionObserver,
) -> Result<ReconstructionResult, ReconstructionError> {
    if frames.len() < 2 || pair_matches.is_empty() {
        let err = ReconstructionError::InsufficientImages {
            found: frames.len(),
        };
        observer.on_failure(&err.to_string());
        return Err(err);
    }

    let matches = &pair_matches[0];
    if matches.len() < config.min_matches {
        let err = ReconstructionError::InsufficientMatches {
            found: matches.len(),
            required: config.min_matches,
        };
        observer.on_failure(&err.to_string());
        return Err(err);
    }

    // Pixel correspondences of the working pair, in match order.
    let (pts1, pts2): (Vec<na::Vector2<f64>>, Vec<na::Vector2<f64>>) = matches
        .iter()
        .map(|m| {
            let a = frames[0].keypoints[m.query_idx].p2d;
            let b = frames[1].keypoints[m.train_idx].p2d;
            (
                na::Vector2::new(a.x as f64, a.y as f64),
                na::Vector2::new(b.x as f64, b.y as f64),
            )
        })
        .unzip();

    let estimate = match estimate_relative_pose(&pts1, &pts2, intrinsics, &config.ransac, rng) {
        Ok(estimate) => estimate,
        Err(err) => {
            observer.on_failure(&err.to_string());
            return Err(err.into());
        }
    };

    let k = intrinsics.k_matrix();
    let p1 = projection_matrix(&k, &na::Matrix3::identity(), &na::Vector3::zeros());
    let p2 = projection_matrix(&k, &estimate.rotation, &estimate.translation);

    let (in1, in2): (Vec<na::Vector2<f64>>, Vec<na::Vector2<f64>>) = pts1
        .iter()
        .zip(pts2.iter())
        .zip(estimate.inliers.iter())
        .filter(|(_, keep)| **keep)
        .map(|((a, b), _)| (*a, *b))
        .unzip();

    let points: Vec<Point3D> = triangulate_pair(&p1, &p2, &in1, &in2)
        .iter()
        .map(|p| Point3D::new(glam::Vec3::new(p.x as f32, p.y as f32, p.z as f32)))
        .collect();

    let poses = vec![
        Pose::identity(),
        Pose {
            rotation: estimate.rotation,
            translation: estimate.translation,
        },
    ];
    observer.on_reconstruction(points.len(), poses.len());
    Ok(ReconstructionResult { points, poses })
}
