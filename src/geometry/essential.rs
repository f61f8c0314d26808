use nalgebra as na;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::triangulation::{projection_matrix, triangulate_pair};
use crate::types::CameraIntrinsics;

/// Minimal sample size of the eight-point solver.
pub const SAMPLE_SIZE: usize = 8;

/// Errors surfaced by relative-pose estimation.
#[derive(Debug, Error)]
pub enum PoseEstimationError {
    /// Too few correspondences to attempt an estimate at all.
    #[error("need at least {required} correspondences, got {found}")]
    InsufficientCorrespondences { found: usize, required: usize },

    /// The two correspondence lists do not pair up.
    #[error("correspondence lists differ in length: {left} vs {right}")]
    MismatchedCorrespondences { left: usize, right: usize },

    /// No candidate model gathered enough consistent support, e.g. from
    /// collinear points or a pure rotation.
    #[error("degenerate geometry: best model holds {inliers} inliers, {required} required")]
    DegenerateGeometry { inliers: usize, required: usize },
}

/// RANSAC settings for the essential-matrix fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RansacParams {
    /// Inlier threshold in pixels. Scoring happens on the normalized image
    /// plane, so this is divided by the mean focal length internally.
    pub inlier_threshold: f64,
    /// Target probability of having drawn at least one outlier-free sample.
    pub confidence: f64,
    /// Hard cap on sampling iterations.
    pub max_iterations: usize,
    /// Minimum inlier support for an accepted model.
    pub min_inliers: usize,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            inlier_threshold: 1.0,
            confidence: 0.999,
            max_iterations: 1000,
            min_inliers: 15,
        }
    }
}

/// Relative pose of the second camera with per-correspondence inlier mask.
#[derive(Debug, Clone)]
pub struct PoseEstimate {
    /// Orthonormal rotation, determinant +1.
    pub rotation: na::Matrix3<f64>,
    /// Unit-length translation direction; the metric scale is unrecoverable
    /// from two monocular views.
    pub translation: na::Vector3<f64>,
    /// One flag per input correspondence, in input order.
    pub inliers: Vec<bool>,
    pub inlier_count: usize,
}

/// Solves `x2^T E x1 = 0` for eight normalized correspondences.
///
/// The stacked constraints form an 8x9 design matrix; its null space is the
/// last column of the full Q factor of the transposed system. The raw
/// solution is then projected onto the essential manifold.
fn essential_8point(p1: &[na::Vector2<f64>], p2: &[na::Vector2<f64>]) -> na::Matrix3<f64> {
    let mut a: faer::Mat<f64> = faer::Mat::zeros(SAMPLE_SIZE, 9);
    for (r, (x1, x2)) in p1.iter().zip(p2.iter()).enumerate() {
        let (x, y) = (x1.x, x1.y);
        let (xp, yp) = (x2.x, x2.y);
        unsafe {
            *a.get_mut_unchecked(r, 0) = xp * x;
            *a.get_mut_unchecked(r, 1) = xp * y;
            *a.get_mut_unchecked(r, 2) = xp;
            *a.get_mut_unchecked(r, 3) = yp * x;
            *a.get_mut_unchecked(r, 4) = yp * y;
            *a.get_mut_unchecked(r, 5) = yp;
            *a.get_mut_unchecked(r, 6) = x;
            *a.get_mut_unchecked(r, 7) = y;
            *a.get_mut_unchecked(r, 8) = 1.0;
        }
    }
    let q_mat = a.transpose().qr().compute_Q();
    let e = na::Matrix3::new(
        *q_mat.get(0, 8),
        *q_mat.get(1, 8),
        *q_mat.get(2, 8),
        *q_mat.get(3, 8),
        *q_mat.get(4, 8),
        *q_mat.get(5, 8),
        *q_mat.get(6, 8),
        *q_mat.get(7, 8),
        *q_mat.get(8, 8),
    );
    enforce_rank_two(&e)
}

/// Projects onto the essential manifold: singular values forced to (1, 1, 0).
fn enforce_rank_two(e: &na::Matrix3<f64>) -> na::Matrix3<f64> {
    let svd = e.svd(true, true);
    let u = svd.u.unwrap();
    let v_t = svd.v_t.unwrap();
    u * na::Matrix3::from_diagonal(&na::Vector3::new(1.0, 1.0, 0.0)) * v_t
}

/// Squared Sampson distance of one correspondence to the epipolar
/// constraint, in the squared units of the input coordinates.
pub fn sampson_distance(
    e: &na::Matrix3<f64>,
    x1: &na::Vector2<f64>,
    x2: &na::Vector2<f64>,
) -> f64 {
    let p1 = na::Vector3::new(x1.x, x1.y, 1.0);
    let p2 = na::Vector3::new(x2.x, x2.y, 1.0);
    let e_p1 = e * p1;
    let et_p2 = e.transpose() * p2;
    let residual = p2.dot(&e_p1);
    let denom = e_p1.x * e_p1.x + e_p1.y * e_p1.y + et_p2.x * et_p2.x + et_p2.y * et_p2.y;
    if denom <= f64::EPSILON {
        return f64::INFINITY;
    }
    residual * residual / denom
}

/// The four algebraically valid pose candidates of an essential matrix:
/// two rotations times two translation signs.
pub fn decompose_essential(e: &na::Matrix3<f64>) -> [(na::Matrix3<f64>, na::Vector3<f64>); 4] {
    let svd = e.svd(true, true);
    let mut u = svd.u.unwrap();
    let mut v_t = svd.v_t.unwrap();
    // Flipping the factor associated with the zero singular value leaves
    // U diag(1,1,0) V^T unchanged while making both factors proper rotations.
    if u.determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    if v_t.determinant() < 0.0 {
        v_t.row_mut(2).neg_mut();
    }
    let w = na::Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    let r1 = u * w * v_t;
    let r2 = u * w.transpose() * v_t;
    let t: na::Vector3<f64> = u.column(2).into_owned();
    [(r1, t), (r1, -t), (r2, t), (r2, -t)]
}

/// Iterations needed to draw an outlier-free sample with probability
/// `confidence`, given the running inlier ratio.
fn iterations_for_confidence(confidence: f64, inlier_ratio: f64, sample_size: usize) -> usize {
    let p_good = inlier_ratio.powi(sample_size as i32);
    if p_good >= 1.0 {
        return 1;
    }
    if p_good <= f64::EPSILON {
        return usize::MAX;
    }
    ((1.0 - confidence).ln() / (1.0 - p_good).ln()).ceil() as usize
}

/// Estimates the relative pose of the second camera from pixel
/// correspondences and shared intrinsics.
///
/// RANSAC over eight-point minimal samples scored by Sampson distance on the
/// normalized image plane, then decomposition of the winning essential
/// matrix and cheirality disambiguation: the candidate that places the most
/// inlier points in front of both cameras wins. The iteration budget adapts
/// to the running inlier ratio until `confidence` is met, capped at
/// `max_iterations`.
pub fn estimate_relative_pose<R: Rng>(
    pts1: &[na::Vector2<f64>],
    pts2: &[na::Vector2<f64>],
    intrinsics: &CameraIntrinsics,
    params: &RansacParams,
    rng: &mut R,
) -> Result<PoseEstimate, PoseEstimationError> {
    if pts1.len() != pts2.len() {
        return Err(PoseEstimationError::MismatchedCorrespondences {
            left: pts1.len(),
            right: pts2.len(),
        });
    }
    let n = pts1.len();
    if n < SAMPLE_SIZE {
        return Err(PoseEstimationError::InsufficientCorrespondences {
            found: n,
            required: SAMPLE_SIZE,
        });
    }

    let norm1: Vec<na::Vector2<f64>> = pts1.iter().map(|p| intrinsics.normalize(p)).collect();
    let norm2: Vec<na::Vector2<f64>> = pts2.iter().map(|p| intrinsics.normalize(p)).collect();

    // The configured threshold is in pixels; scoring runs in normalized
    // units.
    let threshold = params.inlier_threshold / intrinsics.mean_focal();
    let threshold_sq = threshold * threshold;

    let mut best_e = None;
    let mut best_inliers = Vec::new();
    let mut best_count = 0usize;
    let mut iteration_cap = params.max_iterations;
    let mut iteration = 0usize;

    while iteration < iteration_cap {
        iteration += 1;
        let sample = rand::seq::index::sample(rng, n, SAMPLE_SIZE);
        let s1: Vec<na::Vector2<f64>> = sample.iter().map(|i| norm1[i]).collect();
        let s2: Vec<na::Vector2<f64>> = sample.iter().map(|i| norm2[i]).collect();
        let e = essential_8point(&s1, &s2);

        let mut inliers = vec![false; n];
        let mut count = 0usize;
        for i in 0..n {
            if sampson_distance(&e, &norm1[i], &norm2[i]) <= threshold_sq {
                inliers[i] = true;
                count += 1;
            }
        }

        if count > best_count {
            best_count = count;
            best_e = Some(e);
            best_inliers = inliers;
            let needed =
                iterations_for_confidence(params.confidence, count as f64 / n as f64, SAMPLE_SIZE);
            iteration_cap = iteration_cap.min(needed.max(iteration));
        }
    }

    let required = params.min_inliers.max(SAMPLE_SIZE);
    let e = match best_e {
        Some(e) if best_count >= required => e,
        _ => {
            return Err(PoseEstimationError::DegenerateGeometry {
                inliers: best_count,
                required,
            });
        }
    };
    log::debug!(
        "ransac kept {}/{} correspondences after {} iterations",
        best_count,
        n,
        iteration
    );

    // Cheirality test over the inlier set, in normalized coordinates.
    let (in1, in2): (Vec<na::Vector2<f64>>, Vec<na::Vector2<f64>>) = norm1
        .iter()
        .zip(norm2.iter())
        .zip(best_inliers.iter())
        .filter(|(_, keep)| **keep)
        .map(|((a, b), _)| (*a, *b))
        .unzip();
    let identity = projection_matrix(
        &na::Matrix3::identity(),
        &na::Matrix3::identity(),
        &na::Vector3::zeros(),
    );

    let mut best_pose = None;
    let mut best_front = 0usize;
    for (r, t) in decompose_essential(&e) {
        let p2 = projection_matrix(&na::Matrix3::identity(), &r, &t);
        let front = triangulate_pair(&identity, &p2, &in1, &in2)
            .iter()
            .filter(|x| {
                let depth2 = (r * x.coords + t).z;
                x.coords.iter().all(|v| v.is_finite()) && x.z > 0.0 && depth2 > 0.0
            })
            .count();
        if front > best_front {
            best_front = front;
            best_pose = Some((r, t));
        }
    }

    let (rotation, translation) = match best_pose {
        Some(pose) => pose,
        None => {
            return Err(PoseEstimationError::DegenerateGeometry {
                inliers: best_count,
                required,
            });
        }
    };

    Ok(PoseEstimate {
        rotation,
        translation: translation.normalize(),
        inliers: best_inliers,
        inlier_count: best_count,
    })
}
