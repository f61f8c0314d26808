use glam::Vec2;
use nalgebra as na;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sparse_sfm::detected_features::{FrameFeatures, Keypoint};
use sparse_sfm::matching::DescriptorMatch;
use sparse_sfm::observer::{ReconstructionObserver, SilentObserver};
use sparse_sfm::reconstruction::{
    ReconstructionConfig, ReconstructionError, reconstruct_initial_pair,
};
use sparse_sfm::types::{CameraIntrinsics, Point3D};

fn test_intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::new(800.0, 800.0, 320.0, 240.0)
}

fn keypoint(p: na::Vector2<f64>) -> Keypoint {
    Keypoint {
        p2d: Vec2::new(p.x as f32, p.y as f32),
        size: 1.0,
        angle: 0.0,
        response: 1.0,
    }
}

/// Two synthetic views of the same random scene, plus the trivial 1:1 match
/// list between them.
fn synthetic_pair(n: usize, seed: u64) -> (Vec<FrameFeatures>, Vec<Vec<DescriptorMatch>>) {
    let intrinsics = test_intrinsics();
    let rotation = na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), 0.06).into_inner();
    let translation = na::Vector3::new(-1.0, 0.05, 0.1).normalize();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut kps1 = Vec::with_capacity(n);
    let mut kps2 = Vec::with_capacity(n);
    while kps1.len() < n {
        let p = na::Vector3::new(
            rng.random_range(-2.0..2.0),
            rng.random_range(-1.5..1.5),
            rng.random_range(4.0..8.0),
        );
        let p_cam2 = rotation * p + translation;
        if p_cam2.z <= 0.1 {
            continue;
        }
        kps1.push(keypoint(na::Vector2::new(
            intrinsics.fx * p.x / p.z + intrinsics.cx,
            intrinsics.fy * p.y / p.z + intrinsics.cy,
        )));
        kps2.push(keypoint(na::Vector2::new(
            intrinsics.fx * p_cam2.x / p_cam2.z + intrinsics.cx,
            intrinsics.fy * p_cam2.y / p_cam2.z + intrinsics.cy,
        )));
    }

    let matches: Vec<DescriptorMatch> = (0..n)
        .map(|i| DescriptorMatch {
            query_idx: i,
            train_idx: i,
            distance: 0.0,
        })
        .collect();

    let frame = |keypoints: Vec<Keypoint>| FrameFeatures {
        keypoints,
        descriptors: Vec::new(),
        img_w_h: (640, 480),
    };
    (vec![frame(kps1), frame(kps2)], vec![matches])
}

/// Captures checkpoint calls for assertions.
#[derive(Default)]
struct RecordingObserver {
    reconstructions: Vec<(usize, usize)>,
    failures: Vec<String>,
}

impl ReconstructionObserver for RecordingObserver {
    fn on_reconstruction(&mut self, point_count: usize, pose_count: usize) {
        self.reconstructions.push((point_count, pose_count));
    }

    fn on_failure(&mut self, reason: &str) {
        self.failures.push(reason.to_string());
    }
}

#[test]
fn test_successful_first_pair_reconstruction() {
    let (frames, matches) = synthetic_pair(60, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut observer = RecordingObserver::default();

    let result = reconstruct_initial_pair(
        &frames,
        &matches,
        &test_intrinsics(),
        &ReconstructionConfig::default(),
        &mut rng,
        &mut observer,
    )
    .expect("synthetic pair must reconstruct");

    assert_eq!(result.poses.len(), 2);
    assert_eq!(result.poses[0].rotation, na::Matrix3::identity());
    assert_eq!(result.poses[0].translation, na::Vector3::zeros());
    assert!((result.poses[1].translation.norm() - 1.0).abs() < 1e-12);

    assert!(!result.points.is_empty());
    assert!(result.points.len() <= matches[0].len());
    for p in &result.points {
        assert_eq!(p.color, Point3D::WHITE);
        // All synthetic points sit well in front of the first camera.
        assert!(p.position.z > 0.0);
    }
    assert_eq!(observer.reconstructions, vec![(result.points.len(), 2)]);
    assert!(observer.failures.is_empty());
}

#[test]
fn test_single_frame_is_insufficient() {
    let (frames, _) = synthetic_pair(60, 5);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let result = reconstruct_initial_pair(
        &frames[..1],
        &[],
        &test_intrinsics(),
        &ReconstructionConfig::default(),
        &mut rng,
        &mut SilentObserver,
    );
    assert!(matches!(
        result,
        Err(ReconstructionError::InsufficientImages { found: 1 })
    ));
}

#[test]
fn test_too_few_matches_fails_before_estimation() {
    let (frames, mut matches) = synthetic_pair(60, 9);
    matches[0].truncate(10);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut observer = RecordingObserver::default();

    let result = reconstruct_initial_pair(
        &frames,
        &matches,
        &test_intrinsics(),
        &ReconstructionConfig::default(),
        &mut rng,
        &mut observer,
    );
    assert!(matches!(
        result,
        Err(ReconstructionError::InsufficientMatches {
            found: 10,
            required: 50
        })
    ));
    assert_eq!(observer.failures.len(), 1);
    assert!(observer.failures[0].contains("matches"));
}

#[test]
fn test_degenerate_pair_reports_pose_failure() {
    // Shuffled second-view indices break the pairing entirely; pose
    // estimation must refuse rather than return garbage.
    let (frames, mut matches) = synthetic_pair(60, 13);
    let n = matches[0].len();
    for (i, m) in matches[0].iter_mut().enumerate() {
        m.train_idx = (i * 17 + 5) % n;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut observer = RecordingObserver::default();

    let result = reconstruct_initial_pair(
        &frames,
        &matches,
        &test_intrinsics(),
        &ReconstructionConfig::default(),
        &mut rng,
        &mut observer,
    );
    assert!(matches!(
        result,
        Err(ReconstructionError::PoseEstimation(_))
    ));
    assert_eq!(observer.failures.len(), 1);
}

#[test]
fn test_later_pairs_are_ignored() {
    // A third frame and a bogus second match list must not change the
    // outcome of the first pair.
    let (mut frames, mut matches) = synthetic_pair(60, 3);
    frames.push(FrameFeatures::default());
    matches.push(Vec::new());

    let mut rng_a = ChaCha8Rng::seed_from_u64(7);
    let mut rng_b = ChaCha8Rng::seed_from_u64(7);
    let (base_frames, base_matches) = synthetic_pair(60, 3);

    let with_extra = reconstruct_initial_pair(
        &frames,
        &matches,
        &test_intrinsics(),
        &ReconstructionConfig::default(),
        &mut rng_a,
        &mut SilentObserver,
    )
    .unwrap();
    let baseline = reconstruct_initial_pair(
        &base_frames,
        &base_matches,
        &test_intrinsics(),
        &ReconstructionConfig::default(),
        &mut rng_b,
        &mut SilentObserver,
    )
    .unwrap();

    assert_eq!(with_extra.points.len(), baseline.points.len());
    assert_eq!(with_extra.poses[1].rotation, baseline.poses[1].rotation);
}
