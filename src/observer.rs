/// Checkpoint reporting for the pipeline.
///
/// The geometric stages never print; counts and outcomes flow through an
/// observer so the pipeline is testable without capturing console output.
/// Every method defaults to a no-op.
pub trait ReconstructionObserver {
    /// Keypoint count of one image, after detection.
    fn on_frame_features(&mut self, _frame_idx: usize, _keypoint_count: usize) {}

    /// Accepted match count for the image pair `(left, right)`.
    fn on_pair_matches(&mut self, _left: usize, _right: usize, _match_count: usize) {}

    /// Point and pose counts of a finished reconstruction.
    fn on_reconstruction(&mut self, _point_count: usize, _pose_count: usize) {}

    /// A recoverable failure with its human-readable reason.
    fn on_failure(&mut self, _reason: &str) {}
}

/// Forwards every checkpoint to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ReconstructionObserver for LogObserver {
    fn on_frame_features(&mut self, frame_idx: usize, keypoint_count: usize) {
        log::info!("image {}: {} keypoints", frame_idx, keypoint_count);
    }

    fn on_pair_matches(&mut self, left: usize, right: usize, match_count: usize) {
        log::info!("matches between image {} and {}: {}", left, right, match_count);
    }

    fn on_reconstruction(&mut self, point_count: usize, pose_count: usize) {
        log::info!(
            "triangulated {} points across {} camera poses",
            point_count,
            pose_count
        );
    }

    fn on_failure(&mut self, reason: &str) {
        log::warn!("reconstruction failed: {}", reason);
    }
}

/// Discards every checkpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl ReconstructionObserver for SilentObserver {}
