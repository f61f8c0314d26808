use rayon::prelude::*;

use crate::detected_features::{Descriptor, FrameFeatures};
use crate::observer::ReconstructionObserver;

/// Default acceptance ratio for Lowe's test.
pub const DEFAULT_RATIO_THRESHOLD: f32 = 0.7;

/// A correspondence between two descriptor sets. Indices are only valid
/// relative to the sets the match was produced from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Matches `query` against `train` with an exhaustive two-nearest-neighbor
/// search and Lowe's ratio test.
///
/// A query descriptor is accepted only when its nearest train descriptor is
/// unambiguously closer than the second nearest:
/// `d1 < ratio_threshold * d2`. An empty set on either side yields no
/// matches, as does a train set with fewer than two entries, where the
/// ratio is undefined.
pub fn match_descriptors(
    query: &[Descriptor],
    train: &[Descriptor],
    ratio_threshold: f32,
) -> Vec<DescriptorMatch> {
    if query.is_empty() || train.len() < 2 {
        return Vec::new();
    }
    query
        .par_iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            let mut best_idx = 0usize;
            let mut best_sq = f32::INFINITY;
            let mut second_sq = f32::INFINITY;
            for (train_idx, t) in train.iter().enumerate() {
                let d = q.distance_sq(t);
                if d < best_sq {
                    second_sq = best_sq;
                    best_sq = d;
                    best_idx = train_idx;
                } else if d < second_sq {
                    second_sq = d;
                }
            }
            let distance = best_sq.sqrt();
            (distance < ratio_threshold * second_sq.sqrt()).then_some(DescriptorMatch {
                query_idx,
                train_idx: best_idx,
                distance,
            })
        })
        .collect()
}

/// Matches consecutive image pairs only: entry `i` of the output holds the
/// matches between frames `i` and `i + 1`. All-pairs matching is
/// intentionally not done.
pub fn match_consecutive(
    frames: &[FrameFeatures],
    ratio_threshold: f32,
    observer: &mut dyn ReconstructionObserver,
) -> Vec<Vec<DescriptorMatch>> {
    if frames.len() < 2 {
        return Vec::new();
    }
    let mut all_matches = Vec::with_capacity(frames.len() - 1);
    for i in 0..frames.len() - 1 {
        let matches = match_descriptors(
            &frames[i].descriptors,
            &frames[i + 1].descriptors,
            ratio_threshold,
        );
        observer.on_pair_matches(i, i + 1, matches.len());
        all_matches.push(matches);
    }
    all_matches
}
