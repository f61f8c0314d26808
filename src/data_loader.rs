use std::path::PathBuf;

use glob::glob;
use image::DynamicImage;
use image::GenericImageView;
use image::imageops::FilterType;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::detected_features::{FeatureDetector, FrameFeatures};
use crate::observer::ReconstructionObserver;

const SUPPORTED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".bmp", ".tiff"];

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        let name = p.as_os_str().to_string_lossy().to_lowercase();
        for ext in SUPPORTED_EXTENSIONS {
            if name.ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

/// Loads every supported image directly under `root_folder`, sorted by
/// filename, decoding in parallel.
///
/// A `scale` below 1.0 downsamples each image before feature extraction.
/// Unreadable files are skipped with a warning rather than failing the run.
pub fn load_images(root_folder: &str, scale: f32) -> Vec<DynamicImage> {
    let img_paths =
        glob(format!("{}/*", root_folder).as_str()).expect("failed to read glob pattern");
    let mut sorted_path: Vec<PathBuf> = img_paths.into_iter().filter_map(img_filter).collect();
    sorted_path.sort();

    let images: Vec<DynamicImage> = sorted_path
        .par_iter()
        .progress_count(sorted_path.len() as u64)
        .filter_map(|path| match image::open(path) {
            Ok(img) => {
                log::debug!("loaded {}", path.display());
                if scale < 1.0 {
                    let w = ((img.width() as f32 * scale).round() as u32).max(1);
                    let h = ((img.height() as f32 * scale).round() as u32).max(1);
                    Some(img.resize(w, h, FilterType::Triangle))
                } else {
                    Some(img)
                }
            }
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    log::info!("loaded {} images from {}", images.len(), root_folder);
    images
}

/// Runs the detector over every image in parallel and reports per-frame
/// keypoint counts. Frame order follows image order.
pub fn detect_features<D: FeatureDetector + Sync>(
    images: &[DynamicImage],
    detector: &D,
    observer: &mut dyn ReconstructionObserver,
) -> Vec<FrameFeatures> {
    let frames: Vec<FrameFeatures> = images
        .par_iter()
        .progress_count(images.len() as u64)
        .map(|img| detector.detect(img))
        .collect();
    for (i, frame) in frames.iter().enumerate() {
        observer.on_frame_features(i, frame.len());
    }
    frames
}
