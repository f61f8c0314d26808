use bitarray::BitArray;
use glam::Vec2;
use image::DynamicImage;
use image::GenericImageView;

/// A detected salient image location. Owned by the image it was extracted
/// from and read-only afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    /// Sub-pixel location in image coordinates.
    pub p2d: Vec2,
    /// Radius of the region the keypoint covers, in pixels.
    pub size: f32,
    /// Orientation in radians.
    pub angle: f32,
    /// Detector response strength.
    pub response: f32,
}

/// Fixed-length feature fingerprint, compared by Euclidean distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor(pub Vec<f32>);

impl Descriptor {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn distance_sq(&self, other: &Descriptor) -> f32 {
        debug_assert_eq!(self.0.len(), other.0.len());
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    pub fn distance(&self, other: &Descriptor) -> f32 {
        self.distance_sq(other).sqrt()
    }
}

/// Everything detected in one image. `keypoints[i]` and `descriptors[i]`
/// describe the same feature; both are empty for a texture-less image.
#[derive(Debug, Clone, Default)]
pub struct FrameFeatures {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
    pub img_w_h: (u32, u32),
}

impl FrameFeatures {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Scale-invariant keypoint detection, consumed as an opaque capability.
pub trait FeatureDetector {
    fn detect(&self, img: &DynamicImage) -> FrameFeatures;
}

/// AKAZE-backed detector.
///
/// AKAZE emits binary descriptors; each bit is expanded to a 0/1 float so
/// that squared Euclidean distance downstream equals Hamming distance and
/// the matcher stays metric-agnostic.
pub struct AkazeDetector {
    akaze: akaze::Akaze,
}

impl AkazeDetector {
    /// `threshold` is the detector response cutoff; lower values keep more
    /// keypoints.
    pub fn new(threshold: f64) -> AkazeDetector {
        AkazeDetector {
            akaze: akaze::Akaze::new(threshold),
        }
    }
}

impl Default for AkazeDetector {
    fn default() -> Self {
        AkazeDetector {
            akaze: akaze::Akaze::default(),
        }
    }
}

fn expand_binary_descriptor(bits: &BitArray<64>) -> Descriptor {
    let mut values = Vec::with_capacity(64 * 8);
    for byte in bits.bytes() {
        for shift in 0..8 {
            values.push(((byte >> shift) & 1) as f32);
        }
    }
    Descriptor(values)
}

impl FeatureDetector for AkazeDetector {
    fn detect(&self, img: &DynamicImage) -> FrameFeatures {
        let (keypoints, descriptors) = self.akaze.extract(img);
        FrameFeatures {
            keypoints: keypoints
                .iter()
                .map(|kp| Keypoint {
                    p2d: Vec2::new(kp.point.0, kp.point.1),
                    size: kp.size,
                    angle: kp.angle,
                    response: kp.response,
                })
                .collect(),
            descriptors: descriptors.iter().map(expand_binary_descriptor).collect(),
            img_w_h: (img.width(), img.height()),
        }
    }
}
