use std::io::Cursor;

use image::DynamicImage;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

use crate::types::Point3D;

pub fn log_image_as_compressed(
    recording: &RecordingStream,
    topic: &str,
    img: &DynamicImage,
    format: image::ImageFormat,
) {
    let mut bytes: Vec<u8> = Vec::new();

    DynamicImage::ImageLuma8(img.to_luma8())
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();

    recording
        .log(
            format!("{}/image", topic),
            &rerun::Image::from_file_contents(bytes, None),
        )
        .unwrap();
}

/// Stable pseudo-random color per index, for telling frames apart.
pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

/// Logs the reconstructed cloud, colored by depth along the first camera's
/// optical axis.
pub fn log_point_cloud(recording: &RecordingStream, topic: &str, points: &[Point3D]) {
    if points.is_empty() {
        return;
    }
    let (min_z, max_z) = points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
        (lo.min(p.position.z), hi.max(p.position.z))
    });
    let span = (max_z - min_z).max(f32::EPSILON);
    let (pts, colors): (Vec<_>, Vec<_>) = points
        .iter()
        .map(|p| {
            let c = colorous::VIRIDIS.eval_continuous(((p.position.z - min_z) / span) as f64);
            (
                (p.position.x, p.position.y, p.position.z),
                (c.r, c.g, c.b, 255u8),
            )
        })
        .unzip();
    recording
        .log(
            format!("{}/cloud", topic),
            &rerun::Points3D::new(pts)
                .with_colors(colors)
                .with_radii([rerun::Radius::new_ui_points(2.0)]),
        )
        .unwrap();
}
