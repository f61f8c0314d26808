use std::time::Instant;

use clap::Parser;
use image::GenericImageView;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sparse_sfm::data_loader::{detect_features, load_images};
use sparse_sfm::detected_features::AkazeDetector;
use sparse_sfm::io::{object_from_json, write_ply};
use sparse_sfm::matching::match_consecutive;
use sparse_sfm::observer::LogObserver;
use sparse_sfm::reconstruction::{ReconstructionConfig, reconstruct_initial_pair};
use sparse_sfm::types::CameraIntrinsics;
use sparse_sfm::visualization::{id_to_color, log_image_as_compressed, log_point_cloud, rerun_shift};

#[derive(Parser)]
#[command(version, about, author)]
struct SfmRsCli {
    /// path to image folder
    path: String,

    /// output point cloud path
    #[arg(short, long, default_value = "reconstruction.ply")]
    output: String,

    /// intrinsics JSON; estimated from the image size when absent
    #[arg(long)]
    intrinsics: Option<String>,

    /// pipeline configuration JSON; built-in defaults when absent
    #[arg(long)]
    config: Option<String>,

    /// downscale factor applied to every input image
    #[arg(long, default_value = "0.5")]
    scale: f32,

    /// RANSAC seed; drawn from the OS when absent
    #[arg(long)]
    seed: Option<u64>,

    /// save a rerun recording (images, keypoints, cloud) to this .rrd path
    #[arg(long)]
    rerun_path: Option<String>,
}

fn main() {
    env_logger::init();
    let cli = SfmRsCli::parse();
    let config: ReconstructionConfig = cli
        .config
        .as_ref()
        .map(|p| object_from_json(p))
        .unwrap_or_default();
    let recording = cli.rerun_path.as_ref().map(|p| {
        rerun::RecordingStreamBuilder::new("sparse-sfm")
            .save(p)
            .unwrap()
    });

    let now = Instant::now();
    let images = load_images(&cli.path, cli.scale);
    if images.len() < 2 {
        log::error!(
            "need at least 2 images for reconstruction, found {}",
            images.len()
        );
        std::process::exit(1);
    }
    let intrinsics: CameraIntrinsics = match &cli.intrinsics {
        Some(p) => object_from_json(p),
        None => CameraIntrinsics::from_image_size(images[0].width(), images[0].height()),
    };

    let detector = AkazeDetector::default();
    let mut observer = LogObserver;
    let frames = detect_features(&images, &detector, &mut observer);
    println!(
        "detecting features took {:.6} sec",
        now.elapsed().as_secs_f64()
    );

    if let Some(recording) = &recording {
        for (i, (img, frame)) in images.iter().zip(&frames).enumerate() {
            let topic = format!("frame_{:03}", i);
            log_image_as_compressed(recording, &topic, img, image::ImageFormat::Jpeg);
            let raw: Vec<(f32, f32)> = frame.keypoints.iter().map(|k| (k.p2d.x, k.p2d.y)).collect();
            let pts = rerun_shift(&raw);
            recording
                .log(
                    format!("{}/keypoints", topic),
                    &rerun::Points2D::new(pts)
                        .with_colors(vec![id_to_color(i); frame.len()])
                        .with_radii([rerun::Radius::new_ui_points(2.0)]),
                )
                .unwrap();
        }
    }

    let all_matches = match_consecutive(&frames, config.ratio_threshold, &mut observer);

    let mut rng = match cli.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };
    match reconstruct_initial_pair(
        &frames,
        &all_matches,
        &intrinsics,
        &config,
        &mut rng,
        &mut observer,
    ) {
        Ok(result) => {
            if result.points.is_empty() {
                log::error!("reconstruction produced no points, not writing {}", cli.output);
                std::process::exit(1);
            }
            write_ply(&cli.output, &result.points).unwrap();
            println!(
                "saved {} points and {} poses to {}",
                result.points.len(),
                result.poses.len(),
                cli.output
            );
            if let Some(recording) = &recording {
                log_point_cloud(recording, "reconstruction", &result.points);
            }
        }
        Err(err) => {
            log::error!("{}", err);
            log::error!("try images with more overlap and texture");
            std::process::exit(1);
        }
    }
}
